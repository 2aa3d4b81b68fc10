//! Client-side mirror of a remote, versioned collection exposed through
//! list and watch primitives.
//!
//! A [`Reflector`] fills a local uid-keyed cache with one full list, then
//! keeps it current from a long-lived streaming watch, re-listing on error,
//! stream end, or a reconcile deadline. Any number of consumers take
//! [`Reflector::list`] snapshots or subscribe to the live event feed with
//! [`Reflector::watch`]; a single `stop_worker` call tears everything down
//! even mid-read.
//!
//! The remote side is abstracted as a [`ListerWatcher`]; [`ApiClient`] is
//! the built-in implementation over HTTP for Kubernetes-style APIs, built
//! on the same newline-delimited [`stream`] reader that raw log following
//! uses.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use watchcache::{ApiClient, ClientConfig, Reflector, WatchOptions};
//!
//! # async fn demo() -> watchcache::Result<()> {
//! let client = Arc::new(ApiClient::new(ClientConfig::new("https://host:6443/api/v1"))?);
//! let options = WatchOptions::default().namespace("default");
//! let reflector = Reflector::new(client, "pods", options, Duration::from_secs(900));
//!
//! reflector.start_worker().await;
//! let pods = reflector.list().await;
//! println!("{} pods cached", pods.len());
//!
//! let mut feed = reflector.watch();
//! while let Some(event) = feed.recv().await {
//!     println!("{}", event.kind());
//! }
//! reflector.stop_worker().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod stream;

pub use api::{ApiClient, ClientConfig, ListerWatcher, ObjectList, WatchEvent, WatchOptions};
pub use cache::{Reflector, Store, Subscription, SubscriptionManager};
pub use error::{Error, Result};
pub use stream::{LineStream, StreamFinisher, WatchStream};
