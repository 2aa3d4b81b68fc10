pub mod client;
pub mod notice;
pub mod resource;

pub use client::{ApiClient, ClientConfig};
pub use notice::WatchEvent;

use crate::error::Result;
use crate::stream::WatchStream;
use async_trait::async_trait;
use serde_json::Value;

/// Query options recognized by list and watch requests.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    pub resource_version: Option<String>,
}

impl WatchOptions {
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn field_selector(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn resource_version(mut self, version: impl Into<String>) -> Self {
        self.resource_version = Some(version.into());
        self
    }

    /// Selector and version options as wire-format query parameters.
    /// The namespace is path material, not a query parameter.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(selector) = &self.label_selector {
            pairs.push(("labelSelector", selector.clone()));
        }
        if let Some(selector) = &self.field_selector {
            pairs.push(("fieldSelector", selector.clone()));
        }
        if let Some(version) = &self.resource_version {
            pairs.push(("resourceVersion", version.clone()));
        }
        pairs
    }
}

/// A point-in-time list of a collection plus the change-log position the
/// server issued for it, the resume point for a subsequent watch.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    pub items: Vec<Value>,
    pub resource_version: String,
}

/// The remote collection the reflector mirrors, reduced to the two
/// primitives it needs. Discovery, CRUD verbs, auth refresh and the like
/// live behind implementations of this trait, not in the reflector.
#[async_trait]
pub trait ListerWatcher: Send + Sync {
    /// One full list of the collection.
    async fn list(&self, resource: &str, options: &WatchOptions) -> Result<ObjectList>;

    /// A long-lived watch of changes from `options.resource_version` onward.
    async fn watch(&self, resource: &str, options: &WatchOptions) -> Result<WatchStream>;
}
