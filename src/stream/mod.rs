pub mod lines;
pub mod watch;

pub use lines::{LineStream, StreamFinisher};
pub use watch::WatchStream;
