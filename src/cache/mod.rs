pub mod reflector;
pub mod store;
pub mod subscription;

pub use reflector::Reflector;
pub use store::Store;
pub use subscription::{Subscription, SubscriptionManager};
