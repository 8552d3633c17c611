pub mod aggregator;
pub mod notifier;

pub use aggregator::{Aggregator, DEFAULT_INTERVAL};
pub use notifier::{CommandNotifier, Notifier};
