use crate::domain::Link;
use crate::errors::StoreResult;

/// Durable set of links that have already been handed to the notifier.
#[cfg_attr(test, mockall::automock)]
pub trait SeenRepository: Send + Sync {
    fn contains(&self, link: &Link) -> bool;

    /// Add `link` and persist it before returning.
    ///
    /// On error the link must not be left in the set.
    fn record(&mut self, link: &Link) -> StoreResult<()>;
}
