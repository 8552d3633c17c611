use crate::domain::Link;
use crate::errors::FetchResult;

#[cfg_attr(test, mockall::automock)]
pub trait FeedFetcher: Send + Sync {
    /// Retrieve and parse one feed, returning its links in item order.
    ///
    /// Any retrieval or parse failure is reported as a single error; partial
    /// results are never returned.
    fn fetch(&self, feed_url: &str) -> FetchResult<Vec<Link>>;
}
