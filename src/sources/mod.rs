pub mod traits;
pub mod rss_atom;

pub use rss_atom::{parse_links, FetchSettings, HttpFeedFetcher};
pub use traits::FeedFetcher;

#[cfg(test)]
pub use traits::MockFeedFetcher;
