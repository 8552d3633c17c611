use std::fs;
use std::path::Path;
use std::time::Duration;

use feed_rs::parser;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::blocking::Client;
use url::Url;

use crate::domain::Link;
use crate::errors::{FetchError, FetchResult};
use crate::sources::traits::FeedFetcher;

const USER_AGENT: &str = concat!("torrent-feeder/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    /// Only emit enclosure URLs, ignoring plain item links
    pub enclosures_only: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            enclosures_only: false,
        }
    }
}

/// Fetches RSS, Atom and JSON feeds over HTTP(S) or from local files.
pub struct HttpFeedFetcher {
    client: Client,
    enclosures_only: bool,
}

impl HttpFeedFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(settings.timeout)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            enclosures_only: settings.enclosures_only,
        }
    }

    fn retrieve(&self, feed_url: &str) -> FetchResult<Vec<u8>> {
        let url = match Url::parse(feed_url) {
            Ok(url) => url,
            // Not a URL at all, treat it as a local path
            Err(_) => return read_file(Path::new(feed_url)),
        };

        match url.scheme() {
            "http" | "https" => self.retrieve_http(url.as_str()),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::UnsupportedScheme(feed_url.to_string()))?;
                read_file(&path)
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }

    fn retrieve_http(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new(FetchSettings::default())
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, feed_url: &str) -> FetchResult<Vec<Link>> {
        let bytes = self.retrieve(feed_url)?;
        let base = Url::parse(feed_url)
            .ok()
            .or_else(|| Url::from_file_path(feed_url).ok());
        parse_links(&bytes, base.as_ref(), self.enclosures_only)
    }
}

fn read_file(path: &Path) -> FetchResult<Vec<u8>> {
    fs::read(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse feed bytes into the links of its entries.
///
/// Per entry: `<link>` hrefs in document order, then enclosure URLs. A URL
/// that appears twice in the same entry is emitted once. Enclosure URLs keep
/// the text of their `url` attribute; relative ones are resolved against
/// `base` when it is known.
pub fn parse_links(
    bytes: &[u8],
    base: Option<&Url>,
    enclosures_only: bool,
) -> FetchResult<Vec<Link>> {
    let parsed = parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    // feed-rs only exposes enclosures as normalized `Url`s and drops relative ones
    let raw = raw_enclosures(bytes).filter(|items| items.len() == parsed.entries.len());

    let mut links = Vec::new();

    for (index, entry) in parsed.entries.into_iter().enumerate() {
        let mut entry_links: Vec<String> = Vec::new();

        for link in entry.links {
            let is_enclosure = link.rel.as_deref() == Some("enclosure");
            if is_enclosure || !enclosures_only {
                entry_links.push(link.href);
            }
        }

        match raw.as_ref().map(|items| &items[index]) {
            Some(urls) => {
                entry_links.extend(urls.iter().map(|url| resolve_enclosure(url, base)));
            }
            None => {
                for content in entry.media.into_iter().flat_map(|media| media.content) {
                    match content.url {
                        Some(url) => entry_links.push(url.to_string()),
                        None => tracing::warn!(entry = %entry.id, "enclosure without usable URL skipped"),
                    }
                }
            }
        }

        let mut emitted: Vec<&str> = Vec::new();
        for href in &entry_links {
            let href = href.trim();
            if href.is_empty() || emitted.contains(&href) {
                continue;
            }
            emitted.push(href);
            links.push(Link::from(href));
        }
    }

    Ok(links)
}

/// `url` attributes of `<enclosure>` and `<media:content>` elements, grouped
/// per `<item>`/`<entry>` in document order. `None` if the bytes are not XML.
fn raw_enclosures(bytes: &[u8]) -> Option<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut items: Vec<Vec<String>> = Vec::new();
    let mut in_item = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if is_item(e.local_name().as_ref()) => {
                items.push(Vec::new());
                in_item = true;
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if in_item {
                    if let (Some(url), Some(item)) = (enclosure_url(&e), items.last_mut()) {
                        item.push(url);
                    }
                }
            }
            Ok(Event::End(e)) if is_item(e.local_name().as_ref()) => in_item = false,
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }

    Some(items)
}

fn is_item(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

fn enclosure_url(element: &BytesStart<'_>) -> Option<String> {
    if !matches!(element.local_name().as_ref(), b"enclosure" | b"content") {
        return None;
    }

    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"url")
        .and_then(|attr| attr.unescape_value().ok().map(|value| value.into_owned()))
}

/// Absolute URLs pass through untouched; relative ones are joined onto `base`.
fn resolve_enclosure(raw: &str, base: Option<&Url>) -> String {
    let raw = raw.trim();

    match Url::parse(raw) {
        Ok(_) => raw.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base.map(|b| b.join(raw)) {
            Some(Ok(resolved)) => resolved.to_string(),
            _ => {
                tracing::warn!(url = raw, "relative enclosure URL without a feed base");
                raw.to_string()
            }
        },
        Err(e) => {
            tracing::warn!(url = raw, error = %e, "enclosure URL does not parse");
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Runtime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Torrent tracker style RSS: page link plus a .torrent enclosure per item
    const SAMPLE_RSS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Tracker</title>
    <link>https://tracker.example.com/</link>
    <description>Latest uploads</description>
    <item>
      <title>Debian 12.5 amd64 netinst</title>
      <link>https://tracker.example.com/details/1</link>
      <enclosure url="https://tracker.example.com/download/1.torrent" length="31337" type="application/x-bittorrent"/>
    </item>
    <item>
      <title>Fedora 40 Workstation</title>
      <link>https://tracker.example.com/details/2</link>
      <enclosure url="https://tracker.example.com/download/2.torrent" length="42000" type="application/x-bittorrent"/>
    </item>
  </channel>
</rss>"#;

    // Atom entry carrying two links, one of them an enclosure
    const SAMPLE_ATOM: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Releases</title>
  <id>https://example.com/releases.atom</id>
  <updated>2024-01-15T12:00:00Z</updated>
  <entry>
    <title>Release 1.0</title>
    <id>https://example.com/releases/1.0</id>
    <updated>2024-01-15T12:00:00Z</updated>
    <link rel="alternate" href="https://example.com/releases/1.0"/>
    <link rel="enclosure" type="application/x-bittorrent" href="https://example.com/releases/1.0.torrent"/>
  </entry>
  <entry>
    <title>Release 0.9</title>
    <id>https://example.com/releases/0.9</id>
    <updated>2024-01-01T12:00:00Z</updated>
    <link rel="enclosure" type="application/x-bittorrent" href="https://example.com/releases/0.9.torrent"/>
  </entry>
</feed>"#;

    const EMPTY_RSS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Quiet Tracker</title>
    <link>https://quiet.example.com/</link>
    <description>Nothing yet</description>
  </channel>
</rss>"#;

    fn as_strs(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn test_rss_links_then_enclosures_in_item_order() {
        let links = parse_links(SAMPLE_RSS, None, false).unwrap();

        assert_eq!(
            as_strs(&links),
            vec![
                "https://tracker.example.com/details/1",
                "https://tracker.example.com/download/1.torrent",
                "https://tracker.example.com/details/2",
                "https://tracker.example.com/download/2.torrent",
            ]
        );
    }

    #[test]
    fn test_rss_enclosures_only() {
        let links = parse_links(SAMPLE_RSS, None, true).unwrap();

        assert_eq!(
            as_strs(&links),
            vec![
                "https://tracker.example.com/download/1.torrent",
                "https://tracker.example.com/download/2.torrent",
            ]
        );
    }

    #[test]
    fn test_atom_entry_links_in_document_order() {
        let links = parse_links(SAMPLE_ATOM, None, false).unwrap();

        assert_eq!(
            as_strs(&links),
            vec![
                "https://example.com/releases/1.0",
                "https://example.com/releases/1.0.torrent",
                "https://example.com/releases/0.9.torrent",
            ]
        );
    }

    #[test]
    fn test_atom_enclosure_rel_counts_as_enclosure() {
        let links = parse_links(SAMPLE_ATOM, None, true).unwrap();

        assert_eq!(
            as_strs(&links),
            vec![
                "https://example.com/releases/1.0.torrent",
                "https://example.com/releases/0.9.torrent",
            ]
        );
    }

    #[test]
    fn test_feed_without_items_is_empty_not_error() {
        let links = parse_links(EMPTY_RSS, None, false).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_malformed_feed_is_single_parse_error() {
        let result = parse_links(b"<html><body>not a feed</body>", None, false);
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_fetch_from_file_url_and_bare_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, SAMPLE_RSS).unwrap();

        let fetcher = HttpFeedFetcher::new(FetchSettings {
            enclosures_only: true,
            ..FetchSettings::default()
        });

        let file_url = Url::from_file_path(&path).unwrap().to_string();
        let from_url = fetcher.fetch(&file_url).unwrap();
        let from_path = fetcher.fetch(path.to_str().unwrap()).unwrap();

        assert_eq!(from_url.len(), 2);
        assert_eq!(from_url, from_path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let fetcher = HttpFeedFetcher::default();
        let result = fetcher.fetch("/definitely/not/here/feed.xml");
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }

    #[test]
    fn test_unsupported_scheme() {
        let fetcher = HttpFeedFetcher::default();
        let result = fetcher.fetch("ftp://example.com/feed.xml");
        assert!(matches!(result, Err(FetchError::UnsupportedScheme(s)) if s == "ftp"));
    }

    // Enclosure URLs as trackers actually publish them
    const UNTIDY_RSS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Untidy Tracker</title>
    <link>http://Tracker.Example.com/</link>
    <description>Hand-rolled feed</description>
    <item>
      <title>Mixed case host and a space</title>
      <enclosure url="http://Tracker.Example.com/dl/a b.torrent" length="1" type="application/x-bittorrent"/>
    </item>
    <item>
      <title>Relative enclosure</title>
      <enclosure url="/relative/b.torrent" length="1" type="application/x-bittorrent"/>
    </item>
    <item>
      <title>Escaped query and media content</title>
      <enclosure url="http://x/dl?id=1&amp;passkey=abc" length="1" type="application/x-bittorrent"/>
      <media:content url="http://x/c2.torrent" type="application/x-bittorrent"/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_enclosure_url_text_is_kept_verbatim() {
        let links = parse_links(UNTIDY_RSS, None, true).unwrap();

        assert_eq!(links[0].as_str(), "http://Tracker.Example.com/dl/a b.torrent");
        assert_eq!(
            as_strs(&links[2..]),
            vec!["http://x/dl?id=1&passkey=abc", "http://x/c2.torrent"]
        );
    }

    #[test]
    fn test_relative_enclosure_is_resolved_against_feed_url() {
        let base = Url::parse("http://tracker.example.com/feeds/rss.xml").unwrap();
        let links = parse_links(UNTIDY_RSS, Some(&base), true).unwrap();

        assert_eq!(links.len(), 4);
        assert_eq!(links[1].as_str(), "http://tracker.example.com/relative/b.torrent");
    }

    #[test]
    fn test_relative_enclosure_without_base_is_not_dropped() {
        let links = parse_links(UNTIDY_RSS, None, true).unwrap();

        assert_eq!(links.len(), 4);
        assert_eq!(links[1].as_str(), "/relative/b.torrent");
    }

    /// Start a mock server on its own runtime; the blocking client talks to it
    /// from the test thread.
    fn mock_feed(status: u16, body: &'static [u8]) -> (Runtime, MockServer, String) {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/feed.xml"))
                .respond_with(
                    ResponseTemplate::new(status).set_body_raw(body, "application/rss+xml"),
                )
                .mount(&server)
                .await;
            server
        });
        let url = format!("{}/feed.xml", server.uri());
        (runtime, server, url)
    }

    #[test]
    fn test_fetch_over_http() {
        let (_runtime, _server, url) = mock_feed(200, SAMPLE_RSS);
        let fetcher = HttpFeedFetcher::default();

        let links = fetcher.fetch(&url).unwrap();
        assert_eq!(links.len(), 4);
    }

    #[test]
    fn test_http_error_status_is_fetch_error() {
        let (_runtime, _server, url) = mock_feed(404, b"gone");
        let fetcher = HttpFeedFetcher::default();

        let result = fetcher.fetch(&url);
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[test]
    fn test_relative_enclosure_resolved_against_http_feed() {
        let (_runtime, server, url) = mock_feed(200, UNTIDY_RSS);
        let fetcher = HttpFeedFetcher::new(FetchSettings {
            enclosures_only: true,
            ..FetchSettings::default()
        });

        let links = fetcher.fetch(&url).unwrap();
        assert_eq!(
            links[1].as_str(),
            format!("{}/relative/b.torrent", server.uri())
        );
    }
}
