use std::fmt;

use serde::{Deserialize, Serialize};

/// A URL taken from a feed item, compared by exact string value.
///
/// No normalization happens: `http://x/a` and `http://x/a/` are different links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(String);

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Link {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Link {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl From<String> for Link {
    fn from(url: String) -> Self {
        Self(url)
    }
}
