use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::Link;
use crate::errors::{StoreError, StoreResult};
use crate::storage::traits::SeenRepository;

/// Seen links kept in memory and mirrored to a text file, one URL per line.
///
/// Every `record` rewrites the whole file through a temp file in the same
/// directory, so the file on disk is always either the old or the new set.
pub struct SeenFileStore {
    path: PathBuf,
    links: Vec<Link>,
    index: HashSet<Link>,
}

impl SeenFileStore {
    /// Open the store at `path`, creating the file and its directories if needed.
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let dir = parent_dir(&path);
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        // Touch
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        // Rewrites go through rename, so follow a symlinked seen file to its target
        let path = fs::canonicalize(&path).map_err(|e| StoreError::io(&path, e))?;

        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;

        let mut store = Self {
            path,
            links: Vec::new(),
            index: HashSet::new(),
        };

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let link = Link::from(line);
            if store.index.insert(link.clone()) {
                tracing::debug!(link = %link, "loaded from seen file");
                store.links.push(link);
            }
        }

        tracing::info!(
            path = %store.path.display(),
            count = store.links.len(),
            "seen store loaded"
        );

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seen links in the order they were first recorded.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn persist(&self) -> StoreResult<()> {
        let dir = parent_dir(&self.path);

        let mut content = String::new();
        for link in &self.links {
            content.push_str(link.as_str());
            content.push('\n');
        }

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;

        // Keep the mode of the existing file instead of the temp file's 0600
        if let Ok(meta) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        Ok(())
    }
}

impl SeenRepository for SeenFileStore {
    fn contains(&self, link: &Link) -> bool {
        self.index.contains(link)
    }

    fn record(&mut self, link: &Link) -> StoreResult<()> {
        if self.index.contains(link) {
            return Ok(());
        }

        self.index.insert(link.clone());
        self.links.push(link.clone());

        if let Err(e) = self.persist() {
            // Roll back so the link is retried next cycle
            self.links.pop();
            self.index.remove(link);
            return Err(e);
        }

        Ok(())
    }
}

/// Directory holding `path`; a bare file name lives in the current directory.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
