use std::process::Command;

use crate::domain::Link;
use crate::errors::{NotifyError, NotifyResult};

/// Action run once for every link that has not been seen before.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, link: &Link) -> NotifyResult<()>;
}

impl<F> Notifier for F
where
    F: Fn(&Link) -> NotifyResult<()> + Send + Sync,
{
    fn notify(&self, link: &Link) -> NotifyResult<()> {
        self(link)
    }
}

/// Runs a shell command for each new link.
///
/// The command is run as `sh -c <command> torrent-feeder <link>`, so the link
/// is available as `$1` and as `FEEDER_LINK`.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: String,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, link: &Link) -> NotifyResult<()> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .arg("torrent-feeder")
            .arg(link.as_str())
            .env("FEEDER_LINK", link.as_str())
            .status()
            .map_err(NotifyError::Spawn)?;

        if !status.success() {
            return Err(NotifyError::Failed(status));
        }

        Ok(())
    }
}
