//! Provider context, status logging and confirmation callbacks
//!
//! Every `get`/`set` call receives a [`ProviderContext`]. Its
//! [`ProviderLogger`] records what happened to each resource so the caller
//! can report changes without knowing anything about the provider.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a resource event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Debug,
    Info,
    Notice,
    Warning,
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
    Failed,
}

impl Status {
    fn level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Creating | Self::Updating | Self::Deleting => log::Level::Debug,
            Self::Info | Self::Notice | Self::Created | Self::Updated | Self::Deleted => {
                log::Level::Info
            }
            Self::Warning => log::Level::Warn,
            Self::Failed => log::Level::Error,
        }
    }

    /// Whether this status ends the processing of a resource
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Deleted | Self::Failed
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Creating => "creating",
            Self::Created => "created",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One thing a provider reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Title of the resource, `None` for type-wide messages
    #[serde(default, rename = "name")]
    pub resource: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub message: String,
}

/// Records provider events and forwards them to `log`
#[derive(Debug)]
pub struct ProviderLogger {
    type_name: String,
    events: Vec<StatusEvent>,
}

impl ProviderLogger {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event as reported by a provider
    pub fn record(&mut self, resource: Option<&str>, status: Status, message: &str) {
        match resource {
            Some(title) => log::log!(
                status.level(),
                "{}[{}]: {}: {}",
                self.type_name,
                title,
                status,
                message
            ),
            None => log::log!(status.level(), "{}: {}", self.type_name, message),
        }
        self.events.push(StatusEvent {
            resource: resource.map(str::to_string),
            status,
            message: message.to_string(),
        });
    }

    pub fn debug(&mut self, message: &str) {
        self.record(None, Status::Debug, message);
    }

    pub fn info(&mut self, message: &str) {
        self.record(None, Status::Info, message);
    }

    pub fn notice(&mut self, resource: &str, message: &str) {
        self.record(Some(resource), Status::Notice, message);
    }

    pub fn warning(&mut self, resource: &str, message: &str) {
        self.record(Some(resource), Status::Warning, message);
    }

    pub fn fail(&mut self, resource: &str, message: &str) {
        self.record(Some(resource), Status::Failed, message);
    }

    /// Run `f` while creating `resource`
    ///
    /// Failures are recorded as `failed` events and not propagated.
    pub fn creating<F>(&mut self, resource: &str, f: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.process(resource, (Status::Creating, Status::Created), f)
    }

    /// Run `f` while updating `resource`
    pub fn updating<F>(&mut self, resource: &str, f: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.process(resource, (Status::Updating, Status::Updated), f)
    }

    /// Run `f` while deleting `resource`
    pub fn deleting<F>(&mut self, resource: &str, f: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.process(resource, (Status::Deleting, Status::Deleted), f)
    }

    fn process<F>(&mut self, resource: &str, (start, done): (Status, Status), f: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.record(Some(resource), start, "");
        match f(self) {
            Ok(()) => {
                if !self.failed(resource) {
                    self.record(Some(resource), done, "");
                }
                true
            }
            Err(e) => {
                self.record(Some(resource), Status::Failed, &format!("{e:#}"));
                false
            }
        }
    }

    /// Whether a `failed` event was recorded for `resource`
    pub fn failed(&self, resource: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.status == Status::Failed && e.resource.as_deref() == Some(resource))
    }

    pub fn has_failures(&self) -> bool {
        self.events.iter().any(|e| e.status == Status::Failed)
    }

    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<StatusEvent> {
        self.events
    }
}

/// Context passed to provider `get`/`set` calls
#[derive(Debug)]
pub struct ProviderContext {
    /// Report what would change without changing anything
    pub noop: bool,
    pub logger: ProviderLogger,
}

impl ProviderContext {
    pub fn new(type_name: &str, noop: bool) -> Self {
        Self {
            noop,
            logger: ProviderLogger::new(type_name),
        }
    }
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_success_records_done() {
        let mut logger = ProviderLogger::new("apt_key");
        let ok = logger.creating("ABCD1234", |_| Ok(()));
        assert!(ok);
        let statuses: Vec<Status> = logger.events().iter().map(|e| e.status).collect();
        assert_eq!(statuses, [Status::Creating, Status::Created]);
        assert!(!logger.has_failures());
    }

    #[test]
    fn test_block_error_records_failure() {
        let mut logger = ProviderLogger::new("apt_key");
        let ok = logger.deleting("ABCD1234", |_| anyhow::bail!("apt-key del failed"));
        assert!(!ok);
        let last = logger.events().last().unwrap();
        assert_eq!(last.status, Status::Failed);
        assert_eq!(last.message, "apt-key del failed");
        assert!(logger.failed("ABCD1234"));
        assert!(!logger.failed("OTHER"));
    }

    #[test]
    fn test_fail_inside_block_suppresses_done() {
        let mut logger = ProviderLogger::new("apt_key");
        logger.creating("ABCD1234", |log| {
            log.fail("ABCD1234", "fingerprint mismatch");
            Ok(())
        });
        let statuses: Vec<Status> = logger.events().iter().map(|e| e.status).collect();
        assert_eq!(statuses, [Status::Creating, Status::Failed]);
    }

    #[test]
    fn test_status_event_deserializes_from_provider_json() {
        let event: StatusEvent =
            serde_json::from_str(r#"{"name":"DefaultAppPool","status":"updated"}"#).unwrap();
        assert_eq!(event.resource.as_deref(), Some("DefaultAppPool"));
        assert_eq!(event.status, Status::Updated);
        assert!(event.message.is_empty());
        assert!(event.status.is_terminal());
    }

    #[test]
    fn test_confirm_callbacks() {
        assert!(AutoConfirm.confirm("Apply?").unwrap());
        assert!(!AutoDecline.confirm("Apply?").unwrap());
    }
}
