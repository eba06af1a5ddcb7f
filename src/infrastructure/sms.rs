//! SMS collaborator.
//!
//! Sending is fire-and-forget: failures are logged, never propagated, and
//! the caller is not slowed down. The shipped backend hands the message to
//! an external command (an mmcli/gammu wrapper script); without one
//! configured, messages are dropped with a warning, matching a host where
//! SMS access was never granted.

use tokio::process::Command;
use tracing::{debug, warn};

/// Fire-and-forget SMS dispatch.
pub trait SmsSender: Send + Sync {
    fn send(&self, number: &str, message: &str);
}

/// Spawns `<command> <number> <message>` for every SMS.
pub struct CommandSmsSender {
    command: String,
}

impl CommandSmsSender {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SmsSender for CommandSmsSender {
    fn send(&self, number: &str, message: &str) {
        debug!("Dispatching SMS to {number}");
        match Command::new(&self.command)
            .arg(number)
            .arg(message)
            .spawn()
        {
            Ok(mut child) => {
                let number = number.to_string();
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if !status.success() => {
                            warn!("SMS command for {number} exited with {status}");
                        }
                        Err(e) => warn!("SMS command for {number} failed: {e}"),
                        _ => {}
                    }
                });
            }
            Err(e) => warn!("Could not start SMS command: {e}"),
        }
    }
}

/// Used when no SMS backend is configured; drops messages silently apart
/// from a log line.
pub struct SmsDisabled;

impl SmsSender for SmsDisabled {
    fn send(&self, number: &str, _message: &str) {
        warn!("SMS not configured; dropping message to {number}");
    }
}
