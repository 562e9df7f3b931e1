//! Desktop notifications. Fire-and-forget: a failed notification is logged
//! and reported as `false`, never as an error.

use std::process::Command;

use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub subtitle: Option<String>,
    pub sound: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }
}

pub trait Notifier {
    /// Show `notification`; `true` when it was delivered.
    fn notify(&self, notification: &Notification) -> bool;
}

/// macOS notifications through `osascript`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsaScriptNotifier;

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl OsaScriptNotifier {
    /// The AppleScript statement for `n`.
    #[must_use]
    pub fn script(n: &Notification) -> String {
        let mut script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape(&n.message),
            escape(&n.title)
        );
        if let Some(subtitle) = n.subtitle.as_deref().filter(|s| !s.is_empty()) {
            script.push_str(&format!(" subtitle \"{}\"", escape(subtitle)));
        }
        if let Some(sound) = n.sound.as_deref().filter(|s| !s.is_empty()) {
            script.push_str(&format!(" sound name \"{}\"", escape(sound)));
        }
        script
    }
}

impl Notifier for OsaScriptNotifier {
    fn notify(&self, notification: &Notification) -> bool {
        match Command::new("osascript")
            .arg("-e")
            .arg(Self::script(notification))
            .output()
        {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "notification failed"
                );
                false
            }
            Err(err) => {
                warn!(error = %err, "could not run osascript");
                false
            }
        }
    }
}

/// Logs notifications instead of showing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> bool {
        info!(title = %notification.title, message = %notification.message, "notification");
        true
    }
}

/// `osascript` on macOS when enabled, the log otherwise.
#[must_use]
pub fn default_notifier(enabled: bool) -> Box<dyn Notifier> {
    if enabled && cfg!(target_os = "macos") {
        Box::new(OsaScriptNotifier)
    } else {
        Box::new(LogNotifier)
    }
}
