//! Desktop notifications for phase completions.
//!
//! Best effort: a missing backend or a failed command is logged at debug
//! level and otherwise ignored. The timer never fails because a
//! notification could not be shown.

use std::process::Command;

use tomata_core::{Config, Phase};

const TITLE: &str = "Tomata";

/// Available notification backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    /// Linux notify-send
    NotifySend,
    /// macOS terminal-notifier
    TerminalNotifier,
    /// macOS osascript
    Osascript,
    /// Fallback: print to stdout
    Echo,
}

impl Backend {
    /// Pick the best available backend for the current platform.
    fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            if command_exists("terminal-notifier") {
                return Self::TerminalNotifier;
            }
            Self::Osascript
        }

        #[cfg(target_os = "linux")]
        {
            if command_exists("notify-send") {
                return Self::NotifySend;
            }
            Self::Echo
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Self::Echo
        }
    }

    fn send(&self, message: &str) -> std::io::Result<()> {
        let status = match self {
            Self::NotifySend => Command::new("notify-send")
                .args([TITLE, message])
                .status()?,
            Self::TerminalNotifier => Command::new("terminal-notifier")
                .args(["-title", TITLE, "-message", message])
                .status()?,
            Self::Osascript => {
                let script = format!(
                    r#"display notification "{}" with title "{TITLE}""#,
                    message.replace('"', r#"\""#)
                );
                Command::new("osascript").args(["-e", &script]).status()?
            }
            Self::Echo => {
                println!("[{TITLE}] {message}");
                return Ok(());
            }
        };
        if !status.success() {
            tracing::debug!(backend = ?self, "notification command exited with {status}");
        }
        Ok(())
    }
}

#[allow(dead_code)] // unused on platforms with a fixed backend
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Announce a completed phase. Honors the notification settings; the
/// terminal bell stands in for the completion sound.
pub fn phase_complete(config: &Config, finished: Phase, next: Phase) {
    if !config.notifications.enabled {
        return;
    }
    let message = match finished {
        Phase::Focus => format!("Focus complete! Up next: {next}."),
        Phase::ShortBreak | Phase::LongBreak => "Break over! Time to focus.".to_string(),
    };
    if config.notifications.sound && config.notifications.volume > 0 {
        print!("\x07");
    }
    if let Err(e) = Backend::detect().send(&message) {
        tracing::debug!("failed to send notification: {e}");
    }
}
