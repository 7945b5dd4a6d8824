pub(crate) mod mail; // sendmail compatible transport

use crate::restore::BatchOutcome;
use crate::restore::outcome::FileState;

/// A rendered operator message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Delivers notifications to the configured recipients.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

impl Notification {
    /// Message for the outcome of a batch file, if one is due: submitted jobs and
    /// failed submits notify, every other outcome only shows up in the logs.
    pub fn for_outcome(outcome: &BatchOutcome) -> Option<Self> {
        match outcome.state {
            FileState::Submitted => {
                let job_id = outcome.job_id.as_deref().unwrap_or("-");
                let mut body = String::from("Volumes needed for restore:\n");
                for volume in &outcome.volumes {
                    body.push_str(&format!("\"{}\": \"{}\"\n", volume.id, volume.display_name()));
                }
                if !outcome.misses.is_empty() {
                    body.push_str("\nNot found in archive:\n");
                    for item in &outcome.misses {
                        body.push_str(&format!("{item}\n"));
                    }
                }
                Some(Notification {
                    subject: format!("Restore {job_id} started"),
                    body,
                })
            }
            FileState::FailedSubmit => Some(Notification {
                subject: "ERROR".to_string(),
                body: format!(
                    "Could not submit restore selection of \"{}\".",
                    outcome.source.display()
                ),
            }),
            _ => None,
        }
    }

    /// The full trace of one file.
    pub fn trace_log(outcome: &BatchOutcome) -> Self {
        Notification {
            subject: format!("Log Output: {}", outcome.title),
            body: outcome.trace_text(),
        }
    }

    pub fn test_mail() -> Self {
        Notification {
            subject: "Test-Mail".to_string(),
            body: "Mail notification works.".to_string(),
        }
    }
}
