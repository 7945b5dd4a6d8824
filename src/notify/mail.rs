// p5restore/src/notify/mail.rs
use anyhow::{Context, Result};
use base64::Engine;
use chrono::Local;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::NotificationConfig;

use super::{Notification, Notifier};

/// Hands messages to a sendmail compatible command (`sendmail -t` by default),
/// which reads recipients from the headers.
#[derive(Debug, Clone)]
pub struct MailCommandNotifier {
    command: Vec<String>,
    sender: Option<String>,
    recipients: Vec<String>,
}

impl MailCommandNotifier {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            command: config.mail_command.clone(),
            sender: config.sender.clone(),
            recipients: config.recipients.clone(),
        }
    }

    pub(crate) fn render(&self, notification: &Notification) -> String {
        let mut message = String::new();
        if let Some(sender) = &self.sender {
            message.push_str(&format!("From: {sender}\n"));
        }
        message.push_str(&format!("To: {}\n", self.recipients.join(", ")));
        message.push_str(&format!("Subject: {}\n", encode_header(&notification.subject)));
        message.push_str(&format!("Date: {}\n", Local::now().to_rfc2822()));
        message.push_str("MIME-Version: 1.0\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\n\n");
        message.push_str(&notification.body);
        if !message.ends_with('\n') {
            message.push('\n');
        }
        message
    }
}

/// Longest UTF-8 run per encoded word, keeping each word within 75 characters.
const ENCODED_CHUNK: usize = 45;

/// Header value without line breaks; non-ASCII text becomes RFC 2047 encoded words.
fn encode_header(value: &str) -> String {
    let clean: String = value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    if clean.is_ascii() {
        return clean;
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in clean.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_CHUNK {
            words.push(std::mem::take(&mut chunk));
        }
        chunk.push(c);
    }
    words.push(chunk);
    words
        .iter()
        .map(|word| {
            format!(
                "=?utf-8?B?{}?=",
                base64::engine::general_purpose::STANDARD.encode(word)
            )
        })
        .collect::<Vec<_>>()
        .join("\n ")
}

impl Notifier for MailCommandNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .context("mail_command is empty")?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute mail command {}", program))?;

        child
            .stdin
            .take()
            .context("mail command stdin unavailable")?
            .write_all(self.render(notification).as_bytes())
            .with_context(|| format!("Failed to write message to {}", program))?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for mail command {}", program))?;
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "Mail command {} failed with status: {}\nStderr: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        tracing::info!(
            "Mail \"{}\" sent to {}",
            notification.subject,
            self.recipients.join(", ")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(command: Vec<String>) -> MailCommandNotifier {
        MailCommandNotifier::from_config(&NotificationConfig {
            recipients: vec!["ops@example.com".to_string(), "dit@example.com".to_string()],
            sender: Some("p5restore@example.com".to_string()),
            mail_command: command,
        })
    }

    #[test]
    fn renders_headers_and_body() {
        let message = notifier(vec!["sendmail".to_string()]).render(&Notification::test_mail());
        assert!(message.starts_with("From: p5restore@example.com\nTo: ops@example.com, dit@example.com\nSubject: Test-Mail\n"));
        assert!(message.contains("\n\nMail notification works.\n"));
    }

    #[test]
    fn subjects_are_encoded_and_kept_on_one_header() {
        let message = notifier(vec!["sendmail".to_string()]).render(&Notification {
            subject: "Log Output: Clip ä.ale\r\nBcc: x@y".to_string(),
            body: "trace".to_string(),
        });
        let subject = message
            .lines()
            .find(|line| line.starts_with("Subject: "))
            .unwrap_or_default();
        assert!(subject.starts_with("Subject: =?utf-8?B?"));
        assert!(!message.lines().any(|line| line.starts_with("Bcc:")));

        let encoded = subject.trim_start_matches("Subject: =?utf-8?B?").trim_end_matches("?=");
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "Log Output: Clip ä.aleBcc: x@y"
        );
    }

    #[test]
    fn long_subjects_are_split_into_folded_words() {
        let subject = "Log Output: ".to_string() + &"ä".repeat(40);
        let encoded = encode_header(&subject);
        assert_eq!(encoded.lines().count(), 3);
        assert!(encoded.lines().all(|line| line.trim().len() <= 75));
        assert_eq!(encode_header("Restore 1077 started"), "Restore 1077 started");
    }

    #[cfg(unix)]
    #[test]
    fn pipes_message_into_mail_command() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let spool = dir.path().join("outgoing.eml");
        let command = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            format!("cat > '{}'", spool.display()),
        ];
        notifier(command).send(&Notification::test_mail())?;

        let written = std::fs::read_to_string(&spool)?;
        assert!(written.contains("Subject: Test-Mail\n"));
        assert!(written.ends_with("Mail notification works.\n"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failing_mail_command_is_an_error() {
        let command = vec!["/bin/sh".to_string(), "-c".to_string(), "cat >/dev/null; exit 75".to_string()];
        assert!(notifier(command).send(&Notification::test_mail()).is_err());
    }
}
