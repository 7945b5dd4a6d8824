// p5restore/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use which::which;

use crate::archive::MatchPolicy;
use crate::restore::RestoreOptions;

pub const CONFIG_ENV_VAR: &str = "P5RESTORE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "p5restore.json";

// Structs for deserializing p5restore.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonNsdchatConfig {
    pub path: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonNotificationConfig {
    #[serde(default)]
    pub recipients: Vec<String>,
    pub sender: Option<String>,
    pub mail_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonConfig {
    pub archive_id: Option<String>,
    pub nsdchat: Option<JsonNsdchatConfig>,
    pub client_host: Option<String>,
    pub restore_destination: Option<String>,
    #[serde(default)]
    pub match_policy: MatchPolicy,
    #[serde(default)]
    pub deduplicate_items: bool,
    #[serde(default)]
    pub destroy_abandoned_selections: bool,
    pub base_dir: Option<PathBuf>,
    pub notification: Option<JsonNotificationConfig>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct NsdchatConfig {
    pub program: PathBuf,
    pub session_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub recipients: Vec<String>,
    pub sender: Option<String>,
    pub mail_command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub archive_id: String,
    pub nsdchat: NsdchatConfig,
    pub client_host: String,
    pub restore_destination: Option<String>,
    pub match_policy: MatchPolicy,
    pub deduplicate_items: bool,
    pub destroy_abandoned_selections: bool,
    pub base_dir: PathBuf,
    pub notification: NotificationConfig,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;
        Self::from_raw(raw_json_config)
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))
    }

    pub fn from_raw(raw: RawJsonConfig) -> Result<Self> {
        let archive_id = raw
            .archive_id
            .filter(|s| !s.trim().is_empty())
            .context("archive_id must be set and non-empty")?;

        let nsdchat_raw = raw.nsdchat.context("nsdchat section must be set")?;
        let program = nsdchat_raw
            .path
            .filter(|s| !s.trim().is_empty())
            .context("nsdchat.path must be set and non-empty")?;
        if nsdchat_raw.args.iter().any(|arg| arg.trim().is_empty()) {
            anyhow::bail!("nsdchat.args must not contain empty entries");
        }

        let notification_raw = raw
            .notification
            .context("notification section must be set")?;
        let recipients: Vec<String> = notification_raw
            .recipients
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if recipients.is_empty() {
            anyhow::bail!("notification.recipients must list at least one address");
        }
        let mail_command = notification_raw
            .mail_command
            .filter(|cmd| !cmd.is_empty())
            .unwrap_or_else(|| vec!["sendmail".to_string(), "-t".to_string()]);

        Ok(AppConfig {
            archive_id,
            nsdchat: NsdchatConfig {
                program: PathBuf::from(program),
                session_args: nsdchat_raw.args,
            },
            client_host: raw
                .client_host
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "localhost".to_string()),
            restore_destination: raw.restore_destination.filter(|s| !s.trim().is_empty()),
            match_policy: raw.match_policy,
            deduplicate_items: raw.deduplicate_items,
            destroy_abandoned_selections: raw.destroy_abandoned_selections,
            base_dir: raw.base_dir.unwrap_or_else(|| PathBuf::from(".")),
            notification: NotificationConfig {
                recipients,
                sender: notification_raw.sender.filter(|s| !s.trim().is_empty()),
                mail_command,
            },
        })
    }

    /// Protocol settings for one run.
    pub fn restore_options(&self, dry_run: bool) -> RestoreOptions {
        RestoreOptions {
            archive_id: self.archive_id.clone(),
            client_host: self.client_host.clone(),
            destination: self.restore_destination.clone(),
            match_policy: self.match_policy,
            dry_run,
            deduplicate: self.deduplicate_items,
            destroy_abandoned: self.destroy_abandoned_selections,
        }
    }

    /// Resolves a bare `nsdchat.path` against `PATH`.
    pub fn nsdchat_program(&self) -> Result<PathBuf> {
        let program = &self.nsdchat.program;
        if program.components().count() > 1 {
            return Ok(program.clone());
        }
        which(program).with_context(|| {
            format!(
                "{} executable not found in PATH. Please install the P5 command line client or set nsdchat.path.",
                program.display()
            )
        })
    }
}

/// Config lookup order: explicit path, `$P5RESTORE_CONFIG`, `./p5restore.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawJsonConfig {
        serde_json::from_value(value).expect("valid raw config")
    }

    fn minimal() -> serde_json::Value {
        json!({
            "archive_id": "10001",
            "nsdchat": { "path": "/usr/local/aw/bin/nsdchat", "args": ["-s", "awsock:/admin:secret@p5:9001"] },
            "notification": { "recipients": ["ops@example.com", " "] }
        })
    }

    #[test]
    fn test_minimal_config_gets_defaults() -> anyhow::Result<()> {
        let config = AppConfig::from_raw(raw(minimal()))?;

        assert_eq!(config.archive_id, "10001");
        assert_eq!(config.client_host, "localhost");
        assert_eq!(config.restore_destination, None);
        assert_eq!(config.match_policy, MatchPolicy::Contains);
        assert!(!config.deduplicate_items);
        assert_eq!(config.base_dir, PathBuf::from("."));
        assert_eq!(config.notification.recipients, vec!["ops@example.com"]);
        assert_eq!(config.notification.mail_command, vec!["sendmail", "-t"]);
        assert_eq!(config.nsdchat.session_args, vec!["-s", "awsock:/admin:secret@p5:9001"]);
        Ok(())
    }

    #[test]
    fn test_full_config() -> anyhow::Result<()> {
        let mut value = minimal();
        value["match_policy"] = json!("exact");
        value["restore_destination"] = json!("/Volumes/RESTORE/Archiware/");
        value["deduplicate_items"] = json!(true);
        value["destroy_abandoned_selections"] = json!(true);
        value["base_dir"] = json!("/srv/p5restore");
        let config = AppConfig::from_raw(raw(value))?;

        let options = config.restore_options(true);
        assert_eq!(options.match_policy, MatchPolicy::Exact);
        assert_eq!(options.destination.as_deref(), Some("/Volumes/RESTORE/Archiware/"));
        assert!(options.dry_run && options.deduplicate && options.destroy_abandoned);
        assert_eq!(config.base_dir, PathBuf::from("/srv/p5restore"));
        Ok(())
    }

    #[test]
    fn test_empty_entries_are_rejected() {
        let mut value = minimal();
        value["archive_id"] = json!("  ");
        assert!(AppConfig::from_raw(raw(value)).is_err());

        let mut value = minimal();
        value["nsdchat"]["args"] = json!(["-s", ""]);
        assert!(AppConfig::from_raw(raw(value)).is_err());

        let mut value = minimal();
        value["notification"]["recipients"] = json!([]);
        assert!(AppConfig::from_raw(raw(value)).is_err());

        let mut value = minimal();
        value["nsdchat"] = json!({ "args": [] });
        assert!(AppConfig::from_raw(raw(value)).is_err());
    }

    #[test]
    fn test_unknown_match_policy_fails_to_parse() {
        let mut value = minimal();
        value["match_policy"] = json!("fuzzy");
        assert!(serde_json::from_value::<RawJsonConfig>(value).is_err());
    }

    #[test]
    fn test_load_from_json_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(&minimal())?)?;

        let config = AppConfig::load_from_json(&path)?;
        assert_eq!(config.archive_id, "10001");
        assert_eq!(
            config.nsdchat_program()?,
            PathBuf::from("/usr/local/aw/bin/nsdchat")
        );

        assert!(AppConfig::load_from_json(&dir.path().join("missing.json")).is_err());
        Ok(())
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let explicit = Path::new("/etc/p5restore.json");
        assert_eq!(resolve_config_path(Some(explicit)), explicit.to_path_buf());
    }
}
