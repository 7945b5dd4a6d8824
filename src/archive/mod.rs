pub(crate) mod nsdchat; // Subprocess transport (one nsdchat call per command)

use serde::Deserialize;

use crate::errors::ArchiveError;

/// How `findentry` matches an item against archived file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Wildcard match: the archived name contains the item (`*=`).
    #[default]
    Contains,
    /// Archived name equals the item (`==`).
    Exact,
}

impl MatchPolicy {
    pub fn operator(self) -> &'static str {
        match self {
            MatchPolicy::Contains => "*=",
            MatchPolicy::Exact => "==",
        }
    }
}

/// Request/response access to the archive service's command vocabulary.
///
/// Implementors only provide [`ArchiveClient::execute`]; every call is one blocking
/// round trip whose output is returned trimmed. The provided methods map the
/// service's "empty output means failure" convention onto [`ArchiveError`] wherever
/// a command is documented to return an identifier.
pub trait ArchiveClient {
    fn execute(&self, args: &[&str]) -> Result<String, ArchiveError>;

    /// `srvinfo hostname`
    fn check_connection(&self) -> Result<String, ArchiveError> {
        non_empty(&["srvinfo", "hostname"], self.execute(&["srvinfo", "hostname"])?)
    }

    /// `RestoreSelection create <host> [<destination>]`, returns the selection id.
    fn create_selection(&self, host: &str, destination: Option<&str>) -> Result<String, ArchiveError> {
        let mut args = vec!["RestoreSelection", "create", host];
        args.extend(destination);
        non_empty(&args, self.execute(&args)?)
    }

    /// Adds the archived entries matching `item` to the selection and returns the
    /// service's match count verbatim. When several entries match, the service
    /// decides which one is kept.
    fn find_entry(
        &self,
        selection: &str,
        archive_id: &str,
        item: &str,
        policy: MatchPolicy,
    ) -> Result<String, ArchiveError> {
        if item.contains('\'') {
            return Err(ArchiveError::UnsupportedItem {
                item: item.to_string(),
            });
        }
        let query = format!("{{name {} '{}'}}", policy.operator(), item);
        self.execute(&["RestoreSelection", selection, "findentry", archive_id, &query])
    }

    /// `RestoreSelection <id> entries`; unparsable output counts as zero.
    fn count_entries(&self, selection: &str) -> Result<u64, ArchiveError> {
        let output = self.execute(&["RestoreSelection", selection, "entries"])?;
        Ok(output.parse().unwrap_or(0))
    }

    /// `RestoreSelection <id> volumes`, split into volume ids.
    fn list_volumes(&self, selection: &str) -> Result<Vec<String>, ArchiveError> {
        let output = self.execute(&["RestoreSelection", selection, "volumes"])?;
        Ok(output.split_whitespace().map(str::to_string).collect())
    }

    fn volume_label(&self, volume: &str) -> Result<String, ArchiveError> {
        self.execute(&["Volume", volume, "label"])
    }

    fn volume_barcode(&self, volume: &str) -> Result<String, ArchiveError> {
        self.execute(&["Volume", volume, "barcode"])
    }

    /// Sets the job monitor title of the selection.
    fn describe(&self, selection: &str, title: &str) -> Result<String, ArchiveError> {
        self.execute(&["RestoreSelection", selection, "describe", title])
    }

    /// Submits the selection and returns the job id.
    fn submit(&self, selection: &str) -> Result<String, ArchiveError> {
        let args = ["RestoreSelection", selection, "submit"];
        non_empty(&args, self.execute(&args)?)
    }

    fn destroy(&self, selection: &str) -> Result<String, ArchiveError> {
        self.execute(&["RestoreSelection", selection, "destroy"])
    }

    /// Last error message recorded by the service for this session.
    fn last_error(&self) -> Result<String, ArchiveError> {
        self.execute(&["geterror"])
    }

    /// Names of all archive plans.
    fn archive_plans(&self) -> Result<Vec<String>, ArchiveError> {
        let output = self.execute(&["ArchivPlan", "names"])?;
        Ok(output.split_whitespace().map(str::to_string).collect())
    }
}

fn non_empty(args: &[&str], output: String) -> Result<String, ArchiveError> {
    if output.is_empty() {
        Err(ArchiveError::EmptyResponse {
            command: args.join(" "),
        })
    } else {
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    /// In-memory archive service. Replies are looked up by the command with its
    /// selection/volume id removed (e.g. `"RestoreSelection findentry"`); several
    /// queued replies for one command are handed out in order, the last one repeats.
    #[derive(Default)]
    pub(crate) struct ScriptedArchive {
        replies: RefCell<HashMap<String, VecDeque<Result<String, String>>>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedArchive {
        pub(crate) fn reply(self, command: &str, output: &str) -> Self {
            self.push(command, Ok(output.to_string()))
        }

        pub(crate) fn fail(self, command: &str, stderr: &str) -> Self {
            self.push(command, Err(stderr.to_string()))
        }

        fn push(self, command: &str, reply: Result<String, String>) -> Self {
            self.replies
                .borrow_mut()
                .entry(command.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub(crate) fn count(&self, prefix: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn key(args: &[&str]) -> String {
            match args {
                ["RestoreSelection", "create", ..] => "RestoreSelection create".to_string(),
                ["RestoreSelection", _, op, ..] => format!("RestoreSelection {op}"),
                ["Volume", volume, op] => format!("Volume {volume} {op}"),
                _ => args.join(" "),
            }
        }
    }

    impl ArchiveClient for ScriptedArchive {
        fn execute(&self, args: &[&str]) -> Result<String, ArchiveError> {
            self.calls.borrow_mut().push(args.join(" "));
            let mut replies = self.replies.borrow_mut();
            let reply = match replies.get_mut(&Self::key(args)) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            match reply {
                Some(Ok(output)) => Ok(output),
                Some(Err(stderr)) => Err(ArchiveError::CommandFailed {
                    command: args.join(" "),
                    status: failed_status(),
                    stderr,
                }),
                None => Ok(String::new()),
            }
        }
    }

    #[cfg(unix)]
    fn failed_status() -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(1 << 8)
    }

    #[cfg(windows)]
    fn failed_status() -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(1)
    }

    #[test]
    fn find_entry_builds_match_expression() -> anyhow::Result<()> {
        let archive = ScriptedArchive::default().reply("RestoreSelection findentry", "1");
        assert_eq!(
            archive.find_entry("10042", "10001", "A001C003", MatchPolicy::Contains)?,
            "1"
        );
        archive.find_entry("10042", "10001", "A001C003.mov", MatchPolicy::Exact)?;
        assert_eq!(
            archive.calls(),
            vec![
                "RestoreSelection 10042 findentry 10001 {name *= 'A001C003'}",
                "RestoreSelection 10042 findentry 10001 {name == 'A001C003.mov'}",
            ]
        );
        Ok(())
    }

    #[test]
    fn quoted_items_are_rejected_before_the_call() {
        let archive = ScriptedArchive::default().reply("RestoreSelection findentry", "1");
        let result = archive.find_entry("10042", "10001", "O'Brien.mov", MatchPolicy::Contains);
        assert!(matches!(result, Err(ArchiveError::UnsupportedItem { .. })));
        assert!(archive.calls().is_empty());
    }

    #[test]
    fn empty_identifiers_are_failures() {
        let archive = ScriptedArchive::default();
        assert!(matches!(
            archive.check_connection(),
            Err(ArchiveError::EmptyResponse { .. })
        ));
        assert!(matches!(
            archive.create_selection("localhost", None),
            Err(ArchiveError::EmptyResponse { .. })
        ));
        assert!(matches!(
            archive.submit("10042"),
            Err(ArchiveError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn create_selection_passes_optional_destination() -> anyhow::Result<()> {
        let archive = ScriptedArchive::default().reply("RestoreSelection create", "10042");
        assert_eq!(archive.create_selection("localhost", None)?, "10042");
        archive.create_selection("localhost", Some("/Volumes/RESTORE/"))?;
        assert_eq!(
            archive.calls(),
            vec![
                "RestoreSelection create localhost",
                "RestoreSelection create localhost /Volumes/RESTORE/",
            ]
        );
        Ok(())
    }

    #[test]
    fn counts_and_lists_are_decoded() -> anyhow::Result<()> {
        let archive = ScriptedArchive::default()
            .reply("RestoreSelection entries", "4")
            .reply("RestoreSelection volumes", "10007 10003")
            .reply("ArchivPlan names", "Default-Archive Axle");
        assert_eq!(archive.count_entries("10042")?, 4);
        assert_eq!(archive.list_volumes("10042")?, vec!["10007", "10003"]);
        assert_eq!(archive.archive_plans()?, vec!["Default-Archive", "Axle"]);

        let garbled = ScriptedArchive::default().reply("RestoreSelection entries", "n/a");
        assert_eq!(garbled.count_entries("10042")?, 0);
        Ok(())
    }
}
