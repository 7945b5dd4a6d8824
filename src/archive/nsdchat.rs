// p5restore/src/archive/nsdchat.rs
use std::path::PathBuf;
use std::process::Command;

use crate::errors::ArchiveError;

use super::ArchiveClient;

/// Talks to the P5 server through the `nsdchat` command line client.
///
/// Every command spawns one `nsdchat <session args> -c <command...>` process; no
/// state is kept between calls.
#[derive(Debug, Clone)]
pub struct NsdchatClient {
    program: PathBuf,
    session_args: Vec<String>,
}

impl NsdchatClient {
    pub fn new(program: PathBuf, session_args: Vec<String>) -> Self {
        Self {
            program,
            session_args,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.session_args).arg("-c").args(args);
        cmd
    }
}

impl ArchiveClient for NsdchatClient {
    fn execute(&self, args: &[&str]) -> Result<String, ArchiveError> {
        let command_line = args.join(" ");
        tracing::debug!("nsdchat -c {}", command_line);

        let output = self
            .command(args)
            .output()
            .map_err(|source| ArchiveError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ArchiveError::CommandFailed {
                command: command_line,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| ArchiveError::NotUtf8 {
            command: command_line.clone(),
        })?;
        let result = stdout.trim().to_string();
        tracing::trace!("nsdchat -c {} -> {:?}", command_line, result);
        Ok(result)
    }
}
