use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use crate::error::Error;

/// Something that can run `gh` with an argument list.
///
/// The real implementation shells out; tests script the responses.
#[async_trait]
pub trait GhRunner: Send + Sync {
    /// Run `gh <args>` and return trimmed stdout.
    async fn run(&self, args: &[String]) -> Result<String, Error>;
}

/// Runs the `gh` binary found on `PATH`, in the process working directory.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: String,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::with_program("gh")
    }
}

impl GhCli {
    /// Run `program` in place of `gh`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Label for a `gh` call in logs and errors: the first two arguments.
fn command_label(args: &[String]) -> String {
    args.iter().take(2).map(String::as_str).collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl GhRunner for GhCli {
    async fn run(&self, args: &[String]) -> Result<String, Error> {
        let command = command_label(args);
        let start = Instant::now();

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::ExternalTool {
                command: command.clone(),
                message: format!("failed to run '{}' CLI ({}). Is it installed?", self.program, e),
            })?;

        tracing::debug!(
            command = %command,
            elapsed_ms = start.elapsed().as_millis() as u64,
            status = ?output.status.code(),
            "gh finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(Error::ExternalTool { command, message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Check that `gh` is installed and authenticated.
pub async fn check_gh_cli(gh: &dyn GhRunner) -> Result<(), Error> {
    let args = ["auth".to_string(), "status".to_string()];
    match gh.run(&args).await {
        Ok(_) => Ok(()),
        Err(Error::ExternalTool { command, message }) if message.contains("not logged") => {
            Err(Error::ExternalTool {
                command,
                message: "not authenticated with GitHub CLI. Run: gh auth login".to_string(),
            })
        }
        Err(e) => Err(e),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGh;
    use super::*;

    #[test]
    fn test_command_label() {
        let args: Vec<String> = ["api", "graphql", "-f", "query=..."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(command_label(&args), "api graphql");
        assert_eq!(command_label(&[]), "");
    }

    #[tokio::test]
    async fn test_check_gh_cli_ok() {
        let gh = ScriptedGh::new().on(&["auth", "status"], "");
        assert!(check_gh_cli(&gh).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_gh_cli_not_logged_in() {
        let gh = ScriptedGh::new().fail(
            &["auth", "status"],
            "You are not logged into any GitHub hosts.",
        );
        let err = check_gh_cli(&gh).await.unwrap_err();
        assert!(err.to_string().contains("gh auth login"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_external_tool_error() {
        let gh = GhCli::with_program("shiteki-test-no-such-binary");
        let args = vec!["pr".to_string(), "list".to_string()];
        match gh.run(&args).await {
            Err(Error::ExternalTool { command, message }) => {
                assert_eq!(command, "pr list");
                assert!(message.contains("Is it installed?"));
            }
            other => panic!("expected ExternalTool, got {:?}", other),
        }
    }

    #[test]
    fn test_default_program_is_gh() {
        assert_eq!(GhCli::default().program, "gh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_trimmed() {
        let gh = GhCli::with_program("echo");
        let out = gh.run(&["  hello".to_string()]).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_external_tool_error() {
        let gh = GhCli::with_program("false");
        match gh.run(&[]).await {
            Err(Error::ExternalTool { message, .. }) => assert!(message.starts_with("exited with")),
            other => panic!("expected ExternalTool, got {:?}", other),
        }
    }
}
