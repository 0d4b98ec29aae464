//! External process invocation.
//!
//! The pipeline never performs cryptography itself; every operation becomes
//! an argv handed to the OpenSSL binary. [`CommandRunner`] is the seam the
//! orchestrator calls through, so tests can record commands instead of
//! spawning processes, and [`OpenSslRunner`] is the real child-process
//! implementation.

use std::process::Command;

use tracing::{debug, warn};

/// Placeholder written to the log in place of a passphrase argument.
pub const REDACTED_PASSWORD: &str = "pass:*********";

/// Executes an external command.
///
/// `command[0]` is the program path, the rest its arguments. The argument
/// positions are a compatibility contract with the OpenSSL command line and
/// must not be reordered by implementations.
pub trait CommandRunner {
    /// Runs the command and reports whether it exited with status zero.
    fn run(&self, command: &[String]) -> bool;
}

/// Runs commands as child processes, capturing their output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslRunner;

impl CommandRunner for OpenSslRunner {
    fn run(&self, command: &[String]) -> bool {
        // Redaction happens before the log call, whatever the level.
        debug!(
            "Executing command : [{}]",
            redact_command(command).join(",")
        );
        let Some((program, args)) = command.split_first() else {
            warn!("Refusing to execute an empty command.");
            return false;
        };
        match Command::new(program).args(args).output() {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!("{}{}", stdout, stderr);
                if !output.status.success() {
                    warn!("{}{}", stdout, stderr);
                    return false;
                }
                true
            }
            Err(err) => {
                warn!("Failed to execute {}: {}.", program, err);
                false
            }
        }
    }
}

/// Returns a copy of the command safe for logging: any argument carrying a
/// `pass:` passphrase directive is replaced wholesale by a placeholder.
pub fn redact_command(command: &[String]) -> Vec<String> {
    command
        .iter()
        .map(|arg| {
            if arg.contains("pass:") {
                REDACTED_PASSWORD.to_string()
            } else {
                arg.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_redaction_hides_passphrase() {
        let command = args(&["openssl", "genrsa", "-passout", "pass:secret", "2048"]);
        let redacted = redact_command(&command);

        assert!(!redacted.join(",").contains("secret"));
        assert_eq!(redacted[3], REDACTED_PASSWORD);
    }

    #[test]
    fn test_redaction_keeps_other_arguments() {
        let command = args(&["openssl", "req", "-new", "-passin", "pass:secret"]);
        let redacted = redact_command(&command);

        assert_eq!(&redacted[..4], &command[..4]);
    }

    #[test]
    fn test_file_directives_are_not_redacted() {
        let command = args(&["openssl", "genrsa", "-passout", "file:/tmp/pw.txt"]);
        let redacted = redact_command(&command);

        assert_eq!(redacted, command);
    }

    #[test]
    fn test_runner_reports_exit_status() {
        let runner = OpenSslRunner;
        assert!(runner.run(&args(&["true"])));
        assert!(!runner.run(&args(&["false"])));
    }

    #[test]
    fn test_runner_survives_missing_binary() {
        let runner = OpenSslRunner;
        assert!(!runner.run(&args(&["/nonexistent/certsmith-no-such-binary"])));
    }

    #[test]
    fn test_runner_rejects_empty_command() {
        let runner = OpenSslRunner;
        assert!(!runner.run(&[]));
    }
}
