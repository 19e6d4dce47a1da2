//! External tool invocation.
//!
//! Every build tool this crate drives (`fakeroot`, `dpkg-deb`, `lintian`,
//! WiX `candle`/`light`, `hdiutil`) is executed through [`Invocation`]: one
//! place that logs the full command line, pipes optional stdin, forwards
//! captured output through the logger and turns a nonzero exit status into
//! an error. Tools are black boxes; nothing here interprets their output.

use std::io;
use std::path::PathBuf;
use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

/// One external program run.
///
/// # Examples
///
/// ```no_run
/// use packsmith::exec::Invocation;
///
/// # async fn demo() -> packsmith::error::Result<()> {
/// Invocation::new("dpkg-deb")
///     .arg("--build")
///     .arg("/tmp/staging")
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
    ignore_exit_code: bool,
}

impl Invocation {
    /// Starts building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            ignore_exit_code: false,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory of the child process.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Pipes the given bytes into the child's stdin.
    pub fn stdin_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    /// Treats a nonzero exit status as success.
    pub fn ignore_exit_code(mut self) -> Self {
        self.ignore_exit_code = true;
        self
    }

    /// The full command line, each token quoted, for logs and errors.
    pub fn command_line(&self) -> String {
        let mut line = String::new();
        for part in std::iter::once(&self.program).chain(self.args.iter()) {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push('"');
            line.push_str(part);
            // a trailing backslash would escape the closing quote
            if part.ends_with('\\') {
                line.push('\\');
            }
            line.push('"');
        }
        line
    }

    /// Runs the program to completion and returns its captured output.
    ///
    /// Fails with [`Error::CommandFailed`] when the program cannot be
    /// spawned and with [`Error::ToolExited`] on a nonzero exit status,
    /// unless [`ignore_exit_code`](Self::ignore_exit_code) was set.
    pub async fn run(self) -> Result<Output> {
        log::info!("running: {}", self.command_line());

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        if self.stdin.is_some() {
            command.stdin(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|error| Error::CommandFailed {
            command: self.command_line(),
            error,
        })?;

        // stdin is fed while the output pipes drain; feeding it to
        // completion first would deadlock once the child fills a pipe
        let stdin_pipe = child.stdin.take();
        let feed = async {
            if let (Some(mut pipe), Some(bytes)) = (stdin_pipe, &self.stdin) {
                match pipe.write_all(bytes).await {
                    // the child may exit without draining its input
                    Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                // the handle closes when it drops, releasing the child's read end
            }
            Ok(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|error| Error::CommandFailed {
            command: self.command_line(),
            error,
        })?;
        fed.map_err(|error: io::Error| Error::CommandFailed {
            command: self.command_line(),
            error,
        })?;

        forward_output(&output);

        if !output.status.success() && !self.ignore_exit_code {
            return Err(Error::ToolExited {
                command: self.command_line(),
                status: output.status,
            });
        }
        Ok(output)
    }
}

/// Forwards captured child output through the logger, indented.
fn forward_output(output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        log::info!("\t{line}");
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        log::warn!("\t{line}");
    }
}

/// Resolves a required external tool on `PATH`.
///
/// Used as a preflight check so a missing tool is reported before any
/// staging work happens.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::ToolchainNotFound(format!("{name} not found on PATH")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_every_token() {
        let invocation = Invocation::new("dpkg-deb")
            .arg("--build")
            .arg("/tmp/my staging");
        assert_eq!(
            invocation.command_line(),
            r#""dpkg-deb" "--build" "/tmp/my staging""#
        );
    }

    #[test]
    fn command_line_doubles_trailing_backslash() {
        let invocation = Invocation::new("candle.exe").arg("C:\\out\\");
        assert_eq!(invocation.command_line(), "\"candle.exe\" \"C:\\out\\\\\"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let err = Invocation::new("sh")
            .args(["-c", "exit 3"])
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolExited { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_can_be_ignored() {
        let output = Invocation::new("sh")
            .args(["-c", "exit 3"])
            .ignore_exit_code()
            .run()
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdin_reaches_the_child() {
        let output = Invocation::new("cat")
            .stdin_bytes("piped text")
            .run()
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "piped text");
    }

    // the child floods stdout past any pipe buffer before touching its
    // stdin, so the run only completes when both pipes move at once
    #[cfg(unix)]
    #[tokio::test]
    async fn stdin_is_fed_while_output_is_drained() {
        let run = Invocation::new("sh")
            .args([
                "-c",
                "dd if=/dev/zero bs=1024 count=256 2>/dev/null; cat >/dev/null",
            ])
            .stdin_bytes(vec![b'x'; 1024 * 1024])
            .run();

        let output = tokio::time::timeout(std::time::Duration::from_secs(10), run)
            .await
            .expect("invocation blocked on its own stdin")
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 256 * 1024);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn child_may_quit_without_draining_stdin() {
        let output = Invocation::new("sh")
            .args(["-c", "exit 0"])
            .stdin_bytes(vec![b'x'; 1024 * 1024])
            .run()
            .await
            .unwrap();
        assert!(output.status.success());
    }

    #[tokio::test]
    async fn unknown_program_fails_to_spawn() {
        let err = Invocation::new("packsmith-no-such-binary")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn require_tool_distinguishes_present_and_absent() {
        assert!(require_tool("packsmith-no-such-binary").is_err());
        #[cfg(unix)]
        assert!(require_tool("sh").is_ok());
    }
}
