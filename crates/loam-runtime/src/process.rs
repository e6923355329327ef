//! Helpers for driving platform CLIs (`kubectl`, `docker`) as subprocesses.

use crate::RuntimeError;
use std::io::{Read, Write};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use tracing::trace;

/// Readable log stream handed back to callers of `ComponentAdapter::log`.
pub type LogStream = Box<dyn Read + Send>;

pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:@,".contains(&b))
    {
        return s.to_owned();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Run to completion, capturing output. Non-zero exit is an error carrying stderr.
pub fn run_captured(cmd: &mut Command) -> Result<String, RuntimeError> {
    let description = describe(cmd);
    trace!("running {description}");
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| RuntimeError::ExecFailed(format!("{description}: {e}")))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(RuntimeError::CommandFailed {
            command: description,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Run to completion; with `show` the child's output goes straight to the terminal.
pub fn run_shown(cmd: &mut Command, show: bool) -> Result<(), RuntimeError> {
    if !show {
        return run_captured(cmd).map(|_| ());
    }
    let description = describe(cmd);
    trace!("running {description}");
    let status = cmd
        .stdin(Stdio::null())
        .status()
        .map_err(|e| RuntimeError::ExecFailed(format!("{description}: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(RuntimeError::CommandFailed {
            command: description,
            code: status.code(),
            stderr: String::new(),
        })
    }
}

/// Run to completion feeding `input` on stdin.
pub fn run_with_input(cmd: &mut Command, input: &[u8]) -> Result<(), RuntimeError> {
    let description = describe(cmd);
    trace!("running {description} with {} bytes on stdin", input.len());
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RuntimeError::ExecFailed(format!("{description}: {e}")))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input)?;
    }
    let output = child.wait_with_output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(RuntimeError::CommandFailed {
            command: description,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Whether `program` can be spawned with the given probe arguments.
pub fn probe(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Stdout of a running child.
///
/// At end of stream the child is reaped, and a non-zero exit surfaces as a
/// read error carrying the command's stderr. Dropping the stream early
/// kills the child.
pub struct ChildStream {
    description: String,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl ChildStream {
    pub fn spawn(cmd: &mut Command) -> Result<Self, RuntimeError> {
        let description = describe(cmd);
        trace!("streaming {description}");
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RuntimeError::ExecFailed(format!("{description}: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::ExecFailed(format!("{description}: no stdout")))?;
        // Drained on its own thread so a chatty stderr cannot stall stdout.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });
        Ok(Self {
            description,
            child,
            stdout,
            stderr,
            finished: false,
        })
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if status.success() {
            return Ok(());
        }
        let failure = RuntimeError::CommandFailed {
            command: self.description.clone(),
            code: status.code(),
            stderr: stderr.trim().to_owned(),
        };
        Err(std::io::Error::other(failure.to_string()))
    }
}

impl Read for ChildStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finish()?;
        }
        Ok(n)
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
