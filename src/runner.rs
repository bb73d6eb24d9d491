use std::{
    fmt,
    io::{self, BufRead, BufReader, Read, Write},
    process::{Command, Stdio},
    thread,
};

use tracing::{debug, info, trace, warn};

use crate::{error::InstallerError, progress::OutputSink};

// ── Command lines ─────────────────────────────────────────────────────────────

/// A program and its already-split arguments, plus optional stdin.
///
/// Arguments are never joined into a shell string; paths and usernames reach
/// the child exactly as given.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    input: Option<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Text written to the child's stdin. Never displayed or logged.
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn stdin(&self) -> Option<&str> {
        self.input.as_deref()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_words::quote(arg))?;
        }
        if self.input.is_some() {
            f.write_str(" <<< ***")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandLine({})", self)
    }
}

/// Splits operator-supplied free text the way a POSIX shell would.
/// Only for values that arrive as one string, such as `--packages`.
pub fn split_words(text: &str) -> Result<Vec<String>, InstallerError> {
    shell_words::split(text)
        .map_err(|e| InstallerError::InvalidConfig(format!("cannot split {:?}: {}", text, e)))
}

// ── Executors ─────────────────────────────────────────────────────────────────

/// How stages get their commands run.
pub trait Executor: Send + Sync {
    fn execute(&self, command: &CommandLine, output: &OutputSink) -> Result<(), InstallerError>;
}

/// Spawns real processes through [`run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, command: &CommandLine, output: &OutputSink) -> Result<(), InstallerError> {
        run(command, output)
    }
}

/// Announces each command instead of running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

impl Executor for DryRunExecutor {
    fn execute(&self, command: &CommandLine, output: &OutputSink) -> Result<(), InstallerError> {
        info!(%command, "dry-run");
        output.send(format!("[dry-run] $ {}", command));
        Ok(())
    }
}

// ── Process runner ────────────────────────────────────────────────────────────

fn not_found_or_io(program: &str, err: io::Error) -> InstallerError {
    if err.kind() == io::ErrorKind::NotFound {
        InstallerError::CommandNotFound(program.to_string())
    } else {
        InstallerError::Launch {
            program: program.to_string(),
            source: err,
        }
    }
}

fn missing_pipe(program: &str, stream: &str) -> InstallerError {
    InstallerError::Launch {
        program: program.to_string(),
        source: io::Error::new(io::ErrorKind::BrokenPipe, format!("no {} pipe", stream)),
    }
}

/// Forwards every line of `stream` until EOF.
///
/// Invalid UTF-8 is replaced rather than ending the relay, so the child can
/// never block on a pipe nobody reads.
fn relay(stream: impl Read, output: &OutputSink) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                trace!("{}", line);
                output.send(line);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "stopped relaying output");
                break;
            }
        }
    }
}

/// Runs one command to completion, relaying stdout and stderr line by line.
///
/// Both streams are drained on their own threads while this thread waits on
/// the child; all relayed lines are sent before this returns.
pub fn run(command: &CommandLine, output: &OutputSink) -> Result<(), InstallerError> {
    let program = command.program();
    debug!(%command, "running");

    let mut child = Command::new(program)
        .args(command.arguments())
        .stdin(if command.stdin().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found_or_io(program, e))?;

    let pipes = (child.stdout.take(), child.stderr.take());
    let (Some(stdout), Some(stderr)) = pipes else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(missing_pipe(program, "output"));
    };
    let stdin = match (command.stdin(), child.stdin.take()) {
        (Some(text), Some(pipe)) => Some((text, pipe)),
        (Some(_), None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(missing_pipe(program, "stdin"));
        }
        (None, _) => None,
    };

    let (status, fed) = thread::scope(|s| {
        s.spawn(|| relay(stdout, output));
        s.spawn(|| relay(stderr, output));
        let feeder = stdin.map(|(text, mut pipe)| {
            // Dropping the pipe closes the child's stdin.
            s.spawn(move || pipe.write_all(text.as_bytes()))
        });

        let status = child.wait();
        let fed = match feeder {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
            }),
            None => Ok(()),
        };
        (status, fed)
    });

    let status = status.map_err(|e| InstallerError::Interrupted {
        program: program.to_string(),
        source: e,
    })?;

    if !status.success() {
        return Err(InstallerError::Execution {
            command: command.to_string(),
            code: status.code().unwrap_or(-1),
        });
    }

    // A child that exits cleanly without reading its input is its own business.
    if let Err(e) = fed {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(InstallerError::Launch {
                program: program.to_string(),
                source: e,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::progress::{self, ChannelOptions};

    fn sink() -> (crate::progress::ProgressSender, crate::progress::ProgressReceiver) {
        progress::channel(ChannelOptions {
            output_capacity: 1024,
            ..ChannelOptions::default()
        })
    }

    #[test]
    fn relays_both_streams_in_stream_order() {
        let (tx, rx) = sink();
        let cmd = CommandLine::new("sh")
            .arg("-c")
            .arg("echo out1; echo err1 >&2; echo out2; echo err2 >&2");
        run(&cmd, tx.output()).unwrap();
        drop(tx);

        let lines: Vec<String> = rx.output.try_iter().collect();
        let out: Vec<_> = lines.iter().filter(|l| l.starts_with("out")).collect();
        let err: Vec<_> = lines.iter().filter(|l| l.starts_with("err")).collect();
        assert_eq!(out, ["out1", "out2"]);
        assert_eq!(err, ["err1", "err2"]);
    }

    #[test]
    fn large_stderr_does_not_deadlock() {
        let (tx, rx) = progress::channel(ChannelOptions::default());
        let consumer = std::thread::spawn(move || rx.output.iter().count());

        let cmd = CommandLine::new("sh")
            .arg("-c")
            .arg("i=0; while [ $i -lt 5000 ]; do echo line-$i >&2; i=$((i+1)); done");
        run(&cmd, tx.output()).unwrap();
        drop(tx);

        assert_eq!(consumer.join().unwrap(), 5000);
    }

    #[test]
    fn nonzero_exit_is_an_execution_error() {
        let (tx, _rx) = sink();
        let err = run(&CommandLine::new("sh").args(["-c", "exit 3"]), tx.output()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(matches!(err, InstallerError::Execution { code: 3, .. }));
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let (tx, _rx) = sink();
        let err = run(&CommandLine::new("definitely-not-a-real-binary-xyz"), tx.output())
            .unwrap_err();
        assert!(matches!(err, InstallerError::CommandNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Launch);
    }

    #[test]
    fn feeds_stdin() {
        let (tx, rx) = sink();
        let cmd = CommandLine::new("cat").input("alice:secret\n");
        run(&cmd, tx.output()).unwrap();
        drop(tx);
        assert_eq!(rx.output.try_iter().collect::<Vec<_>>(), ["alice:secret"]);
    }

    #[test]
    fn display_quotes_and_hides_input() {
        let cmd = CommandLine::new("useradd")
            .args(["-c", "Alice Liddell", "alice"])
            .input("alice:secret");
        let shown = cmd.to_string();
        assert_eq!(shown, "useradd -c 'Alice Liddell' alice <<< ***");
        assert!(!format!("{:?}", cmd).contains("secret"));
    }

    #[test]
    fn split_words_honours_quotes() {
        assert_eq!(
            split_words("base-system 'grub-x86_64-efi' \"linux firmware\"").unwrap(),
            ["base-system", "grub-x86_64-efi", "linux firmware"]
        );
        assert!(split_words("unterminated 'quote").is_err());
    }
}
