//! Vendor probing.
//!
//! A probe runs one external telemetry command per tick and normalizes its
//! text output into a [`Reading`]. Vendors are tried in a fixed order
//! (NVIDIA, then AMD); the first one that answers wins.

pub mod amd;
pub mod nvidia;

use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::models::Reading;

/// What a finished (or timed out) command left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
        }
    }

    pub fn failed(stdout: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
        }
    }
}

/// Process invocation boundary.
///
/// `Err` with [`io::ErrorKind::NotFound`] means the program is not installed;
/// the probe treats that as "vendor unavailable". Any other error is an
/// internal failure.
pub trait CommandRunner {
    fn run(&self, argv: &[&str], timeout: Duration) -> io::Result<CommandOutput>;
}

/// Runs commands with `std::process::Command`, killing the child once the
/// timeout expires.
///
/// Stdout is collected until the timeout (at least [`READ_GRACE`] after the
/// child is gone). A background process that inherited the pipe cannot hold
/// a tick past that; whatever arrived by then is returned.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

const POLL_STEP: Duration = Duration::from_millis(20);
pub const READ_GRACE: Duration = Duration::from_millis(100);

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str], timeout: Duration) -> io::Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argv"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not captured"))?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stdout.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
        });

        let started = Instant::now();
        let success = loop {
            if let Some(status) = child.try_wait()? {
                break status.success();
            }
            if started.elapsed() >= timeout {
                debug!(program, ?timeout, "command timed out, killing it");
                let _ = child.kill();
                let _ = child.wait();
                break false;
            }
            thread::sleep(POLL_STEP);
        };

        let deadline = Instant::now() + timeout.saturating_sub(started.elapsed()).max(READ_GRACE);
        let mut buf = Vec::new();
        loop {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    debug!(program, "stdout still open after exit, not waiting for it");
                    break;
                }
            }
        }

        Ok(CommandOutput {
            success,
            stdout: String::from_utf8_lossy(&buf).into_owned(),
        })
    }
}

/// Anything that can produce one reading per tick.
pub trait Probe {
    fn sample(&self) -> Reading;
}

/// Outcome of one vendor attempt.
enum Attempt {
    Found(Reading),
    Unavailable,
    Failed(io::Error),
}

/// Ordered fallback chain over the vendor command-line tools.
pub struct VendorProbe<R> {
    runner: R,
}

impl VendorProbe<SystemRunner> {
    pub fn system() -> Self {
        Self::new(SystemRunner)
    }
}

impl<R: CommandRunner> VendorProbe<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn try_nvidia(&self) -> Attempt {
        let output = match self.runner.run(&nvidia::QUERY_ARGV, nvidia::TIMEOUT) {
            Ok(output) => output,
            Err(e) => return classify(e),
        };
        if !output.success {
            debug!("nvidia-smi exited unsuccessfully");
            return Attempt::Unavailable;
        }
        match nvidia::parse(&output.stdout) {
            Some(reading) => Attempt::Found(reading),
            None => {
                debug!(stdout = %output.stdout.trim(), "nvidia-smi output not usable");
                Attempt::Unavailable
            }
        }
    }

    fn try_amd(&self) -> Attempt {
        let output = match self.runner.run(&amd::SAMPLE_ARGV, amd::TIMEOUT) {
            Ok(output) => output,
            Err(e) => return classify(e),
        };
        // radeontop may be cut off by the timeout after printing its frame.
        match amd::parse(&output.stdout) {
            Some(reading) => Attempt::Found(reading),
            None => {
                debug!("radeontop output matched no known field");
                Attempt::Unavailable
            }
        }
    }
}

fn classify(err: io::Error) -> Attempt {
    if err.kind() == io::ErrorKind::NotFound {
        Attempt::Unavailable
    } else {
        Attempt::Failed(err)
    }
}

impl<R: CommandRunner> Probe for VendorProbe<R> {
    fn sample(&self) -> Reading {
        let attempts: [fn(&Self) -> Attempt; 2] = [Self::try_nvidia, Self::try_amd];
        for attempt in attempts {
            match attempt(self) {
                Attempt::Found(reading) => return reading,
                Attempt::Unavailable => continue,
                Attempt::Failed(e) => {
                    warn!(error = %e, "GPU probe failed");
                    return Reading::error();
                }
            }
        }
        debug!("no GPU vendor tool answered");
        Reading::unknown()
    }
}

/// Parses a field as an integer, tolerating surrounding whitespace.
pub(crate) fn parse_int(field: &str) -> Option<i32> {
    field.trim().parse().ok()
}
