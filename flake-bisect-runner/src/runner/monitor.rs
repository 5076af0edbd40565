// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{MarkerClassifier, ProgressRequest, RunResult, UnitClassifier};
use crate::{
    config::ProgressConfig, errors::RunError, reporter::ProgressSink,
    test_command::TestInvocation,
};
use nix::{
    errno::Errno,
    fcntl::{FcntlArg, OFlag, fcntl},
    poll::{PollFd, PollFlags, PollTimeout, poll},
    pty::openpty,
};
use std::{
    fs::File,
    io::{self, Read},
    os::fd::AsFd,
    process::{Child, ExitStatus, Stdio},
    time::{Duration, Instant},
};
use tracing::{debug, trace};

/// How often a snapshot is sent to the sink even if nothing was counted.
const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for output before checking on the child and the update interval.
const POLL_TIMEOUT_MS: u8 = 50;

/// Runs the test runner with its output connected to a pseudo-terminal, counting finished units
/// as they are printed.
///
/// Running under a terminal makes the runner emit progress as it goes instead of buffering it.
/// The whole output is still collected and returned once the run finishes.
pub struct StreamingProgressMonitor<'a> {
    classifier: MarkerClassifier,
    request: ProgressRequest,
    sink: &'a mut dyn ProgressSink,
    completed: usize,
    last_update: Option<Instant>,
}

impl<'a> StreamingProgressMonitor<'a> {
    /// Creates a new monitor reporting to `sink`.
    pub fn new(
        config: &ProgressConfig,
        request: ProgressRequest,
        sink: &'a mut dyn ProgressSink,
    ) -> Self {
        Self {
            classifier: MarkerClassifier::new(
                request.kind,
                config.markers,
                config.file_pattern.clone(),
            ),
            request,
            sink,
            completed: 0,
            last_update: None,
        }
    }

    /// Runs `invocation` to completion.
    ///
    /// The sink is finished before this returns, whether or not the run succeeded.
    pub fn run(mut self, invocation: &TestInvocation) -> Result<RunResult, RunError> {
        let res = self.run_inner(invocation);
        self.sink.finish();
        res
    }

    fn run_inner(&mut self, invocation: &TestInvocation) -> Result<RunResult, RunError> {
        let command = invocation.display();
        let pty_error = |error: io::Error| RunError::PtySetup {
            command: command.clone(),
            error,
        };

        let pty = openpty(None, None).map_err(|errno| pty_error(errno.into()))?;
        fcntl(&pty.master, FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .map_err(|errno| pty_error(errno.into()))?;
        let mut master = File::from(pty.master);
        let stdout = pty.slave.try_clone().map_err(pty_error)?;

        let mut child = {
            let mut cmd = invocation.to_command();
            cmd.stdin(Stdio::null())
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(pty.slave));
            // Dropping the command closes the parent's copies of the slave, so that reads from
            // the master fail with EIO once the child and its descendants are gone.
            cmd.spawn().map_err(|error| RunError::Spawn {
                command: command.clone(),
                error,
            })?
        };

        let mut output = Vec::new();
        let read_res = self.read_until_closed(&mut master, &mut child, &mut output);

        // Always reap the child, even if reading failed.
        let status = reap(&mut child, master).map_err(|error| RunError::Wait {
            command: command.clone(),
            error,
        })?;
        read_res.map_err(|error| RunError::Read {
            command: command.clone(),
            error,
        })?;

        debug!(
            "`{command}` exited with {status}, {} {} counted",
            self.completed, self.request.kind
        );
        Ok(RunResult {
            success: status.success(),
            output: String::from_utf8_lossy(&output).into_owned(),
            command,
        })
    }

    fn read_until_closed(
        &mut self,
        master: &mut File,
        child: &mut Child,
        output: &mut Vec<u8>,
    ) -> io::Result<()> {
        let mut buf = [0u8; 4096];
        self.send_snapshot();

        loop {
            if self
                .last_update
                .is_none_or(|last| last.elapsed() >= UPDATE_INTERVAL)
            {
                self.send_snapshot();
            }

            let ready = {
                let mut fds = [PollFd::new(master.as_fd(), PollFlags::POLLIN)];
                poll(&mut fds, PollTimeout::from(POLL_TIMEOUT_MS))
            };
            match ready {
                Ok(0) => {
                    // Nothing to read. If the child has exited, a descendant may still be holding
                    // the terminal open, so don't wait for it.
                    if child.try_wait()?.is_some() {
                        trace!("child exited with no further output");
                        return Ok(());
                    }
                    continue;
                }
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }

            match master.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => {
                    output.extend_from_slice(&buf[..n]);
                    for &byte in &buf[..n] {
                        self.observe(byte);
                    }
                }
                // Linux reports EIO once the slave side has been closed.
                Err(error) if error.raw_os_error() == Some(Errno::EIO as i32) => return Ok(()),
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(error) => return Err(error),
            }
        }
    }

    fn observe(&mut self, byte: u8) {
        if self.classifier.feed(byte).is_some() {
            self.completed += 1;
            self.send_snapshot();
        }
    }

    fn send_snapshot(&mut self) {
        self.sink.snapshot(self.request.snapshot(self.completed));
        self.last_update = Some(Instant::now());
    }
}

/// Closes the master side of the terminal, then waits for `child` to exit.
///
/// A child blocked writing to a terminal nobody reads from would otherwise never exit. Once the
/// master is closed, its writes fail instead.
fn reap(child: &mut Child, master: File) -> io::Result<ExitStatus> {
    drop(master);
    child.wait()
}
