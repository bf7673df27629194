//! Tokio-backed command runner.
//!
//! Each command runs in its own process group. Until the child has been
//! waited on, a `ProcessGroupGuard` owns that group: a timeout or a dropped
//! future takes down the whole tree a shell may have spawned, not just the
//! shell.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::ports::{CommandOutcome, CommandRequest, CommandRunner, CommandStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, request: &CommandRequest) -> CommandOutcome {
        let started = Instant::now();
        let command_line = request.display();

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&request.working_dir)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(command = %command_line, "program not found");
                return CommandOutcome::new(CommandStatus::NotFound);
            }
            Err(e) => {
                warn!(command = %command_line, error = %e, "failed to spawn command");
                return CommandOutcome::new(CommandStatus::SpawnFailed(e.to_string()));
            }
        };

        let mut group = ProcessGroupGuard::new(child.id());

        if let (Some(input), Some(mut stdin)) = (request.stdin.clone(), child.stdin.take()) {
            // Written from a separate task so a child that never reads its
            // stdin cannot stall the wait below.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %e, "child closed stdin early");
                }
            });
        }

        let waited = tokio::time::timeout(request.timeout, child.wait_with_output()).await;
        let elapsed = started.elapsed();

        let output = match waited {
            Ok(Ok(output)) => {
                group.disarm();
                output
            }
            Ok(Err(e)) => {
                warn!(command = %command_line, error = %e, "failed to wait for command");
                return CommandOutcome {
                    elapsed,
                    ..CommandOutcome::new(CommandStatus::SpawnFailed(e.to_string()))
                };
            }
            Err(_) => {
                drop(group);
                warn!(
                    command = %command_line,
                    timeout_secs = request.timeout.as_secs_f64(),
                    "command timed out"
                );
                return CommandOutcome {
                    elapsed,
                    ..CommandOutcome::new(CommandStatus::TimedOut)
                };
            }
        };

        let status = output
            .status
            .code()
            .map_or(CommandStatus::Terminated, CommandStatus::Exited);
        debug!(
            command = %command_line,
            status = ?status,
            elapsed_ms = elapsed.as_millis() as u64,
            "command finished"
        );

        CommandOutcome {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed,
        }
    }
}

/// SIGKILLs the child's process group when dropped, unless disarmed.
///
/// Armed from spawn until the wait completes, so the timeout branch and a
/// caller dropping the `run` future share the same cleanup. The leader itself
/// is also covered by `kill_on_drop`.
struct ProcessGroupGuard {
    pgid: Option<i32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|p| i32::try_from(p).ok()),
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: i32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        // ESRCH: the group already exited.
        debug!(pgid, error = %e, "killpg on command cleanup");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: i32) {}
