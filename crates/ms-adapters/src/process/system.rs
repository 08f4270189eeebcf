//! Runs real programs with `std::process`.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use ms_core::{
    application::{
        ApplicationError,
        ports::{CommandOutput, CommandRunner, CommandSpec, CommandStatus},
    },
    error::{MsError, MsResult},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Production runner. Captured commands get a null stdin so a tool that
/// unexpectedly prompts fails instead of hanging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(spec.env.iter().map(|(k, v)| (k, v)));
        cmd
    }

    fn wait_with_deadline(
        spec: &CommandSpec,
        cmd: &mut Command,
        timeout: Duration,
    ) -> MsResult<CommandOutput> {
        let mut child = cmd.spawn().map_err(|e| spawn_error(spec, e))?;

        // Drain both pipes concurrently so a chatty child cannot block on a
        // full pipe while we poll.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = thread::spawn(move || drain(stdout));
        let err_reader = thread::spawn(move || drain(stderr));

        let deadline = Instant::now() + timeout;
        let status: ExitStatus = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!(command = %spec, secs = timeout.as_secs(), "Command timed out");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ApplicationError::CommandTimeout {
                        command: spec.display(),
                        secs: timeout.as_secs(),
                    }
                    .into());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(spawn_error(spec, e)),
            }
        };

        Ok(CommandOutput {
            status: status.code(),
            stdout: out_reader.join().unwrap_or_default(),
            stderr: err_reader.join().unwrap_or_default(),
        })
    }
}

impl CommandRunner for SystemRunner {
    fn capture(&self, spec: &CommandSpec) -> MsResult<CommandOutput> {
        trace!(command = %spec, cwd = ?spec.cwd, "capture");
        let mut cmd = Self::command(spec);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match spec.timeout {
            Some(timeout) => Self::wait_with_deadline(spec, &mut cmd, timeout)?,
            None => {
                let out = cmd.output().map_err(|e| spawn_error(spec, e))?;
                CommandOutput {
                    status: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                }
            }
        };
        debug!(command = %spec, status = ?output.status, "Command finished");
        Ok(output)
    }

    fn stream(&self, spec: &CommandSpec) -> MsResult<CommandStatus> {
        trace!(command = %spec, cwd = ?spec.cwd, "stream");
        let status = Self::command(spec)
            .status()
            .map_err(|e| spawn_error(spec, e))?;
        debug!(command = %spec, status = ?status.code(), "Command finished");
        Ok(CommandStatus(status.code()))
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn spawn_error(spec: &CommandSpec, e: io::Error) -> MsError {
    if e.kind() == io::ErrorKind::NotFound {
        ApplicationError::ToolNotFound {
            tool: spec.program.clone(),
            hint: "Make sure it is installed and on your PATH.".into(),
        }
        .into()
    } else {
        ApplicationError::Spawn {
            command: spec.display(),
            reason: e.to_string(),
        }
        .into()
    }
}
