use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;

use crate::error::ProcessError;

/// Abstraction over external process execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` to completion and capture stdout.
    ///
    /// A non-zero exit status is a [`ProcessError::CommandFailed`] carrying
    /// the collected stderr.
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<String, ProcessError>;

    /// Kill every running child and refuse new ones.
    fn terminate(&self) -> TerminationResult;
}

/// Outcome of [`CommandExecutor::terminate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminationResult {
    /// Number of processes that were running when termination was requested
    pub signalled: usize,
}

/// Spawns real child processes.
pub struct RealExecutor {
    verbose: bool,
    cancel: watch::Sender<bool>,
    active: Arc<AtomicUsize>,
}

impl RealExecutor {
    pub fn new(verbose: bool) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            verbose,
            cancel,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Keeps the running-process count accurate on every exit path.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(active))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CommandExecutor for RealExecutor {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<String, ProcessError> {
        let mut cancelled = self.cancel.subscribe();
        if *cancelled.borrow() {
            return Err(ProcessError::Terminated {
                program: program.to_owned(),
            });
        }

        tracing::debug!(program, ?args, "spawning");

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::NotFound {
                program: program.to_owned(),
                source: e,
            })?;
        let _guard = ActiveGuard::enter(&self.active);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let collect = async {
            tokio::join!(
                collect_lines(stdout, program, "stdout", self.verbose),
                collect_lines(stderr, program, "stderr", self.verbose),
            )
        };

        let waited = async {
            let (out, err) = collect.await;
            let status = child.wait().await;
            (status, out, err)
        };

        tokio::select! {
            (status, out, err) = waited => {
                let status = status.map_err(|e| ProcessError::Wait {
                    program: program.to_owned(),
                    source: e,
                })?;
                if status.success() {
                    Ok(out)
                } else {
                    tracing::debug!(program, %status, "process exited unsuccessfully");
                    let stderr = if err.trim().is_empty() {
                        format!("exited with {status}")
                    } else {
                        err
                    };
                    Err(ProcessError::CommandFailed {
                        program: program.to_owned(),
                        args: args.to_vec(),
                        stderr,
                    })
                }
            }
            _ = cancelled.wait_for(|terminated| *terminated) => {
                tracing::debug!(program, "terminating child process");
                Err(ProcessError::Terminated {
                    program: program.to_owned(),
                })
            }
        }
    }

    fn terminate(&self) -> TerminationResult {
        let signalled = self.active.load(Ordering::SeqCst);
        self.cancel.send_replace(true);
        tracing::info!(signalled, "terminating running processes");
        TerminationResult { signalled }
    }
}

async fn collect_lines<R>(
    reader: Option<R>,
    program: &str,
    stream: &'static str,
    verbose: bool,
) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };

    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if verbose {
                    tracing::debug!(program, stream, "{line}");
                }
                collected.push_str(&line);
                collected.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(program, stream, error = %e, "failed to read process output");
                break;
            }
        }
    }
    collected
}
