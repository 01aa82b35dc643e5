//! Lookup tool execution.
//!
//! # Responsibilities
//! - Run the external tool once per request under a hard deadline
//! - Kill the process on timeout or cancellation
//! - Cap captured stdout and classify failures
//!
//! # Design Decisions
//! - No retries: a lookup is attempted exactly once
//! - The exit code only decides success vs failure
//! - Truncation is silent to the caller and logged here

use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

use crate::config::LookupConfig;
use crate::lookup::command::Invocation;
use crate::observability::metrics;
use crate::resilience::timeouts::{CallContext, Interrupted};

/// Why a tool run produced no usable output.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{tool} failed: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {status}: {stderr}")]
    Failed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{tool} failed: {status}")]
    Exited {
        tool: String,
        status: std::process::ExitStatus,
    },

    #[error("{tool} failed: timed out after {}ms", .elapsed.as_millis())]
    TimedOut { tool: String, elapsed: Duration },

    #[error("{tool} failed: request cancelled")]
    Cancelled { tool: String },
}

impl DispatchError {
    fn outcome(&self) -> &'static str {
        match self {
            DispatchError::Spawn { .. } => "spawn_error",
            DispatchError::Failed { .. } | DispatchError::Exited { .. } => "failed",
            DispatchError::TimedOut { .. } => "timeout",
            DispatchError::Cancelled { .. } => "cancelled",
        }
    }
}

/// Result of one tool run.
///
/// `command` is always populated so failures can be logged with what was
/// attempted.
#[derive(Debug)]
pub struct DispatchResult {
    pub output: Vec<u8>,
    pub command: String,
    pub error: Option<DispatchError>,
}

/// Runs the lookup tool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tool: String,
    timeout: Duration,
    max_output: usize,
}

impl Dispatcher {
    /// `max_output` of 0 disables the stdout cap.
    pub fn new(tool: impl Into<String>, timeout: Duration, max_output: usize) -> Self {
        Self {
            tool: tool.into(),
            timeout,
            max_output,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(
            config.tool.clone(),
            Duration::from_millis(config.timeout_ms),
            config.max_output_bytes,
        )
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `invocation` once. The effective deadline is the earlier of the
    /// context's and this dispatcher's own timeout.
    pub async fn dispatch(&self, ctx: &CallContext, invocation: &Invocation) -> DispatchResult {
        let start = Instant::now();
        let ctx = ctx.child_with_timeout(self.timeout);

        let result = self.run(&ctx, &invocation.args, start).await;
        metrics::record_dispatch(
            result.as_ref().err().map_or("success", DispatchError::outcome),
            start,
        );

        match result {
            Ok(output) => DispatchResult {
                output,
                command: invocation.display.clone(),
                error: None,
            },
            Err(error) => DispatchResult {
                output: Vec::new(),
                command: invocation.display.clone(),
                error: Some(error),
            },
        }
    }

    async fn run(
        &self,
        ctx: &CallContext,
        args: &[String],
        start: Instant,
    ) -> Result<Vec<u8>, DispatchError> {
        let child = Command::new(&self.tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| DispatchError::Spawn {
                tool: self.tool.clone(),
                source,
            })?,
            interrupted = ctx.interrupted() => {
                return Err(match interrupted {
                    Interrupted::DeadlineExceeded => DispatchError::TimedOut {
                        tool: self.tool.clone(),
                        elapsed: start.elapsed(),
                    },
                    Interrupted::Cancelled => DispatchError::Cancelled {
                        tool: self.tool.clone(),
                    },
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(if stderr.is_empty() {
                DispatchError::Exited {
                    tool: self.tool.clone(),
                    status: output.status,
                }
            } else {
                DispatchError::Failed {
                    tool: self.tool.clone(),
                    status: output.status,
                    stderr,
                }
            });
        }

        let mut stdout = output.stdout;
        if self.max_output > 0 && stdout.len() > self.max_output {
            tracing::debug!(
                captured = stdout.len(),
                limit = self.max_output,
                "Lookup output truncated"
            );
            stdout.truncate(self.max_output);
        }
        Ok(stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn invocation(args: &[&str]) -> Invocation {
        Invocation {
            args: args.iter().map(|a| a.to_string()).collect(),
            display: format!("test {}", args.join(" ")),
        }
    }

    fn ctx() -> CallContext {
        CallContext::with_timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_success_returns_stdout_and_command() {
        let dispatcher = Dispatcher::new("echo", Duration::from_secs(5), 1024);
        let result = dispatcher
            .dispatch(&ctx(), &invocation(&["@1.1.1.1", "example.com", "A"]))
            .await;

        assert!(result.error.is_none(), "{:?}", result.error);
        assert_eq!(result.output, b"@1.1.1.1 example.com A\n");
        assert_eq!(result.command, "test @1.1.1.1 example.com A");
    }

    #[tokio::test]
    async fn test_output_truncated_to_limit() {
        let dispatcher = Dispatcher::new("echo", Duration::from_secs(5), 10);
        let result = dispatcher.dispatch(&ctx(), &invocation(&["0123456789abcdef"])).await;

        assert!(result.error.is_none());
        assert_eq!(result.output, b"0123456789");
    }

    #[tokio::test]
    async fn test_output_at_limit_unchanged() {
        // "0123456789\n" is exactly 11 bytes.
        let dispatcher = Dispatcher::new("echo", Duration::from_secs(5), 11);
        let result = dispatcher.dispatch(&ctx(), &invocation(&["0123456789"])).await;
        assert_eq!(result.output, b"0123456789\n");
    }

    #[tokio::test]
    async fn test_zero_limit_disables_cap() {
        let dispatcher = Dispatcher::new("echo", Duration::from_secs(5), 0);
        let result = dispatcher.dispatch(&ctx(), &invocation(&["0123456789abcdef"])).await;
        assert_eq!(result.output.len(), 17);
    }

    #[tokio::test]
    async fn test_failure_includes_trimmed_stderr() {
        let dispatcher = Dispatcher::new("sh", Duration::from_secs(5), 1024);
        let result = dispatcher
            .dispatch(&ctx(), &invocation(&["-c", "echo '  no servers reachable  ' >&2; exit 9"]))
            .await;

        assert!(result.output.is_empty());
        assert_eq!(result.command, "test -c echo '  no servers reachable  ' >&2; exit 9");
        match result.error {
            Some(DispatchError::Failed { stderr, .. }) => assert_eq!(stderr, "no servers reachable"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_without_stderr_is_generic() {
        let dispatcher = Dispatcher::new("sh", Duration::from_secs(5), 1024);
        let result = dispatcher.dispatch(&ctx(), &invocation(&["-c", "exit 1"])).await;

        let err = result.error.expect("expected failure");
        assert!(matches!(err, DispatchError::Exited { .. }));
        assert!(err.to_string().starts_with("sh failed: "));
    }

    #[tokio::test]
    async fn test_missing_tool_is_spawn_error() {
        let dispatcher = Dispatcher::new("definitely-not-a-lookup-tool", Duration::from_secs(5), 1024);
        let result = dispatcher.dispatch(&ctx(), &invocation(&["@1.1.1.1"])).await;
        assert!(matches!(result.error, Some(DispatchError::Spawn { .. })));
        assert_eq!(result.command, "test @1.1.1.1");
    }

    #[tokio::test]
    async fn test_own_timeout_kills_process() {
        let dispatcher = Dispatcher::new("sh", Duration::from_millis(200), 1024);
        let started = std::time::Instant::now();
        let result = dispatcher.dispatch(&ctx(), &invocation(&["-c", "sleep 5"])).await;

        assert!(matches!(result.error, Some(DispatchError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_caller_deadline_wins_when_shorter() {
        let dispatcher = Dispatcher::new("sh", Duration::from_secs(30), 1024);
        let ctx = CallContext::with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let result = dispatcher.dispatch(&ctx, &invocation(&["-c", "sleep 5"])).await;

        assert!(matches!(result.error, Some(DispatchError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_run() {
        let dispatcher = Dispatcher::new("sh", Duration::from_secs(30), 1024);
        let ctx = ctx();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = dispatcher.dispatch(&ctx, &invocation(&["-c", "sleep 5"])).await;
        assert!(matches!(result.error, Some(DispatchError::Cancelled { .. })));
    }
}
