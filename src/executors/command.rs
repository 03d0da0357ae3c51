use crate::core::deadline::Deadline;
use crate::core::errors::{ExecError, ScanError};
use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

const STDERR_TAIL_LINES: usize = 10;

#[derive(Debug)]
pub struct CommandResult {
    pub lines: usize,
    pub exit_code: Option<i32>,
    pub duration_ms: u128,
    /// The run deadline killed the process; stdout seen so far was delivered.
    pub timed_out: bool,
}

/// Runs `tool`, handing every stdout line to `on_line` as it arrives.
///
/// A process that cannot be started is a setup error. A process that exits
/// non-zero is an execution error carrying the last stderr lines.
pub async fn stream<F>(
    tool: &str,
    args: &[String],
    deadline: Deadline,
    mut on_line: F,
) -> Result<CommandResult, ScanError>
where
    F: FnMut(&str),
{
    let start = Instant::now();

    tracing::debug!("Executing: {} {:?}", tool, args);

    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ScanError::Setup(format!("failed to start {}: {}", tool, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScanError::Setup(format!("{} has no stdout pipe", tool)))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ScanError::Setup(format!("{} has no stderr pipe", tool)))?;

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut lines = 0usize;

    let pump = async {
        let stdout_done = async {
            while let Ok(Some(line)) = out_lines.next_line().await {
                lines += 1;
                on_line(&line);
            }
        };
        let stderr_done = async {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = err_lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        };
        let ((), tail) = tokio::join!(stdout_done, stderr_done);
        (tail, child.wait().await)
    };

    let outcome = timeout(deadline.remaining(), pump).await;
    let duration_ms = start.elapsed().as_millis();

    let (tail, status) = match outcome {
        Ok(done) => done,
        Err(_) => {
            tracing::warn!("{} still running at the run deadline, killing it", tool);
            let _ = child.kill().await;
            return Ok(CommandResult {
                lines,
                exit_code: None,
                duration_ms,
                timed_out: true,
            });
        }
    };

    let exec_error = |exit_code: Option<i32>, stderr_tail: String| {
        ScanError::Exec(ExecError {
            tool: tool.to_string(),
            args: args.to_vec(),
            exit_code,
            stderr_tail,
            duration_ms,
        })
    };

    let status = status.map_err(|e| exec_error(None, format!("Process error: {}", e)))?;

    if !status.success() {
        let stderr_tail = tail.into_iter().collect::<Vec<_>>().join("\n");
        return Err(exec_error(status.code(), stderr_tail));
    }

    Ok(CommandResult {
        lines,
        exit_code: status.code(),
        duration_ms,
        timed_out: false,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn streams_lines_in_order() {
        let mut seen = Vec::new();
        let result = stream(
            "sh",
            &sh("echo one; echo two; echo three"),
            Deadline::after(Duration::from_secs(10)),
            |line| seen.push(line.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(seen, vec!["one", "two", "three"]);
        assert_eq!(result.lines, 3);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn missing_binary_is_setup_error() {
        let err = stream(
            "definitely-not-a-real-scanner-binary",
            &[],
            Deadline::after(Duration::from_secs(5)),
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(err.is_setup());
    }

    #[tokio::test]
    async fn non_zero_exit_keeps_stderr_tail() {
        let err = stream(
            "sh",
            &sh("echo partial; echo 'FAIL: need root' >&2; exit 3"),
            Deadline::after(Duration::from_secs(10)),
            |_| {},
        )
        .await
        .unwrap_err();
        match err {
            ScanError::Exec(e) => {
                assert_eq!(e.exit_code, Some(3));
                assert!(e.stderr_tail.contains("need root"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn deadline_kills_and_keeps_partial_output() {
        let mut seen = Vec::new();
        let result = stream(
            "sh",
            &sh("echo early; sleep 30"),
            Deadline::after(Duration::from_millis(500)),
            |line| seen.push(line.to_string()),
        )
        .await
        .unwrap();
        assert!(result.timed_out);
        assert_eq!(seen, vec!["early"]);
    }
}
