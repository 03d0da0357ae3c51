use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecError {
    pub tool: String,
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub stderr_tail: String,
    pub duration_ms: u128,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} exited with {} after {}ms", self.tool, code, self.duration_ms)?,
            None => write!(f, "{} terminated after {}ms", self.tool, self.duration_ms)?,
        }
        if !self.stderr_tail.is_empty() {
            write!(f, ": {}", self.stderr_tail)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    /// Environment problem: missing binary, bad target syntax, unreadable input file.
    #[error("setup error: {0}")]
    Setup(String),

    #[error("execution failed: {0}")]
    Exec(ExecError),

    /// The engine itself broke, as opposed to a single port failing.
    #[error("discovery engine failure: {0}")]
    Discovery(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn is_setup(&self) -> bool {
        matches!(self, ScanError::Setup(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_error_display_includes_tail() {
        let err = ScanError::Exec(ExecError {
            tool: "masscan".into(),
            args: vec!["--rate".into(), "1000".into()],
            exit_code: Some(1),
            stderr_tail: "FAIL: permission denied".into(),
            duration_ms: 12,
        });
        let text = err.to_string();
        assert!(text.contains("masscan exited with 1"));
        assert!(text.contains("permission denied"));
        assert!(!err.is_setup());
    }
}
