//! Gnuplot subprocess renderer.

use std::io::Write;
use std::process::{Command, Stdio};

use super::Renderer;
use crate::error::{AppError, ErrorKind};

/// Runs `program` and feeds the script on stdin. Blocks until it exits.
#[derive(Debug, Clone)]
pub struct GnuplotRenderer {
    pub program: String,
    /// Keep the plot window open after gnuplot exits (on-screen output).
    pub persist: bool,
}

impl GnuplotRenderer {
    pub fn new(program: impl Into<String>, persist: bool) -> Self {
        Self {
            program: program.into(),
            persist,
        }
    }
}

impl Renderer for GnuplotRenderer {
    fn render(&self, script: &str) -> Result<(), AppError> {
        let mut cmd = Command::new(&self.program);
        if self.persist {
            cmd.arg("-persist");
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("Failed to start renderer '{}': {e}", self.program)))?;

        // The child is always waited on, even when the script could not be
        // sent, so it is reaped and its stderr is kept for the report.
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(script.as_bytes()),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| failure(format!("Renderer did not finish: {e}")))?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        match sent {
            Err(e) => Err(failure(format!(
                "Failed to send script to renderer '{}': {e} ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            ))),
            Ok(()) if output.status.success() => {
                log::info!("renderer '{}' finished", self.program);
                Ok(())
            }
            Ok(()) => Err(failure(format!(
                "Renderer '{}' failed ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            ))),
        }
    }
}

fn failure(message: String) -> AppError {
    AppError::new(ErrorKind::RendererFailure, message)
}
