//! The sandbox request/response file contract, and a `LocalRunner` stand-in
//! used when no sandbox is configured.
//!
//! `LocalRunner` shells out to a host C++ compiler directly. It is not a
//! substitute for a hardened sandbox: it has none of the sandbox's process
//! isolation, and exists only so the driver is runnable during local
//! development, mirroring the reference implementation's explicitly-gated
//! in-process fallback.

use graphc_core::{Catalog, Ir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Written by the driver, read by the sandbox.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxRequest {
    pub ir: Ir,
    pub node_defs: Catalog,
    pub timeout: u64,
}

/// Written by the sandbox, read by the driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The outcome of a compile+run cycle, independent of which `Runner`
/// produced it.
pub enum RunOutcome {
    Success { stdout: String, stderr: String },
    CompileFailure { stderr: String },
    Timeout,
}

/// Something that can turn emitted C++ into a compile+run result: the host
/// compiler directly, or a hardened external sandbox via the request/
/// response file contract.
pub trait Runner {
    fn run(&self, ir: &Ir, catalog: &Catalog, cpp_path: &Path, timeout: Duration) -> anyhow::Result<RunOutcome>;
}

/// Compiles with a host C++ compiler and runs the resulting binary
/// in-process, bounding the run phase with a blocking wait-with-timeout.
pub struct LocalRunner {
    pub compiler: String,
}

impl Default for LocalRunner {
    fn default() -> Self {
        LocalRunner {
            compiler: "c++".to_string(),
        }
    }
}

impl Runner for LocalRunner {
    fn run(&self, _ir: &Ir, _catalog: &Catalog, cpp_path: &Path, timeout: Duration) -> anyhow::Result<RunOutcome> {
        let binary_path = cpp_path.with_extension("out");
        let compile = Command::new(&self.compiler)
            .arg(cpp_path)
            .arg("-o")
            .arg(&binary_path)
            .arg("-std=c++17")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !compile.status.success() {
            return Ok(RunOutcome::CompileFailure {
                stderr: String::from_utf8_lossy(&compile.stderr).to_string(),
            });
        }

        let mut child = Command::new(&binary_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                let output = child.wait_with_output()?;
                let _ = status;
                return Ok(RunOutcome::Success {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                });
            }
            if start.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(RunOutcome::Timeout);
            }
            std::thread::sleep(Duration::from_millis(25));
        }
    }
}

/// Hands a compile+run job to an external sandbox process by writing
/// `input.json` into a shared directory and polling for `output.json`.
pub struct SandboxRunner {
    pub dir: PathBuf,
    pub poll_interval: Duration,
}

impl SandboxRunner {
    pub fn new(dir: PathBuf) -> Self {
        SandboxRunner {
            dir,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Runner for SandboxRunner {
    fn run(&self, ir: &Ir, catalog: &Catalog, _cpp_path: &Path, timeout: Duration) -> anyhow::Result<RunOutcome> {
        let request = SandboxRequest {
            ir: ir.clone(),
            node_defs: catalog.clone(),
            timeout: timeout.as_secs(),
        };
        fs::write(self.dir.join("input.json"), serde_json::to_vec_pretty(&request)?)?;

        let response_path = self.dir.join("output.json");
        let start = Instant::now();
        loop {
            if response_path.exists() {
                let raw = fs::read_to_string(&response_path)?;
                let response: SandboxResponse = serde_json::from_str(&raw)?;
                return Ok(outcome_from_response(response));
            }
            if start.elapsed() >= timeout {
                return Ok(RunOutcome::Timeout);
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

fn outcome_from_response(response: SandboxResponse) -> RunOutcome {
    if response.success {
        return RunOutcome::Success {
            stdout: response.stdout.unwrap_or_default(),
            stderr: response.stderr.unwrap_or_default(),
        };
    }
    match response.error.as_deref() {
        Some("timeout") => RunOutcome::Timeout,
        _ => RunOutcome::CompileFailure {
            stderr: response.message.or(response.stderr).unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_request_round_trips_through_json() {
        let request = SandboxRequest {
            ir: Ir::default(),
            node_defs: Catalog::new(),
            timeout: 5,
        };
        let raw = serde_json::to_string(&request).unwrap();
        let back: SandboxRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.timeout, 5);
        assert!(back.ir.nodes.is_empty());
    }

    #[test]
    fn timeout_response_maps_to_timeout_outcome() {
        let response = SandboxResponse {
            success: false,
            stdout: None,
            stderr: None,
            error: Some("timeout".to_string()),
            message: None,
        };
        assert!(matches!(outcome_from_response(response), RunOutcome::Timeout));
    }

    #[test]
    fn success_response_carries_stdout() {
        let response = SandboxResponse {
            success: true,
            stdout: Some("7\n".to_string()),
            stderr: Some(String::new()),
            error: None,
            message: None,
        };
        match outcome_from_response(response) {
            RunOutcome::Success { stdout, .. } => assert_eq!(stdout, "7\n"),
            _ => panic!("expected success"),
        }
    }
}
