//! Runs the compiler through a `node` subprocess.
//!
//! The plugin is a JavaScript library, so each invocation spawns node with a
//! small embedded bridge script. The request travels as JSON on stdin and the
//! logger events come back as JSON on stdout. A crash inside node only fails the
//! one request.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use super::events::DiagnosticEvent;
use super::{CompileOutput, CompileRequest, CompilerBackend, CompilerError, EmitMode};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BridgeRequest<'a> {
    source: &'a str,
    filename: &'a str,
    plugin_path: &'a Path,
    workspace_root: Option<&'a Path>,
    mode: &'static str,
}

#[derive(Deserialize)]
struct BridgeResponse {
    ok: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    events: Vec<DiagnosticEvent>,
    #[serde(default)]
    message: Option<String>,
}

pub struct NodeBackend {
    node: PathBuf,
}

impl NodeBackend {
    pub fn new(node: impl Into<PathBuf>) -> Self {
        Self { node: node.into() }
    }
}

impl Default for NodeBackend {
    fn default() -> Self {
        Self::new("node")
    }
}

impl CompilerBackend for NodeBackend {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompilerError> {
        let _span = tracing::debug_span!("compiler.node", filename = %request.filename).entered();

        let payload = serde_json::to_vec(&BridgeRequest {
            source: request.source,
            filename: request.filename,
            plugin_path: request.plugin_path,
            workspace_root: request.workspace_root,
            mode: match request.mode {
                EmitMode::Diagnostics => "diagnostics",
                EmitMode::Emit => "emit",
            },
        })
        .map_err(|e| CompilerError::InvalidOutput {
            message: format!("Failed to encode compiler request: {e}"),
        })?;

        let mut command = Command::new(&self.node);
        command
            .arg("-e")
            .arg(BRIDGE_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(root) = request.workspace_root {
            command.current_dir(root);
        }

        let mut child = command.spawn().map_err(|e| CompilerError::Spawn {
            program: self.node.display().to_string(),
            message: e.to_string(),
        })?;

        // The bridge reads all of stdin before writing anything, so writing the
        // whole request up front cannot deadlock on a full stdout pipe.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).map_err(|e| CompilerError::Spawn {
                program: self.node.display().to_string(),
                message: format!("Failed to write request: {e}"),
            })?;
        }

        let output = child.wait_with_output().map_err(|e| CompilerError::Spawn {
            program: self.node.display().to_string(),
            message: e.to_string(),
        })?;

        if output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompilerError::Bridge {
                message: format!("node exited with {}: {}", output.status, stderr.trim()),
            });
        }

        parse_response(&output.stdout)
    }
}

fn parse_response(stdout: &[u8]) -> Result<CompileOutput, CompilerError> {
    let response: BridgeResponse = serde_json::from_slice(stdout).map_err(|e| CompilerError::InvalidOutput {
        message: format!("Could not parse compiler output: {e}"),
    })?;

    if response.ok {
        Ok(CompileOutput {
            code: response.code,
            events: response.events,
        })
    } else {
        Err(CompilerError::Bridge {
            message: response.message.unwrap_or_else(|| "Unknown compiler failure".to_string()),
        })
    }
}
