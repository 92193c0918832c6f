use std::fs::File;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{ReconError, Result};
use crate::external::tools::ToolCommand;
use crate::output::atomic;

/// Spawn a tool and wait for it to exit.
///
/// stdout/stderr are inherited so the operator sees progress live. With
/// `capture_stdout`, stdout goes to a temp sibling of the output file that is renamed
/// into place only if the tool succeeds. The child is killed if this future is dropped
/// (e.g. on interrupt).
pub async fn run_tool(cmd: &ToolCommand) -> Result<()> {
    tracing::debug!(tool=%cmd.tool, program=%cmd.program.display(), args=?cmd.args, "launching external tool");

    let launch_err = |source| ReconError::ProcessLaunch {
        tool: cmd.tool.to_string(),
        program: cmd.program.display().to_string(),
        source,
    };

    let capture = match (&cmd.output, cmd.capture_stdout) {
        (Some(out), true) => Some((atomic::temp_sibling(out), out)),
        _ => None,
    };
    let stdout = match &capture {
        Some((tmp, _)) => Stdio::from(File::create(tmp).map_err(|e| ReconError::io(tmp, e))?),
        None => Stdio::inherit(),
    };

    let spawned = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn();
    let status = match spawned {
        Ok(mut child) => child.wait().await,
        Err(e) => Err(e),
    };

    match (status, capture) {
        (Ok(status), Some((tmp, out))) if status.success() => {
            std::fs::rename(&tmp, out).map_err(|e| ReconError::io(out, e))
        }
        (Ok(status), None) if status.success() => Ok(()),
        (result, capture) => {
            if let Some((tmp, _)) = capture {
                let _ = std::fs::remove_file(tmp);
            }
            match result {
                Ok(status) => Err(ReconError::ProcessExit { tool: cmd.tool.to_string(), status }),
                Err(e) => Err(launch_err(e)),
            }
        }
    }
}

/// Run a tool and log any failure instead of returning it. Returns whether it succeeded.
pub async fn run_tool_logged(cmd: &ToolCommand) -> bool {
    match run_tool(cmd).await {
        Ok(()) => {
            tracing::info!(tool=%cmd.tool, "tool finished");
            true
        }
        Err(e) => {
            tracing::warn!(tool=%cmd.tool, output=?cmd.output.as_ref().map(|p| p.display().to_string()), error=%e, "tool failed; continuing");
            false
        }
    }
}
