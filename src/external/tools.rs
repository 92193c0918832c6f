use std::path::{Path, PathBuf};

use which::which;

use crate::config::{Config, ConfigError, Tool, ToolSpec};
use crate::external::template::{render_args, InvocationContext};

/// A fully rendered invocation: nothing left to substitute, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// File the tool is expected to write, used for logging and gating.
    pub output: Option<PathBuf>,
    /// Redirect stdout into `output`.
    pub capture_stdout: bool,
}

impl ToolCommand {
    pub fn build(
        tool: Tool,
        spec: &ToolSpec,
        ctx: &InvocationContext,
        tools_dir: &Path,
        output: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let args = render_args(tool.name(), &spec.args, ctx)?;
        Ok(Self {
            tool,
            program: resolve_executable(&spec.path, tools_dir),
            args,
            capture_stdout: spec.capture_stdout && output.is_some(),
            output,
        })
    }
}

/// Prefer `tools_dir/path`, then `path` on `PATH`, else `path` verbatim.
pub fn resolve_executable(path: &str, tools_dir: &Path) -> PathBuf {
    let bundled = tools_dir.join(path);
    if bundled.is_file() {
        return bundled;
    }
    which(path).unwrap_or_else(|_| PathBuf::from(path))
}

fn is_available(path: &str, tools_dir: &Path) -> bool {
    tools_dir.join(path).is_file() || which(path).is_ok()
}

/// Tools whose executable cannot be found. Each is logged; the run still proceeds.
pub fn preflight(config: &Config) -> Vec<Tool> {
    let tools_dir = &config.directories.tools_dir;
    let missing: Vec<Tool> = Tool::ALL
        .into_iter()
        .filter(|t| !is_available(&config.tool(*t).path, tools_dir))
        .collect();
    for tool in &missing {
        tracing::warn!(tool=%tool, path=%config.tool(*tool).path, tools_dir=%tools_dir.display(), "executable not found; its output will be missing");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::template::TemplateKey;

    #[test]
    fn test_bundled_tool_preferred() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("mytool");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        assert_eq!(resolve_executable("mytool", dir.path()), bin);
    }

    #[test]
    fn test_unknown_tool_kept_verbatim() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            resolve_executable("no-such-tool-4a1f", dir.path()),
            PathBuf::from("no-such-tool-4a1f")
        );
    }

    #[test]
    fn test_build_renders_args() {
        let spec = ToolSpec {
            path: "no-such-tool-4a1f".to_string(),
            args: vec!["-d".into(), "{domain}".into(), "-o".into(), "{outputFile}".into()],
            capture_stdout: true,
        };
        let ctx = InvocationContext::new()
            .with(TemplateKey::Domain, "example.com")
            .with(TemplateKey::OutputFile, "/r/subfinder_example.com.txt");
        let cmd = ToolCommand::build(Tool::Subfinder, &spec, &ctx, Path::new("tools"), None).unwrap();
        assert_eq!(cmd.args, vec!["-d", "example.com", "-o", "/r/subfinder_example.com.txt"]);
        assert_eq!(cmd.program, PathBuf::from("no-such-tool-4a1f"));
        // nothing to capture into without an output file
        assert!(!cmd.capture_stdout);
    }

    #[test]
    fn test_build_fails_on_unresolved_token() {
        let spec = ToolSpec { path: "amass".to_string(), args: vec!["{inputFile}".into()], capture_stdout: false };
        let ctx = InvocationContext::new().with(TemplateKey::Domain, "example.com");
        assert!(ToolCommand::build(Tool::Amass, &spec, &ctx, Path::new("tools"), None).is_err());
    }
}
