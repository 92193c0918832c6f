use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use directories::BaseDirs;

use crate::config::{Config, Tool};
use crate::error::{ReconError, Result};
use crate::external::template::{InvocationContext, TemplateKey};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d.%H.%M.%S";

/// Per-run state: target, resolvers and the result directory every stage writes into.
///
/// Created once before any stage runs and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub domain: String,
    pub resolvers_file: PathBuf,
    pub result_dir: PathBuf,
    pub tools_dir: PathBuf,
}

impl RunContext {
    /// Create `<recon>/<results>/<domain>-<timestamp>` and return the context for it.
    pub fn create(config: &Config, domain: &str, resolvers_file: &Path) -> Result<Self> {
        let parent = recon_base(config).join(&config.directories.results_dir);
        std::fs::create_dir_all(&parent).map_err(|e| ReconError::io(&parent, e))?;
        let name = run_dir_name(domain, Local::now());
        let result_dir = create_unique_dir(&parent, &name).map_err(|e| ReconError::io(parent.join(&name), e))?;
        tracing::info!(dir=%result_dir.display(), "created result directory");
        Ok(Self::new(domain, resolvers_file, result_dir, &config.directories.tools_dir))
    }

    /// Build a context around an existing directory.
    pub fn new(domain: &str, resolvers_file: &Path, result_dir: PathBuf, tools_dir: &Path) -> Self {
        Self {
            domain: domain.to_string(),
            resolvers_file: resolvers_file.to_path_buf(),
            result_dir,
            tools_dir: tools_dir.to_path_buf(),
        }
    }

    pub fn paths(&self) -> RunPaths {
        RunPaths { dir: self.result_dir.clone(), domain: self.domain.clone() }
    }

    /// Keys shared by every invocation of this run; stages add input/output files.
    pub fn invocation_context(&self) -> InvocationContext {
        InvocationContext::new()
            .with(TemplateKey::Domain, self.domain.as_str())
            .with(TemplateKey::ResolversFile, self.resolvers_file.display().to_string())
            .with(TemplateKey::OutputDir, self.result_dir.display().to_string())
            .with(TemplateKey::ToolsDir, self.tools_dir.display().to_string())
    }
}

/// Deterministic names of every artifact in a result directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    dir: PathBuf,
    domain: String,
}

impl RunPaths {
    /// `<tool>_<domain>.txt`
    pub fn tool_output(&self, tool: Tool) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", tool.name(), self.domain))
    }

    pub fn crt(&self) -> PathBuf {
        self.dir.join(format!("{}.crt.txt", self.domain))
    }

    pub fn subdomains(&self) -> PathBuf {
        self.dir.join(format!("{}.subdomains.txt", self.domain))
    }

    pub fn ips(&self) -> PathBuf {
        self.dir.join(format!("{}.ips.txt", self.domain))
    }

    pub fn sorted_httpx(&self) -> PathBuf {
        self.dir.join(format!("sorted_httpx_{}.txt", self.domain))
    }

    /// Discovery outputs followed by the certificate transparency file.
    pub fn merge_inputs(&self) -> Vec<PathBuf> {
        let mut inputs: Vec<PathBuf> = Tool::DISCOVERY.iter().map(|t| self.tool_output(*t)).collect();
        inputs.push(self.crt());
        inputs
    }
}

fn recon_base(config: &Config) -> PathBuf {
    if let Some(dir) = &config.directories.recon_dir {
        return dir.clone();
    }
    match BaseDirs::new() {
        Some(base) => base.home_dir().join("recon"),
        None => {
            tracing::warn!("could not determine home directory; using ./recon");
            PathBuf::from("recon")
        }
    }
}

pub fn run_dir_name(domain: &str, at: DateTime<Local>) -> String {
    format!("{}-{}", domain, at.format(TIMESTAMP_FORMAT))
}

/// Create `parent/name`, appending `-1`, `-2`, ... if it already exists.
fn create_unique_dir(parent: &Path, name: &str) -> io::Result<PathBuf> {
    let mut candidate = parent.join(name);
    let mut n = 0u32;
    loop {
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && n < 1000 => {
                n += 1;
                candidate = parent.join(format!("{}-{}", name, n));
            }
            Err(e) => return Err(e),
        }
    }
}
