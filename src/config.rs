use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::external::template::{self, InvocationContext, TemplateKey};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "RECONBULK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_CRTSH_URL: &str = "https://crt.sh/?q=%25.{domain}&output=json";
/// crt.sh answers slowly for large domains; `0` disables the deadline.
pub const DEFAULT_CRTSH_TIMEOUT_SECS: u64 = 300;
/// printf-style placeholder used by older configs in place of `{domain}`.
const LEGACY_DOMAIN_PLACEHOLDER: &str = "%s";

/// Configuration loading and validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON config {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tool}: executable path is empty")]
    EmptyPath { tool: String },

    #[error("{tool}: unknown token {{{token}}} in template {template:?}")]
    UnknownToken { tool: String, template: String, token: String },

    #[error("{tool}: token {{{token}}} in template {template:?} has no value for this invocation")]
    UnresolvedToken { tool: String, template: String, token: String },

    #[error("crtsh: URL template {url:?} never references {{domain}}")]
    CrtshMissingDomain { url: String },

    #[error("crtsh: {url:?} is not a valid URL: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// External tools the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    Amass,
    Subfinder,
    Assetfinder,
    Findomain,
    Massdns,
    Httpx,
    Naabu,
    Nuclei,
}

impl Tool {
    /// The four enumerators run concurrently during discovery.
    pub const DISCOVERY: [Tool; 4] = [Tool::Amass, Tool::Subfinder, Tool::Assetfinder, Tool::Findomain];

    pub const ALL: [Tool; 8] = [
        Tool::Amass,
        Tool::Subfinder,
        Tool::Assetfinder,
        Tool::Findomain,
        Tool::Massdns,
        Tool::Httpx,
        Tool::Naabu,
        Tool::Nuclei,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Amass => "amass",
            Tool::Subfinder => "subfinder",
            Tool::Assetfinder => "assetfinder",
            Tool::Findomain => "findomain",
            Tool::Massdns => "massdns",
            Tool::Httpx => "httpx",
            Tool::Naabu => "naabu",
            Tool::Nuclei => "nuclei",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Executable path plus ordered argument templates for one tool.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Send the tool's stdout to its output file instead of the terminal, for tools
    /// that have no output flag.
    #[serde(default)]
    pub capture_stdout: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrtshSpec {
    /// Query URL; `{domain}` (or a legacy `%s`) is replaced by the encoded target.
    #[serde(default = "default_crtsh_url")]
    pub url: String,
    #[serde(default = "default_crtsh_timeout")]
    pub timeout_secs: u64,
}

impl Default for CrtshSpec {
    fn default() -> Self {
        Self { url: default_crtsh_url(), timeout_secs: default_crtsh_timeout() }
    }
}

impl CrtshSpec {
    /// Total request deadline, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// URL template in canonical token form.
    fn url_template(&self) -> String {
        self.url.replace(LEGACY_DOMAIN_PLACEHOLDER, "{domain}")
    }
}

fn default_crtsh_url() -> String {
    DEFAULT_CRTSH_URL.to_string()
}

fn default_crtsh_timeout() -> u64 {
    DEFAULT_CRTSH_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tools {
    pub amass: ToolSpec,
    pub subfinder: ToolSpec,
    pub assetfinder: ToolSpec,
    pub findomain: ToolSpec,
    pub massdns: ToolSpec,
    pub httpx: ToolSpec,
    pub naabu: ToolSpec,
    pub nuclei: ToolSpec,
    #[serde(default)]
    pub crtsh: CrtshSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directories {
    /// Base recon storage; `$HOME/recon` when absent.
    #[serde(default)]
    pub recon_dir: Option<PathBuf>,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            recon_dir: None,
            results_dir: default_results_dir(),
            tools_dir: default_tools_dir(),
        }
    }
}

fn default_results_dir() -> String {
    "results".to_string()
}

fn default_tools_dir() -> PathBuf {
    PathBuf::from("tools")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Stop the sequential stages at the first failed tool or missing output.
    #[serde(default)]
    pub fail_fast: bool,
}

/// Immutable run configuration, built once and passed by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tools: Tools,
    #[serde(default)]
    pub directories: Directories,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl Config {
    /// Path of the config file: `$RECONBULK_CONFIG` or `./config.json`.
    pub fn locate() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw, &path.display().to_string())
    }

    /// Parse and validate a JSON document; `origin` only labels errors.
    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw).map_err(|source| ConfigError::ParseJson {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn tool(&self, tool: Tool) -> &ToolSpec {
        match tool {
            Tool::Amass => &self.tools.amass,
            Tool::Subfinder => &self.tools.subfinder,
            Tool::Assetfinder => &self.tools.assetfinder,
            Tool::Findomain => &self.tools.findomain,
            Tool::Massdns => &self.tools.massdns,
            Tool::Httpx => &self.tools.httpx,
            Tool::Naabu => &self.tools.naabu,
            Tool::Nuclei => &self.tools.nuclei,
        }
    }

    /// Reject empty executables, unknown template tokens, and a crt.sh URL that is
    /// malformed or does not depend on the domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tool in Tool::ALL {
            let spec = self.tool(tool);
            if spec.path.trim().is_empty() {
                return Err(ConfigError::EmptyPath { tool: tool.name().to_string() });
            }
            for arg in &spec.args {
                template::check_tokens(tool.name(), arg)?;
            }
        }
        self.crtsh_url("example.com").map(|_| ())
    }

    /// Render the certificate transparency query URL for `domain`.
    pub fn crtsh_url(&self, domain: &str) -> Result<url::Url, ConfigError> {
        let url_template = self.tools.crtsh.url_template();
        if !template::references(&url_template, TemplateKey::Domain) {
            return Err(ConfigError::CrtshMissingDomain { url: self.tools.crtsh.url.clone() });
        }
        let ctx = InvocationContext::new().with(TemplateKey::Domain, urlencoding::encode(domain));
        let rendered = template::render("crtsh", &url_template, &ctx)?;
        url::Url::parse(&rendered).map_err(|source| ConfigError::InvalidUrl { url: rendered, source })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_json() -> String {
        r#"{
            "tools": {
                "amass": { "path": "amass", "args": ["enum", "-d", "{domain}", "-o", "{outputFile}"] },
                "subfinder": { "path": "subfinder", "args": ["-d", "{domain}", "-o", "{output}"] },
                "assetfinder": { "path": "assetfinder", "args": ["--subs-only", "{domain}"], "captureStdout": true },
                "findomain": { "path": "findomain", "args": ["-t", "{domain}", "-u", "{{.outputFile}}"] },
                "massdns": { "path": "massdns/bin/massdns", "args": ["-r", "{resolversFile}", "-o", "S", "-w", "{outputFile}", "{inputFile}"] },
                "httpx": { "path": "httpx", "args": ["-l", "{inputFile}", "-sc", "-o", "{outputFile}"] },
                "naabu": { "path": "naabu", "args": ["-list", "{inputFile}", "-o", "{outputFile}"] },
                "nuclei": { "path": "nuclei", "args": ["-l", "{inputFile}", "-o", "{outputFile}"] }
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = Config::from_json_str(&sample_json(), "inline").unwrap();
        assert_eq!(cfg.tools.crtsh.url, DEFAULT_CRTSH_URL);
        assert_eq!(cfg.directories.results_dir, "results");
        assert_eq!(cfg.directories.tools_dir, PathBuf::from("tools"));
        assert!(cfg.directories.recon_dir.is_none());
        assert!(!cfg.pipeline.fail_fast);
        assert_eq!(cfg.tool(Tool::Massdns).path, "massdns/bin/massdns");
        assert!(cfg.tool(Tool::Assetfinder).capture_stdout);
        assert!(!cfg.tool(Tool::Amass).capture_stdout);
    }

    #[test]
    fn test_unknown_token_rejected_at_load() {
        let raw = sample_json().replace("\"--subs-only\"", "\"{bogus}\"");
        let err = Config::from_json_str(&raw, "inline").unwrap_err();
        match err {
            ConfigError::UnknownToken { tool, token, .. } => {
                assert_eq!(tool, "assetfinder");
                assert_eq!(token, "bogus");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_tool_is_parse_error() {
        let raw = r#"{ "tools": { "amass": { "path": "amass" } } }"#;
        assert!(matches!(Config::from_json_str(raw, "inline"), Err(ConfigError::ParseJson { .. })));
    }

    #[test]
    fn test_crtsh_url_encodes_domain() {
        let cfg = Config::from_json_str(&sample_json(), "inline").unwrap();
        let url = cfg.crtsh_url("example.com").unwrap();
        assert_eq!(url.as_str(), "https://crt.sh/?q=%25.example.com&output=json");
    }

    fn with_crtsh(crtsh: &str) -> String {
        sample_json().replacen("\"tools\": {", &format!("\"tools\": {{ \"crtsh\": {} ,", crtsh), 1)
    }

    #[test]
    fn test_crtsh_url_without_domain_rejected() {
        for url in ["https://crt.sh/?q=example.com&output=json", "https://crt.sh/?q=%25.{ toolsDir }&output=json"] {
            let raw = with_crtsh(&format!(r#"{{ "url": "{}" }}"#, url));
            assert!(
                matches!(Config::from_json_str(&raw, "inline"), Err(ConfigError::CrtshMissingDomain { .. })),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_legacy_printf_crtsh_url_uses_domain() {
        let raw = with_crtsh(r#"{ "url": "https://crt.sh/?q=%25.%s&output=json" }"#);
        let cfg = Config::from_json_str(&raw, "inline").unwrap();
        assert_eq!(
            cfg.crtsh_url("target.org").unwrap().as_str(),
            "https://crt.sh/?q=%25.target.org&output=json"
        );
    }

    #[test]
    fn test_crtsh_timeout() {
        let cfg = Config::from_json_str(&sample_json(), "inline").unwrap();
        assert_eq!(cfg.tools.crtsh.timeout(), Some(Duration::from_secs(DEFAULT_CRTSH_TIMEOUT_SECS)));

        let raw = with_crtsh(r#"{ "timeoutSecs": 0 }"#);
        let cfg = Config::from_json_str(&raw, "inline").unwrap();
        assert_eq!(cfg.tools.crtsh.timeout(), None);
        assert_eq!(cfg.tools.crtsh.url, DEFAULT_CRTSH_URL);
    }

    #[test]
    fn test_bad_crtsh_url_rejected() {
        let raw = sample_json().replacen("\"tools\": {", "\"tools\": { \"crtsh\": { \"url\": \"not a url {domain}\" },", 1);
        assert!(matches!(Config::from_json_str(&raw, "inline"), Err(ConfigError::InvalidUrl { .. })));
    }
}
