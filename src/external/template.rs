use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConfigError;

/// Any brace group with content: `{name}` or the legacy `{{.name}}` form. Whatever is
/// inside must trim to a known key, so typos like `{ domian }` or `{output-file}` fail.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([^{}]+)\}\}|\{([^{}]+)\}").expect("token regex is valid")
});

/// The closed set of values an argument template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateKey {
    Domain,
    ResolversFile,
    OutputDir,
    InputFile,
    OutputFile,
    ToolsDir,
}

impl TemplateKey {
    /// Map a token name (including aliases) to its key.
    pub fn from_token(name: &str) -> Option<Self> {
        match name {
            "domain" => Some(TemplateKey::Domain),
            "resolversFile" | "resolvers" => Some(TemplateKey::ResolversFile),
            "outputDir" | "dir" => Some(TemplateKey::OutputDir),
            "inputFile" => Some(TemplateKey::InputFile),
            "outputFile" | "output" => Some(TemplateKey::OutputFile),
            "toolsDir" => Some(TemplateKey::ToolsDir),
            _ => None,
        }
    }
}

/// Values available to one invocation. Built fresh for every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    values: BTreeMap<TemplateKey, String>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: TemplateKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: TemplateKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: TemplateKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }
}

struct Token<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn tokens(template: &str) -> impl Iterator<Item = Token<'_>> {
    TOKEN_RE.captures_iter(template).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = match (caps.get(1), caps.get(2)) {
            (Some(legacy), _) => {
                let inner = legacy.as_str().trim();
                inner.strip_prefix('.').unwrap_or(inner).trim()
            }
            (None, Some(plain)) => plain.as_str().trim(),
            (None, None) => return None,
        };
        Some(Token { start: whole.start(), end: whole.end(), name })
    })
}

/// True if `template` contains a token naming `key`.
pub fn references(template: &str, key: TemplateKey) -> bool {
    tokens(template).any(|t| TemplateKey::from_token(t.name) == Some(key))
}

/// Fail if `template` references a token outside the known key set.
pub fn check_tokens(tool: &str, template: &str) -> Result<(), ConfigError> {
    for token in tokens(template) {
        if TemplateKey::from_token(token.name).is_none() {
            return Err(ConfigError::UnknownToken {
                tool: tool.to_string(),
                template: template.to_string(),
                token: token.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Substitute every token of `template` from `ctx` in a single pass.
///
/// Substituted values are never rescanned, so a value that itself looks like a token is
/// emitted verbatim.
pub fn render(tool: &str, template: &str, ctx: &InvocationContext) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for token in tokens(template) {
        let key = TemplateKey::from_token(token.name).ok_or_else(|| ConfigError::UnknownToken {
            tool: tool.to_string(),
            template: template.to_string(),
            token: token.name.to_string(),
        })?;
        let value = ctx.get(key).ok_or_else(|| ConfigError::UnresolvedToken {
            tool: tool.to_string(),
            template: template.to_string(),
            token: token.name.to_string(),
        })?;
        out.push_str(&template[last..token.start]);
        out.push_str(value);
        last = token.end;
    }
    out.push_str(&template[last..]);
    Ok(out)
}

pub fn render_args(tool: &str, templates: &[String], ctx: &InvocationContext) -> Result<Vec<String>, ConfigError> {
    templates.iter().map(|t| render(tool, t, ctx)).collect()
}
