use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{ReconError, Result};
use crate::output::SubdomainSet;

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: Option<String>,
}

fn network_err(url: &str) -> impl FnOnce(reqwest::Error) -> ReconError + '_ {
    move |source| ReconError::Network { url: url.to_string(), source }
}

/// HTTP client for crt.sh. `timeout` bounds the whole request; `None` waits as long
/// as the server keeps the connection open.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("reconbulk/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .use_rustls_tls();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(network_err("client"))
}

/// Extract names from a crt.sh JSON body.
///
/// Anything that isn't a JSON array of records yields an empty set. `name_value` may
/// hold several newline-separated names; a leading `*.` is dropped from each.
pub fn parse_crtsh_body(body: &str) -> SubdomainSet {
    let mut set = SubdomainSet::new();
    // crt.sh sometimes returns HTML or nothing at all on overload
    let entries: Vec<CrtShEntry> = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error=%e, "crt.sh response is not a JSON array; treating as empty");
            return set;
        }
    };
    for entry in entries {
        let Some(nv) = entry.name_value else { continue };
        for name in nv.split('\n') {
            let name = name.trim();
            set.insert(name.strip_prefix("*.").unwrap_or(name));
        }
    }
    set
}

/// Query crt.sh. Transport failures are errors; a bad status or body is an empty set.
pub async fn crtsh_subdomains(client: &Client, url: &url::Url) -> Result<SubdomainSet> {
    tracing::debug!(url=%url, "querying certificate transparency");
    let resp = client.get(url.clone()).send().await.map_err(network_err(url.as_str()))?;
    if !resp.status().is_success() {
        tracing::warn!(url=%url, status=%resp.status(), "crt.sh returned non-success status; treating as empty");
        return Ok(SubdomainSet::new());
    }
    let body = resp.text().await.map_err(network_err(url.as_str()))?;
    Ok(parse_crtsh_body(&body))
}

/// Query crt.sh and write the sorted names to `output`. Returns the number written.
pub async fn collect(client: &Client, url: &url::Url, output: &Path) -> Result<usize> {
    let set = crtsh_subdomains(client, url).await?;
    tracing::info!(found = set.len(), "crt.sh lookup complete");
    set.write_to(output)
}
