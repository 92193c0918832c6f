use std::path::PathBuf;

use clap::Parser;

/// Run the full subdomain discovery and scanning pipeline against one domain.
///
/// Tool paths and argument templates are read from `config.json`
/// (or the file named by `RECONBULK_CONFIG`).
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target domain (e.g. example.com)
    pub domain: String,

    /// File with one DNS resolver per line, passed to the resolution stage
    pub resolvers_file: PathBuf,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
