use anyhow::{bail, Context};

use crate::cli::Cli;
use recon_bulk::config::Config;
use recon_bulk::pipeline::{self, Plan, PipelineState};
use recon_bulk::{ReconError, RunContext};

fn print_ascii_logo() {
    println!(r#"
     ____                       ____        _ _
    |  _ \ ___  ___ ___  _ __  | __ ) _   _| | | __
    | |_) / _ \/ __/ _ \| '_ \ |  _ \| | | | | |/ /
    |  _ <  __/ (_| (_) | | | || |_) | |_| | |   <
    |_| \_\___|\___\___/|_| |_||____/ \__,_|_|_|\_\

                 Recon Pipeline v0.1.0
    "#);
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    // Keep reqwest/hyper quiet unless RUST_LOG asks otherwise.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recon_bulk=info,reconbulk=info,reqwest=info,hyper=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();
}

/// Signal that ended a run early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Interrupt,
    Terminate,
}

impl Shutdown {
    fn describe(self) -> &'static str {
        match self {
            Shutdown::Interrupt => "Keyboard interrupt detected",
            Shutdown::Terminate => "Termination signal received",
        }
    }
}

/// SIGINT and SIGTERM handlers, registered before any tool is spawned.
#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> Shutdown {
        tokio::select! {
            _ = self.interrupt.recv() => Shutdown::Interrupt,
            _ = self.terminate.recv() => Shutdown::Terminate,
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Shutdown {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Shutdown::Interrupt,
            Err(_) => std::future::pending().await,
        }
    }
}

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging();

    let config_path = Config::locate();
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    print_ascii_logo();
    println!("[>] Target: {}", cli.domain);
    println!("[>] Resolvers: {}", cli.resolvers_file.display());
    if !cli.resolvers_file.is_file() {
        println!("[!] Resolvers file {} not found; resolution will likely fail", cli.resolvers_file.display());
    }

    let missing = recon_bulk::external::tools::preflight(&config);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|t| t.name()).collect();
        println!("[!] Tools not found: {}", names.join(", "));
    }

    let run = RunContext::create(&config, &cli.domain, &cli.resolvers_file)
        .context("failed to create result directory")?;
    let plan = match Plan::build(&config, &run) {
        Ok(plan) => plan,
        Err(e) => {
            // nothing has been written yet
            let _ = std::fs::remove_dir(&run.result_dir);
            return Err(ReconError::from(e)).context("invalid tool configuration");
        }
    };
    println!("[>] Results: {}", run.result_dir.display());
    println!("\n{}\n", "-".repeat(60));

    let mut signals = ShutdownSignals::install().context("failed to install signal handlers")?;
    // dropping the pipeline future kills any running tool
    let report = tokio::select! {
        res = pipeline::execute(plan, &run) => res?,
        sig = signals.recv() => {
            println!("\n[!] {}. Exiting...", sig.describe());
            tracing::warn!(signal=?sig, result_dir=%run.result_dir.display(), "run aborted");
            return Err(ReconError::Interrupted.into());
        }
    };

    report.print_summary();
    match report.state {
        PipelineState::Success => {
            println!("[+] All results in: {}", run.result_dir.display());
            Ok(())
        }
        PipelineState::FailedFast { stage, reason } => bail!("pipeline stopped at {}: {}", stage, reason),
    }
}
