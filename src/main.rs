mod cli;
mod runner;

use std::process::ExitCode;

use recon_bulk::ReconError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse_cli();
    match runner::run_from_cli(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[!] {:#}", e);
            match e.downcast_ref::<ReconError>() {
                Some(ReconError::Interrupted) => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
