pub mod crtsh;
pub mod fanout;

pub use fanout::{plan_discovery, run_discovery, DiscoveryOutcome};
