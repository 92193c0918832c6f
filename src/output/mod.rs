pub mod atomic;
pub mod merge;
pub mod subdomain_set;

pub use merge::{merge_files, MergeSummary};
pub use subdomain_set::SubdomainSet;
