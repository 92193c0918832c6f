pub mod normalize;

pub use normalize::{normalize_file, normalize_lines, ProbeRecord};
