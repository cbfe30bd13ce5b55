pub mod units;

pub use units::{bytes_to_gb, format_bytes, round2, BYTES_PER_GB};
