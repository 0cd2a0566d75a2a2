pub mod error;
pub mod prober;
pub mod result;

pub use error::ScanError;
pub use prober::{ClientOptions, Prober};
pub use result::ProbeResult;
