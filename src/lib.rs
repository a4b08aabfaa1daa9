pub mod error;
pub mod performance;

pub use error::{PerfError, Result};
pub use performance::{EngineConfig, PerfMonitor};
