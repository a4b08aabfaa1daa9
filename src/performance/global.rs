//! Process-wide reachability for callers that cannot thread a `PerfMonitor`
//! through their call chain, replacing the source's single mutable global
//! `pstat_Global` (Design Notes §9).

use once_cell::sync::OnceCell;

use super::{EngineConfig, PerfMonitor};
use crate::error::{PerfError, Result};

static ENGINE: OnceCell<PerfMonitor> = OnceCell::new();

/// Initializes the process-wide engine. Calling this twice is a
/// configuration error: the catalog is a build-time constant and the
/// engine is meant to be created exactly once per process (§3.5, §4.11).
pub fn initialize(num_trans: usize, config: EngineConfig) -> Result<()> {
    let engine = PerfMonitor::initialize(num_trans, config)?;
    ENGINE
        .set(engine)
        .map_err(|_| PerfError::ConfigError("performance engine already initialized".into()))
}

pub fn engine() -> Result<&'static PerfMonitor> {
    ENGINE.get().ok_or(PerfError::NotInitialized)
}
