//! Optional, out-of-process client logic: start/stop collection, keep a
//! baseline snapshot, and print elapsed-time diffs against the server
//! (§4.10). In this crate the "server" is the local [`PerfMonitor`]; a
//! real out-of-process client would swap this for an RPC stub without
//! touching the diff/print logic below.

use std::io::Write;
use std::time::Instant;

use crate::error::Result;

use super::module_tag::ThreadContext;
use super::PerfMonitor;

/// Which server-side collection this session toggled, so `stop` can
/// disable exactly what `start` enabled.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Transaction(ThreadContext),
    Global,
}

pub struct ClientSession {
    scope: Scope,
    baseline: Vec<u64>,
    current: Vec<u64>,
    started_at: Instant,
}

impl ClientSession {
    /// `start(for_all_trans)`: enables collection, then captures `baseline`.
    pub fn start(engine: &PerfMonitor, ctx: ThreadContext, for_all_trans: bool) -> Result<ClientSession> {
        let scope = if for_all_trans { Scope::Global } else { Scope::Transaction(ctx) };
        match scope {
            Scope::Transaction(ctx) => engine.watch_start(&ctx),
            Scope::Global => engine.watch_start(&ThreadContext::system()),
        }

        let mut baseline = engine.alloc_values();
        Self::sample(engine, scope, &mut baseline);
        let current = baseline.clone();

        Ok(ClientSession { scope, baseline, current, started_at: Instant::now() })
    }

    fn sample(engine: &PerfMonitor, scope: Scope, into: &mut [u64]) {
        match scope {
            Scope::Transaction(ctx) => engine.copy_tran_snapshot(&ctx, into),
            Scope::Global => engine.copy_global_snapshot(into),
        }
    }

    /// `get()`: refreshes `current` from the server.
    pub fn get(&mut self, engine: &PerfMonitor) {
        Self::sample(engine, self.scope, &mut self.current);
    }

    /// `diff_print(stream)`: dumps `current - baseline` plus elapsed wall
    /// time since `start`. The source also reports user/system CPU time;
    /// this crate's dependency stack has no CPU-time accessor, so only wall
    /// time is reported (see DESIGN.md).
    pub fn diff_print<W: Write>(&self, engine: &PerfMonitor, writer: &mut W) -> std::io::Result<()> {
        let mut out = engine.alloc_values();
        engine.diff(&mut out, &self.current, &self.baseline);
        engine.dump_to_stream(writer, &out, None)?;
        writeln!(writer, "Elapsed_time_wall = {:.3} sec", self.started_at.elapsed().as_secs_f64())
    }

    /// `reset()`: reloads the baseline from the current server values.
    pub fn reset(&mut self, engine: &PerfMonitor) {
        Self::sample(engine, self.scope, &mut self.current);
        self.baseline.copy_from_slice(&self.current);
        self.started_at = Instant::now();
    }

    /// `stop()`: disables collection and clears local state. Idempotent.
    pub fn stop(self, engine: &PerfMonitor) {
        match self.scope {
            Scope::Transaction(ctx) => engine.watch_stop(&ctx),
            Scope::Global => engine.watch_stop(&ThreadContext::system()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{catalog, module_tag::Module, EngineConfig};

    #[test]
    fn start_captures_a_baseline_and_get_refreshes_current() {
        let engine = PerfMonitor::initialize(2, EngineConfig::default()).unwrap();
        let ctx = ThreadContext::new(1, Module::Worker);
        let mut session = ClientSession::start(&engine, ctx, false).unwrap();

        engine.add(&ctx, catalog::PB_NUM_FETCHES, 5);
        session.get(&engine);

        let layout = catalog::Layout::compute().unwrap();
        let off = layout.offset_of(catalog::PB_NUM_FETCHES) as usize;
        assert_eq!(session.current[off], 5);
        assert_eq!(session.baseline[off], 0);
    }

    #[test]
    fn reset_reloads_baseline_from_current() {
        let engine = PerfMonitor::initialize(1, EngineConfig::default()).unwrap();
        let ctx = ThreadContext::new(1, Module::Worker);
        let mut session = ClientSession::start(&engine, ctx, false).unwrap();
        engine.add(&ctx, catalog::PB_NUM_FETCHES, 3);
        session.get(&engine);
        session.reset(&engine);
        assert_eq!(session.baseline, session.current);
    }

    #[test]
    fn stop_is_callable_after_a_fresh_start() {
        let engine = PerfMonitor::initialize(1, EngineConfig::default()).unwrap();
        let ctx = ThreadContext::new(1, Module::Worker);
        let session = ClientSession::start(&engine, ctx, false).unwrap();
        session.stop(&engine);
        assert!(!engine.watching(&ctx));
    }
}
