use tracing::info;

/// Observer for coarse pipeline stage boundaries.
///
/// The orchestrator reports each potentially slow stage (weight loading,
/// encoding, decoding) as a begin/end pair: `phase(label, false)` strictly
/// before `phase(label, true)`. Observers are injected per context rather
/// than registered process-wide, so two contexts can report independently.
pub trait PhaseObserver: Send + Sync {
    fn phase(&self, label: &str, done: bool);
}

/// The default observer: ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPhaseObserver;

impl PhaseObserver for NoopPhaseObserver {
    fn phase(&self, _label: &str, _done: bool) {}
}

/// Forwards phase boundaries to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPhaseObserver;

impl PhaseObserver for TracingPhaseObserver {
    fn phase(&self, label: &str, done: bool) {
        if done {
            info!("{label}: done");
        } else {
            info!("{label}");
        }
    }
}
