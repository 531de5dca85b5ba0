//! The single scheduling primitive both actors need: "deliver message `m`
//! to me after duration `d`" (spec §4.3).
//!
//! Grounded in the teacher's own idiom for this — every background loop in
//! `networking/membership/swim.rs` and `networking/health/*.rs` is a
//! `tokio::spawn` wrapping `tokio::time::sleep`/`interval` followed by a
//! channel send. `tokio::time::Instant` is monotonic, not wall-clock, and
//! under `#[tokio::test(start_paused = true)]` the same calls advance on
//! virtual time, which is how the test suite drives deterministic
//! suspect-timeout and ping-timeout scenarios without real delays.
//!
//! Scheduled deliveries are not cancellable by design (spec §4.3): callers
//! that need "never mind" semantics reconcile on arrival by checking
//! whether the state they cared about has moved on, not by canceling the
//! timer.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn `job` to run after `delay` elapses. The returned handle is for
/// observability/shutdown bookkeeping only — dropping or ignoring it does
/// not cancel the delivery.
pub fn spawn_after<F>(delay: Duration, job: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        job.await;
    })
}
