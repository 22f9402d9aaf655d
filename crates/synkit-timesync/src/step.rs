use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::handle::TimeSyncHandle;

/// The future a step handler invocation returns. Its *resolution* is not
/// what completes the step — the handler is given a [`TimeSyncHandle`] and
/// is expected to eventually call `complete_simulation_step()` on it, either
/// from within this future or from unrelated work it spawns. This is the
/// "returns control to the barrier immediately, later calls
/// CompleteSimulationStep" coroutine-like contract.
pub type StepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A simulation step handler: invoked with `(now, duration, handle)` at the
/// start of every step.
pub type StepHandler = Arc<dyn Fn(i64, i64, TimeSyncHandle) -> StepFuture + Send + Sync + 'static>;

/// Wraps a plain async closure as a [`StepHandler`]. Handlers that complete
/// synchronously should call `handle.complete_simulation_step()` as the last
/// thing they do before returning; handlers that need to suspend should
/// spawn the remaining work and return, calling it from there instead.
pub fn step_handler<F, Fut>(f: F) -> StepHandler
where
	F: Fn(i64, i64, TimeSyncHandle) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	Arc::new(move |now, duration, handle| Box::pin(f(now, duration, handle)))
}
