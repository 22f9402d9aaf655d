use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, pinned, owned future — the coroutine-like shape every lifecycle
/// hook returns so the service can `.await` a user-supplied async closure
/// without knowing its concrete type.
pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A lifecycle hook: an async closure invoked with no arguments at the
/// matching state transition.
pub type Hook = Arc<dyn Fn() -> HookFuture + Send + Sync + 'static>;

/// An abort hook additionally receives the reason the simulation is being
/// torn down.
pub type AbortHook = Arc<dyn Fn(String) -> HookFuture + Send + Sync + 'static>;

/// Wraps a plain async closure (`async move { ... }`) as a [`Hook`].
pub fn hook<F, Fut>(f: F) -> Hook
where
	F: Fn() -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	Arc::new(move || Box::pin(f()))
}

/// Wraps a plain async closure taking a reason string as an [`AbortHook`].
pub fn abort_hook<F, Fut>(f: F) -> AbortHook
where
	F: Fn(String) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	Arc::new(move |reason| Box::pin(f(reason)))
}

/// The set of user-supplied handlers a lifecycle service dispatches to.
/// Each is optional; a missing handler is simply skipped.
#[derive(Default, Clone)]
pub struct HandlerSet {
	pub communication_ready: Option<Hook>,
	pub starting: Option<Hook>,
	pub stop: Option<Hook>,
	pub shutdown: Option<Hook>,
	pub abort: Option<AbortHook>,
}
