//! The non-blocking execution contract.
//!
//! Every participant in a dispatch (middleware, hook, view, error handler)
//! is a [`Callable`]. Callables report how they execute; anything that would
//! block the runtime thread is refused at registration by [`check_async`].
//! Blocking code can still take part once it is moved onto the blocking pool
//! with [`run_blocking`].

use tracing::debug;

use crate::error::{DeclarationError, DispatchResult};

/// How a callable runs when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Execution {
    /// Suspends cooperatively on the async runtime.
    NonBlocking,
    /// Blocks the calling thread until done.
    Blocking,
}

/// Something the dispatch pipeline can invoke.
///
/// Both defaults suit hand-written async types, so an empty impl is enough:
///
/// ```rust
/// use tortilla_core::{check_async, Callable};
///
/// struct AuditTrail;
/// impl Callable for AuditTrail {}
///
/// assert!(check_async(&AuditTrail).is_ok());
/// ```
pub trait Callable {
    /// Name used in diagnostics and as a hook target.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// How invocation runs.
    fn execution(&self) -> Execution {
        Execution::NonBlocking
    }
}

/// Verifies that `callable` honors the non-blocking contract.
pub fn check_async<C: Callable + ?Sized>(callable: &C) -> Result<(), DeclarationError> {
    match callable.execution() {
        Execution::NonBlocking => {
            debug!(callable = callable.name(), "accepted non-blocking callable");
            Ok(())
        }
        Execution::Blocking => Err(DeclarationError::NotAsynchronous {
            name: callable.name().to_string(),
        }),
    }
}

/// Runs a blocking closure on the runtime's blocking pool.
///
/// A panic inside `f` resumes on the awaiting task.
///
/// ```rust
/// # tokio_test::block_on(async {
/// use tortilla_core::run_blocking;
///
/// let sum = run_blocking(|| (1..=10).sum::<u32>()).await.unwrap();
/// assert_eq!(sum, 55);
/// # });
/// ```
pub async fn run_blocking<F, R>(f: F) -> DispatchResult<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(anyhow::Error::new(err).context("blocking task was cancelled").into()),
    }
}
