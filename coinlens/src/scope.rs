//! View-lifetime cancellation
//!
//! A `ViewScope` is created when a view mounts and dropped when it unmounts.
//! Every fetch issued for the view runs through `ViewScope::run`; dropping or
//! cancelling the scope aborts whatever is still outstanding, so late
//! responses are never delivered to a view that no longer exists.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable};

use crate::error::{LensError, Result};

#[derive(Default)]
struct ScopeState {
    cancelled: Cell<bool>,
    next_id: Cell<u64>,
    handles: RefCell<Vec<(u64, AbortHandle)>>,
}

/// Unregisters one fetch's handle when the fetch settles or is dropped
struct Registration<'a> {
    state: &'a ScopeState,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.state.handles.borrow_mut().retain(|(id, _)| *id != self.id);
    }
}

/// Cancellation scope tied to one mounted view
#[derive(Default)]
pub struct ViewScope {
    state: Rc<ScopeState>,
    label: &'static str,
}

impl ViewScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            state: Rc::default(),
            label,
        }
    }

    /// Run a fetch bound to this scope.
    ///
    /// Resolves to `Cancelled` if the scope is cancelled before or while the
    /// fetch is in flight.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(LensError::Cancelled);
        }

        let (handle, abort) = AbortHandle::new_pair();
        let id = self.state.next_id.get();
        self.state.next_id.set(id.wrapping_add(1));
        self.state.handles.borrow_mut().push((id, handle));
        let _registration = Registration { state: &self.state, id };

        Abortable::new(fut, abort).await?
    }

    /// Abort everything in flight and refuse new work
    pub fn cancel(&self) {
        if self.state.cancelled.replace(true) {
            return;
        }
        let handles = std::mem::take(&mut *self.state.handles.borrow_mut());
        if !handles.is_empty() {
            tracing::debug!(view = self.label, outstanding = handles.len(), "cancelling view fetches");
        }
        for (_, handle) in handles {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Handle that can cancel this scope from elsewhere (e.g. an unmount callback)
    pub fn canceller(&self) -> ScopeCanceller {
        ScopeCanceller {
            state: Rc::downgrade(&self.state),
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Weak cancel handle; a no-op once the scope itself is gone
#[derive(Clone)]
pub struct ScopeCanceller {
    state: std::rc::Weak<ScopeState>,
}

impl ScopeCanceller {
    pub fn cancel(&self) {
        if let Some(state) = self.state.upgrade() {
            state.cancelled.set(true);
            let handles = std::mem::take(&mut *state.handles.borrow_mut());
            for (_, handle) in handles {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let scope = ViewScope::new("test");
        let value = scope.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);

        let err = scope
            .run(async { Err::<(), _>(LensError::Network("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::Network(_)));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_fetch() {
        let scope = ViewScope::new("test");
        let canceller = scope.canceller();

        let pending = scope.run(future::pending::<Result<u32>>());
        let cancel = async {
            canceller.cancel();
            Ok::<(), LensError>(())
        };

        let (result, _) = futures::join!(pending, cancel);
        assert!(matches!(result, Err(LensError::Cancelled)));
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_scope_refuses_new_work() {
        let scope = ViewScope::new("test");
        scope.cancel();
        let result = scope.run(async { Ok(1) }).await;
        assert!(matches!(result, Err(LensError::Cancelled)));
    }

    #[tokio::test]
    async fn test_settled_fetches_release_their_handles() {
        let scope = ViewScope::new("test");
        for i in 0..1000 {
            let value = scope.run(async move { Ok(i) }).await.unwrap();
            assert_eq!(value, i);
        }
        let _ = scope
            .run(async { Err::<(), _>(LensError::Network("down".into())) })
            .await;
        assert!(scope.state.handles.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_fetch_holds_one_handle() {
        let scope = ViewScope::new("test");
        let pending = scope.run(future::pending::<Result<u32>>());
        let check = async {
            tokio::task::yield_now().await;
            assert_eq!(scope.state.handles.borrow().len(), 1);
            scope.cancel();
        };
        let (result, ()) = futures::join!(pending, check);
        assert!(matches!(result, Err(LensError::Cancelled)));
        assert!(scope.state.handles.borrow().is_empty());
    }

    #[test]
    fn test_canceller_outliving_scope_is_noop() {
        let scope = ViewScope::new("test");
        let canceller = scope.canceller();
        drop(scope);
        canceller.cancel();
    }
}
