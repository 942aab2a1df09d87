//! The active-Scope stack.
//!
//! Evaluation is a strictly nested call tree, so the "currently running" Scope is tracked per thread
//! and saved/restored with stack discipline: [`enter`] installs a Scope and returns a guard that
//! reinstates the previous one when dropped. Because restoration happens in `Drop`, it also runs
//! when the evaluated code returns an error or panics.

use crate::env::Scope;
use std::cell::RefCell;

thread_local! {
  static ACTIVE_SCOPE: RefCell<Option<Scope>> = const { RefCell::new(None) };
}

/// The Scope of the innermost running evaluation or function call on this thread.
pub fn current_scope() -> Option<Scope> {
  ACTIVE_SCOPE.with(|active| active.borrow().clone())
}

/// No evaluation or function call is running on this thread.
pub(crate) fn is_idle() -> bool {
  ACTIVE_SCOPE
    .try_with(|active| active.try_borrow().map_or(false, |active| active.is_none()))
    .unwrap_or(false)
}

/// Makes `scope` the active Scope until the returned guard is dropped.
pub(crate) fn enter(scope: Scope) -> ActiveScopeGuard {
  let previous = ACTIVE_SCOPE.with(|active| active.borrow_mut().replace(scope));
  ActiveScopeGuard { previous }
}

#[must_use]
pub(crate) struct ActiveScopeGuard {
  previous: Option<Scope>,
}

impl Drop for ActiveScopeGuard {
  fn drop(&mut self) {
    let previous = self.previous.take();
    // The thread-local may already be gone during thread teardown.
    let _ = ACTIVE_SCOPE.try_with(|active| *active.borrow_mut() = previous);
  }
}
