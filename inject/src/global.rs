//! The process-wide default [`ContextManager`].

use crate::context::{ContextManager, ExecutionMode};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

// Created on first access; the execution mode is read from the environment once.
static CONTEXT_MANAGER: Lazy<RwLock<Arc<ContextManager>>> = Lazy::new(|| {
  let manager = ContextManager::builder()
    .execution_mode(ExecutionMode::from_env())
    .build();
  RwLock::new(Arc::new(manager))
});

/// The context manager used by [`crate::Injector::new`] and by wrappers built
/// without an explicit manager.
///
/// # Examples
///
/// ```
/// use fibre_inject::{global, Context};
///
/// let dependencies = global::context_manager().get(&Context::custom("docs.global"));
/// assert!(dependencies.is_empty());
/// ```
pub fn context_manager() -> Arc<ContextManager> {
  CONTEXT_MANAGER.read().clone()
}

/// Replaces the default context manager and returns the previous one.
///
/// Meant for test setup. Handles created before the swap keep using the
/// manager they were created with.
pub fn set_context_manager(manager: Arc<ContextManager>) -> Arc<ContextManager> {
  std::mem::replace(&mut *CONTEXT_MANAGER.write(), manager)
}
