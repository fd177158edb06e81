use super::{InjectionBuilder, Injected};
use crate::diagnostics::report;
use crate::factory::Abstraction;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A required injection of `A`.
///
/// Reading the value panics when nothing could be resolved. Use [`Injected`]
/// where absence is an expected outcome.
pub struct ForcedInjected<A: Abstraction + ?Sized> {
  inner: Injected<A>,
}

impl<A: Abstraction + ?Sized> ForcedInjected<A> {
  #[track_caller]
  pub fn builder() -> InjectionBuilder<A> {
    InjectionBuilder::new()
  }

  pub(crate) fn new(inner: Injected<A>) -> Self {
    Self { inner }
  }

  /// The resolved value.
  ///
  /// # Panics
  ///
  /// Panics with a `ForcedInjectionFail` message if resolution found nothing.
  pub fn value(&self) -> Arc<A> {
    self.resolved().clone()
  }

  /// The wrapped optional injection.
  pub fn as_optional(&self) -> &Injected<A> {
    &self.inner
  }

  fn resolved(&self) -> &Arc<A> {
    match self.inner.resolved() {
      Some(value) => value,
      None => {
        let err = self.inner.target().forced_failure::<A>();
        report(&err);
        panic!("{}", err);
      }
    }
  }
}

impl<A: Abstraction + ?Sized> Deref for ForcedInjected<A> {
  type Target = A;

  fn deref(&self) -> &A {
    self.resolved()
  }
}

impl<A: Abstraction + ?Sized> fmt::Debug for ForcedInjected<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ForcedInjected").field(&self.inner).finish()
  }
}
