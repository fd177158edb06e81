//! Stateful handles that resolve one abstraction for a consumer.
//!
//! - [`Injected`] resolves eagerly or on first access and keeps the result.
//! - [`ForcedInjected`] panics when nothing can be resolved.
//! - [`ObservedInjected`] follows changes of the current implementation.
//!
//! All of them are configured through an [`InjectionBuilder`].

mod forced;
mod observed;
mod regular;

pub use forced::ForcedInjected;
pub use observed::ObservedInjected;
pub use regular::{Injected, ResolutionState};

use crate::context::{Context, ContextManager};
use crate::diagnostics::report;
use crate::error::InjectionError;
use crate::factory::{Abstraction, Lifetime};
use crate::location::SourceLocation;
use crate::manager::DependencyManager;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// When a wrapper performs its first resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timing {
  /// On first access.
  #[default]
  Lazy,
  /// While the wrapper is being built.
  Eager,
}

/// Everything a wrapper needs to fetch a value.
#[derive(Clone)]
pub(crate) struct Target {
  manager: Arc<ContextManager>,
  context: Context,
  lifetime: Lifetime,
  key: Option<String>,
  location: SourceLocation,
}

impl Target {
  pub(crate) fn dependencies(&self) -> Arc<DependencyManager> {
    self.manager.get(&self.context)
  }

  /// Resolves once against the wrapper's context, reporting every miss.
  pub(crate) fn fetch<A: Abstraction + ?Sized>(&self) -> Option<Arc<A>> {
    let fetched = self
      .dependencies()
      .try_get::<A>(self.lifetime, self.key.as_deref());
    match fetched {
      Ok(Some(value)) => Some(value),
      Ok(None) => {
        self.report_missing::<A>();
        None
      }
      Err(err) => {
        report(&err);
        self.report_missing::<A>();
        None
      }
    }
  }

  pub(crate) fn report_missing<A: Abstraction + ?Sized>(&self) {
    report(&InjectionError::NoImplementationFoundOnInjection {
      abstraction: A::IDENTITY.to_owned(),
      location: self.location.to_string(),
    });
  }

  pub(crate) fn forced_failure<A: Abstraction + ?Sized>(&self) -> InjectionError {
    InjectionError::ForcedInjectionFail {
      abstraction: A::IDENTITY.to_owned(),
      location: self.location.to_string(),
    }
  }
}

impl fmt::Debug for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Target")
      .field("context", &self.context)
      .field("lifetime", &self.lifetime)
      .field("key", &self.key)
      .field("location", &self.location)
      .finish()
  }
}

/// Configures and builds a resolution wrapper for `A`.
///
/// By default the wrapper resolves lazily, with [`Lifetime::Regular`], in the
/// global context of the process-wide [`ContextManager`], and reports misses
/// at the location that created the builder.
pub struct InjectionBuilder<A: Abstraction + ?Sized> {
  manager: Option<Arc<ContextManager>>,
  context: Context,
  lifetime: Lifetime,
  timing: Timing,
  key: Option<String>,
  location: SourceLocation,
  _abstraction: PhantomData<fn() -> Arc<A>>,
}

impl<A: Abstraction + ?Sized> InjectionBuilder<A> {
  #[track_caller]
  pub fn new() -> Self {
    Self {
      manager: None,
      context: Context::Global,
      lifetime: Lifetime::Regular,
      timing: Timing::Lazy,
      key: None,
      location: SourceLocation::caller(),
      _abstraction: PhantomData,
    }
  }

  /// Resolves against `manager` instead of the process-wide default.
  pub fn manager(mut self, manager: Arc<ContextManager>) -> Self {
    self.manager = Some(manager);
    self
  }

  pub fn context(mut self, context: Context) -> Self {
    self.context = context;
    self
  }

  pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
    self.lifetime = lifetime;
    self
  }

  pub fn timing(mut self, timing: Timing) -> Self {
    self.timing = timing;
    self
  }

  /// Always use the implementation under `key`, whatever the current key is.
  pub fn key(mut self, key: impl Into<String>) -> Self {
    self.key = Some(key.into());
    self
  }

  pub fn location(mut self, location: impl Into<SourceLocation>) -> Self {
    self.location = location.into();
    self
  }

  pub fn build(self) -> Injected<A> {
    let timing = self.timing;
    Injected::new(self.into_target(), timing)
  }

  pub fn build_forced(self) -> ForcedInjected<A> {
    ForcedInjected::new(self.build())
  }

  pub fn build_observed(self) -> ObservedInjected<A> {
    ObservedInjected::new(self.into_target())
  }

  fn into_target(self) -> Target {
    let manager = self.manager.unwrap_or_else(crate::global::context_manager);
    let context = manager.transform_to_valid_context(&self.context, self.location.file_id());
    Target {
      manager,
      context,
      lifetime: self.lifetime,
      key: self.key,
      location: self.location,
    }
  }
}

impl<A: Abstraction + ?Sized> Default for InjectionBuilder<A> {
  #[track_caller]
  fn default() -> Self {
    Self::new()
  }
}

impl<A: Abstraction + ?Sized> fmt::Debug for InjectionBuilder<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InjectionBuilder")
      .field("abstraction", &A::IDENTITY)
      .field("context", &self.context)
      .field("lifetime", &self.lifetime)
      .field("timing", &self.timing)
      .field("key", &self.key)
      .field("location", &self.location)
      .finish()
  }
}
