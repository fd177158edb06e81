use super::{InjectionBuilder, Target, Timing};
use crate::context::Context;
use crate::factory::Abstraction;
use crate::location::SourceLocation;

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Where a wrapper is in its resolution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
  Unresolved,
  Resolved,
  /// Resolution ran and found nothing.
  ResolvedEmpty,
}

/// An optional injection of `A`.
///
/// The wrapper resolves once, either while it is built ([`Timing::Eager`]) or
/// on the first [`Injected::unwrap_value`] ([`Timing::Lazy`]), and keeps that
/// result for the rest of its life.
///
/// ```
/// use fibre_inject::{Abstraction, ContextManager, Context, Factory, Injected, Injector};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///   fn greet(&self) -> String;
/// }
/// impl Abstraction for dyn Greeter {
///   const IDENTITY: &'static str = "docs.Greeter";
/// }
/// struct English;
/// impl Greeter for English {
///   fn greet(&self) -> String {
///     "Hello!".to_string()
///   }
/// }
///
/// let manager = Arc::new(ContextManager::new());
/// let injector = Injector::with_manager(manager.clone(), Context::custom("docs"));
/// injector.register_single::<dyn Greeter>(
///   "english",
///   Factory::from_fn(|| Arc::new(English) as Arc<dyn Greeter>),
/// );
///
/// let greeter = Injected::<dyn Greeter>::builder()
///   .manager(manager)
///   .context(Context::custom("docs"))
///   .build();
/// assert_eq!(greeter.unwrap_value().unwrap().greet(), "Hello!");
/// ```
pub struct Injected<A: Abstraction + ?Sized> {
  target: Target,
  value: OnceCell<Option<Arc<A>>>,
}

impl<A: Abstraction + ?Sized> Injected<A> {
  #[track_caller]
  pub fn builder() -> InjectionBuilder<A> {
    InjectionBuilder::new()
  }

  pub(crate) fn new(target: Target, timing: Timing) -> Self {
    let injected = Self {
      target,
      value: OnceCell::new(),
    };
    if timing == Timing::Eager {
      injected.resolved();
    }
    injected
  }

  /// The resolved value, resolving first if that has not happened yet.
  pub fn unwrap_value(&self) -> Option<Arc<A>> {
    self.resolved().clone()
  }

  pub(crate) fn resolved(&self) -> &Option<Arc<A>> {
    self.value.get_or_init(|| self.target.fetch::<A>())
  }

  pub fn state(&self) -> ResolutionState {
    match self.value.get() {
      None => ResolutionState::Unresolved,
      Some(Some(_)) => ResolutionState::Resolved,
      Some(None) => ResolutionState::ResolvedEmpty,
    }
  }

  /// The context this wrapper resolves in, after test-file redirection.
  pub fn context(&self) -> &Context {
    &self.target.context
  }

  pub fn location(&self) -> &SourceLocation {
    &self.target.location
  }

  pub(crate) fn target(&self) -> &Target {
    &self.target
  }
}

impl<A: Abstraction + ?Sized> fmt::Debug for Injected<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injected")
      .field("abstraction", &A::IDENTITY)
      .field("target", &self.target)
      .field("state", &self.state())
      .finish()
  }
}
