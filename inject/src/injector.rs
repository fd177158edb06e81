//! The `Injector` facade.

use crate::context::{Context, ContextManager};
use crate::diagnostics;
use crate::error::InjectionError;
use crate::factory::{Abstraction, Factory, Lifetime};
use crate::location::SourceLocation;
use crate::manager::DependencyManager;
use crate::wrappers::InjectionBuilder;

use std::fmt;
use std::sync::Arc;

/// A handle on one context of a [`ContextManager`].
///
/// This is the entry point for registering, querying and resetting
/// dependencies. Cloning the handle is cheap; all clones address the same
/// context.
///
/// ```
/// use fibre_inject::{Abstraction, Context, Factory, Injector, Lifetime};
/// use std::sync::Arc;
///
/// trait Repository: Send + Sync {
///   fn origin(&self) -> &'static str;
/// }
/// impl Abstraction for dyn Repository {
///   const IDENTITY: &'static str = "docs.Repository";
/// }
///
/// struct LocalRepo;
/// impl Repository for LocalRepo {
///   fn origin(&self) -> &'static str { "local" }
/// }
/// struct RemoteRepo;
/// impl Repository for RemoteRepo {
///   fn origin(&self) -> &'static str { "remote" }
/// }
///
/// let injector = Injector::build_context(Context::custom("docs.injector"));
/// injector.register::<dyn Repository, _, _>(
///   "remote",
///   [
///     ("local", Factory::from_fn(|| Arc::new(LocalRepo) as Arc<dyn Repository>)),
///     ("remote", Factory::from_fn(|| Arc::new(RemoteRepo) as Arc<dyn Repository>)),
///   ],
/// );
///
/// let repo = injector.get::<dyn Repository>(Lifetime::Regular, None).unwrap();
/// assert_eq!(repo.origin(), "remote");
///
/// let local = injector.get::<dyn Repository>(Lifetime::Regular, Some("local")).unwrap();
/// assert_eq!(local.origin(), "local");
///
/// injector.destroy();
/// ```
#[derive(Clone)]
pub struct Injector {
  manager: Arc<ContextManager>,
  context: Context,
}

impl Injector {
  /// A handle on `context` of the process-wide default manager.
  pub fn new(context: Context) -> Self {
    Self::with_manager(crate::global::context_manager(), context)
  }

  pub fn global() -> Self {
    Self::new(Context::Global)
  }

  pub fn with_manager(manager: Arc<ContextManager>, context: Context) -> Self {
    Self { manager, context }
  }

  /// Like [`Injector::new`], but materializes the context right away.
  pub fn build_context(context: Context) -> Self {
    let injector = Self::new(context);
    injector.dependencies();
    injector
  }

  pub fn context(&self) -> &Context {
    &self.context
  }

  pub fn context_manager(&self) -> &Arc<ContextManager> {
    &self.manager
  }

  /// The dependency manager currently backing this context.
  pub fn dependencies(&self) -> Arc<DependencyManager> {
    self.manager.get(&self.context)
  }

  // --- Registration ---

  pub fn register<A, K, I>(&self, default_key: impl Into<String>, implementations: I)
  where
    A: Abstraction + ?Sized,
    K: Into<String>,
    I: IntoIterator<Item = (K, Factory)>,
  {
    self.dependencies().register::<A, K, I>(default_key, implementations);
  }

  pub fn register_single<A: Abstraction + ?Sized>(&self, key: impl Into<String>, factory: Factory) {
    self.dependencies().register_single::<A>(key, factory);
  }

  pub fn add<A, K, I>(&self, implementations: I)
  where
    A: Abstraction + ?Sized,
    K: Into<String>,
    I: IntoIterator<Item = (K, Factory)>,
  {
    self.dependencies().add::<A, K, I>(implementations);
  }

  pub fn add_single<A: Abstraction + ?Sized>(&self, key: impl Into<String>, factory: Factory) {
    self.dependencies().add_single::<A>(key, factory);
  }

  pub fn add_or_register<A, K, I>(&self, default_key: impl Into<String>, implementations: I)
  where
    A: Abstraction + ?Sized,
    K: Into<String>,
    I: IntoIterator<Item = (K, Factory)>,
  {
    self
      .dependencies()
      .add_or_register::<A, K, I>(default_key, implementations);
  }

  pub fn add_or_register_single<A: Abstraction + ?Sized>(
    &self,
    key: impl Into<String>,
    factory: Factory,
  ) {
    self.dependencies().add_or_register_single::<A>(key, factory);
  }

  /// Switches `A`'s current implementation; observed injections follow.
  pub fn select<A: Abstraction + ?Sized>(&self, key: &str) {
    self.dependencies().select::<A>(key);
  }

  // --- Resolution ---

  /// Resolves `A`; misses are reported at the caller's location.
  #[track_caller]
  pub fn get<A: Abstraction + ?Sized>(
    &self,
    lifetime: Lifetime,
    constraint_key: Option<&str>,
  ) -> Option<Arc<A>> {
    self.dependencies().get::<A>(lifetime, constraint_key)
  }

  /// Like [`Injector::get`] but for dependencies that must exist.
  ///
  /// # Panics
  ///
  /// Panics with a `ForcedInjectionFail` message when nothing is resolved.
  #[track_caller]
  pub fn get_forced<A: Abstraction + ?Sized>(
    &self,
    lifetime: Lifetime,
    constraint_key: Option<&str>,
  ) -> Arc<A> {
    let location = SourceLocation::caller();
    self.get::<A>(lifetime, constraint_key).unwrap_or_else(|| {
      let err = InjectionError::ForcedInjectionFail {
        abstraction: A::IDENTITY.to_owned(),
        location: location.to_string(),
      };
      diagnostics::report(&err);
      panic!("{}", err);
    })
  }

  /// Starts a wrapper bound to this handle's manager and context.
  #[track_caller]
  pub fn inject<A: Abstraction + ?Sized>(&self) -> InjectionBuilder<A> {
    InjectionBuilder::new()
      .manager(self.manager.clone())
      .context(self.context.clone())
  }

  // --- Lifecycle ---

  pub fn reset_singleton<A: Abstraction + ?Sized>(&self, key: Option<&str>) {
    self.dependencies().reset_singleton::<A>(key);
  }

  pub fn remove<A: Abstraction + ?Sized>(&self) {
    self.dependencies().remove::<A>();
  }

  pub fn clear(&self) {
    self.dependencies().clear();
  }

  /// Drops the context and everything registered in it.
  pub fn destroy(self) {
    self.manager.remove(&self.context);
  }

  // --- Introspection ---

  pub fn contains<A: Abstraction + ?Sized>(&self) -> bool {
    self.dependencies().contains::<A>()
  }

  pub fn current_key<A: Abstraction + ?Sized>(&self) -> Option<String> {
    self.dependencies().current_key::<A>()
  }

  pub fn keys<A: Abstraction + ?Sized>(&self) -> Vec<String> {
    self.dependencies().keys::<A>()
  }

  // --- Diagnostics ---

  pub fn turn_on_logger() {
    diagnostics::turn_on_logger();
  }

  pub fn turn_off_logger(forced: bool) {
    diagnostics::turn_off_logger(forced);
  }
}

impl fmt::Debug for Injector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injector")
      .field("context", &self.context)
      .field("manager", &self.manager)
      .finish()
  }
}
