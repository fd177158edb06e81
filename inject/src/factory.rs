//! Abstraction identities, type-erased instances and the factories producing them.

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// A logical service contract that can be registered and resolved.
///
/// Implement it for a trait object or a concrete type and give it a stable,
/// process-unique identity. The identity is the only lookup key the container
/// uses, so two abstractions must never share one.
///
/// ```
/// use fibre_inject::Abstraction;
///
/// trait Repository: Send + Sync {
///   fn name(&self) -> &'static str;
/// }
///
/// impl Abstraction for dyn Repository {
///   const IDENTITY: &'static str = "app.Repository";
/// }
/// ```
pub trait Abstraction: Any + Send + Sync {
  const IDENTITY: &'static str;
}

/// The string key an abstraction is stored under.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbstractionId(Arc<str>);

impl AbstractionId {
  pub fn new(identity: &str) -> Self {
    Self(Arc::from(identity))
  }

  pub fn of<A: Abstraction + ?Sized>() -> Self {
    Self::new(A::IDENTITY)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Borrow<str> for AbstractionId {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for AbstractionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "AbstractionId({})", self.0)
  }
}

impl fmt::Display for AbstractionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A type-erased, shareable instance.
///
/// The payload is always an `Arc<I>` for some `I`, which is what makes trait
/// objects resolvable: [`downcast_instance`] recovers the `Arc<I>`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Recovers the typed handle stored in an erased instance.
pub fn downcast_instance<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<I>> {
  instance.downcast_ref::<Arc<I>>().cloned()
}

pub(crate) fn erase<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Instance {
  Arc::new(value)
}

/// Whether a resolution produces a fresh instance or reuses a cached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
  /// Every resolution invokes the factory.
  #[default]
  Regular,
  /// The first resolution per implementation key is cached and reused.
  Singleton,
}

type FactoryFn = dyn Fn() -> Option<Instance> + Send + Sync;

/// A zero-argument producer of instances for one implementation key.
///
/// Factories may legitimately produce nothing; that outcome propagates to the
/// caller as an absent value rather than an error.
#[derive(Clone)]
pub struct Factory {
  make: Arc<FactoryFn>,
}

impl Factory {
  /// A factory that may fail to produce an instance.
  pub fn new<I, F>(make: F) -> Self
  where
    I: ?Sized + Send + Sync + 'static,
    F: Fn() -> Option<Arc<I>> + Send + Sync + 'static,
  {
    Self {
      make: Arc::new(move || make().map(erase)),
    }
  }

  /// A factory that always produces an instance.
  pub fn from_fn<I, F>(make: F) -> Self
  where
    I: ?Sized + Send + Sync + 'static,
    F: Fn() -> Arc<I> + Send + Sync + 'static,
  {
    Self {
      make: Arc::new(move || Some(erase(make()))),
    }
  }

  /// A factory handing out clones of one shared instance.
  pub fn from_value<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Self {
    Self {
      make: Arc::new(move || Some(erase(value.clone()))),
    }
  }

  /// A factory that never produces anything.
  pub fn empty() -> Self {
    Self {
      make: Arc::new(|| None),
    }
  }

  pub(crate) fn invoke(&self) -> Option<Instance> {
    (self.make)()
  }
}

impl fmt::Debug for Factory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Factory").finish_non_exhaustive()
  }
}
