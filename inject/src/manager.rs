//! The per-context registry of abstractions.

use crate::context::Context;
use crate::diagnostics::{self, report};
use crate::error::{InjectionError, Result};
use crate::factory::{downcast_instance, Abstraction, AbstractionId, Factory, Instance, Lifetime};
use crate::location::SourceLocation;
use crate::observer::{Hubs, ObservedEvent, ObserverHub, Sink, Subscriber, SubscriberId, Subscription};
use crate::registry::ImplementationRegistry;
use crate::store::ConcurrentStore;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegistrationRequest {
  Register,
  Add,
  AddOrRegister,
}

/// How a registration is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegistrationType {
  /// Rejects an abstraction that is already present.
  Create,
  /// Rejects an abstraction that is not present yet.
  Update,
  /// Accepts either.
  UpdateOrCreate,
}

impl RegistrationType {
  /// Test contexts turn `register` into register-or-update so fixtures can be
  /// re-run without tearing the context down. `add` always needs a prior
  /// registration.
  pub(crate) fn resolve(request: RegistrationRequest, overwrite_allowed: bool) -> Self {
    match (request, overwrite_allowed) {
      (RegistrationRequest::Register, false) => RegistrationType::Create,
      (RegistrationRequest::Register, true) => RegistrationType::UpdateOrCreate,
      (RegistrationRequest::Add, _) => RegistrationType::Update,
      (RegistrationRequest::AddOrRegister, _) => RegistrationType::UpdateOrCreate,
    }
  }
}

fn collect_factories<K, I>(implementations: I) -> HashMap<String, Factory>
where
  K: Into<String>,
  I: IntoIterator<Item = (K, Factory)>,
{
  implementations
    .into_iter()
    .map(|(key, factory)| (key.into(), factory))
    .collect()
}

/// Owns the implementation registries of every abstraction in one context.
///
/// All operations are safe to call from any thread. A successful
/// registration is visible to every subsequent lookup.
pub struct DependencyManager {
  context: Context,
  overwrite_allowed: bool,
  container: ConcurrentStore<Arc<ImplementationRegistry>>,
  observers: Arc<Hubs>,
}

impl DependencyManager {
  /// Creates an empty manager for `context`.
  ///
  /// `test_overwrite` only has an effect for [`Context::Tests`] contexts.
  pub fn new(context: Context, test_overwrite: bool) -> Self {
    let overwrite_allowed = test_overwrite && context.is_test();
    Self {
      context,
      overwrite_allowed,
      container: ConcurrentStore::new(),
      observers: Arc::new(Hubs::new()),
    }
  }

  pub fn context(&self) -> &Context {
    &self.context
  }

  /// Whether duplicate registrations replace the existing one instead of
  /// being rejected.
  pub fn allows_overwrite(&self) -> bool {
    self.overwrite_allowed
  }

  // --- Registration ---

  /// Registers `implementations` for `A`, selecting `default_key` as current.
  ///
  /// A second registration of the same abstraction is rejected (and
  /// reported) unless this manager belongs to a test context, where it
  /// updates the registration instead.
  pub fn register<A, K, I>(&self, default_key: impl Into<String>, implementations: I)
  where
    A: Abstraction + ?Sized,
    K: Into<String>,
    I: IntoIterator<Item = (K, Factory)>,
  {
    diagnostics::absorb(self.store(
      &AbstractionId::of::<A>(),
      RegistrationRequest::Register,
      Some(default_key.into()),
      collect_factories(implementations),
    ));
  }

  /// Registers a single implementation, which becomes the current one.
  pub fn register_single<A: Abstraction + ?Sized>(&self, key: impl Into<String>, factory: Factory) {
    let key = key.into();
    self.register::<A, _, _>(key.clone(), [(key, factory)]);
  }

  /// Adds implementations to an already registered abstraction. The current
  /// key is kept and already cached singletons survive.
  pub fn add<A, K, I>(&self, implementations: I)
  where
    A: Abstraction + ?Sized,
    K: Into<String>,
    I: IntoIterator<Item = (K, Factory)>,
  {
    diagnostics::absorb(self.store(
      &AbstractionId::of::<A>(),
      RegistrationRequest::Add,
      None,
      collect_factories(implementations),
    ));
  }

  pub fn add_single<A: Abstraction + ?Sized>(&self, key: impl Into<String>, factory: Factory) {
    self.add::<A, _, _>([(key.into(), factory)]);
  }

  /// Adds to an existing registration or creates one with `default_key` as
  /// current. Never rejected.
  pub fn add_or_register<A, K, I>(&self, default_key: impl Into<String>, implementations: I)
  where
    A: Abstraction + ?Sized,
    K: Into<String>,
    I: IntoIterator<Item = (K, Factory)>,
  {
    diagnostics::absorb(self.store(
      &AbstractionId::of::<A>(),
      RegistrationRequest::AddOrRegister,
      Some(default_key.into()),
      collect_factories(implementations),
    ));
  }

  pub fn add_or_register_single<A: Abstraction + ?Sized>(
    &self,
    key: impl Into<String>,
    factory: Factory,
  ) {
    let key = key.into();
    self.add_or_register::<A, _, _>(key.clone(), [(key, factory)]);
  }

  /// Makes `key` the current implementation of `A` and pushes the new value
  /// to every observer.
  pub fn select<A: Abstraction + ?Sized>(&self, key: &str) {
    diagnostics::absorb(self.select_by_id(&AbstractionId::of::<A>(), key));
  }

  fn store(
    &self,
    id: &AbstractionId,
    request: RegistrationRequest,
    current_key: Option<String>,
    factories: HashMap<String, Factory>,
  ) -> Result<()> {
    let registration = RegistrationType::resolve(request, self.overwrite_allowed);
    let mut announce = false;

    let registry = self.container.compute(id.as_str(), |existing| {
      match (registration, existing, current_key) {
        (RegistrationType::Create, Some(_), _) => Err(self.already_registered(id)),
        (RegistrationType::Update, None, _) => Err(InjectionError::AbstractionNotFoundForUpdate {
          abstraction: id.to_string(),
          context: self.context.id(),
        }),
        (RegistrationType::Update | RegistrationType::UpdateOrCreate, Some(existing), key) => {
          // Only a re-run `register` moves the current key of an existing entry.
          let next_key = match request {
            RegistrationRequest::Register => key,
            _ => None,
          };
          announce = factories.contains_key(existing.current_key())
            || next_key
              .as_deref()
              .map_or(false, |key| key != existing.current_key());
          Ok(Arc::new(existing.copy_with(next_key, factories)))
        }
        (RegistrationType::Create | RegistrationType::UpdateOrCreate, None, Some(key)) => {
          announce = true;
          Ok(Arc::new(ImplementationRegistry::new(key, factories)))
        }
        (RegistrationType::Create | RegistrationType::UpdateOrCreate, None, None) => {
          Err(InjectionError::UndefinedRegistrationType {
            abstraction: id.to_string(),
            context: self.context.id(),
          })
        }
      }
    })?;

    if diagnostics::verbose() {
      tracing::trace!(
        target: diagnostics::TARGET,
        abstraction = id.as_str(),
        context = %self.context,
        current_key = registry.current_key(),
        ?request,
        "registration stored"
      );
    }

    if announce {
      self.publish(id, None);
    }
    Ok(())
  }

  fn select_by_id(&self, id: &AbstractionId, key: &str) -> Result<()> {
    let mut changed = false;
    self.container.compute(id.as_str(), |existing| match existing {
      None => Err(self.not_found(id)),
      Some(existing) if !existing.contains_key(key) => Err(InjectionError::UnknownImplementationKey {
        abstraction: id.to_string(),
        key: key.to_owned(),
      }),
      Some(existing) => {
        changed = existing.current_key() != key;
        Ok(Arc::new(existing.copy_with(Some(key.to_owned()), HashMap::new())))
      }
    })?;
    if changed {
      self.publish(id, None);
    }
    Ok(())
  }

  // --- Resolution ---

  /// Resolves `A`, using the factory under `constraint_key` when given and
  /// the current one otherwise.
  ///
  /// Every failure (unregistered abstraction, unknown key, an instance of the
  /// wrong type, a factory producing nothing) is reported and yields `None`.
  /// A factory producing nothing is reported against the calling line.
  #[track_caller]
  pub fn get<A: Abstraction + ?Sized>(
    &self,
    lifetime: Lifetime,
    constraint_key: Option<&str>,
  ) -> Option<Arc<A>> {
    let location = SourceLocation::caller();
    match self.try_get::<A>(lifetime, constraint_key) {
      Ok(Some(value)) => Some(value),
      Ok(None) => {
        report(&InjectionError::NoImplementationFoundOnInjection {
          abstraction: A::IDENTITY.to_owned(),
          location: location.to_string(),
        });
        None
      }
      Err(err) => {
        report(&err);
        None
      }
    }
  }

  /// Like [`Self::get`] but leaves reporting to the caller. `Ok(None)` means the
  /// factory ran and produced nothing.
  pub(crate) fn try_get<A: Abstraction + ?Sized>(
    &self,
    lifetime: Lifetime,
    constraint_key: Option<&str>,
  ) -> Result<Option<Arc<A>>> {
    let id = AbstractionId::of::<A>();
    let (key, instance) = self.resolve_instance(&id, lifetime, constraint_key)?;
    match instance {
      Some(instance) => cast::<A>(&id, &key, &instance).map(Some),
      None => Ok(None),
    }
  }

  fn resolve_instance(
    &self,
    id: &AbstractionId,
    lifetime: Lifetime,
    constraint_key: Option<&str>,
  ) -> Result<(String, Option<Instance>)> {
    let registry = self.registry(id)?;
    let key = registry.resolve_key(constraint_key).to_owned();
    if !registry.contains_key(&key) {
      return Err(InjectionError::UnknownImplementationKey {
        abstraction: id.to_string(),
        key,
      });
    }
    let instance = registry.get(lifetime, Some(&key));
    Ok((key, instance))
  }

  fn registry(&self, id: &AbstractionId) -> Result<Arc<ImplementationRegistry>> {
    self
      .container
      .get(id.as_str())
      .ok_or_else(|| self.not_found(id))
  }

  // --- Lifecycle ---

  /// Evicts the cached singleton under `key`, or all of `A`'s cached
  /// singletons when `key` is `None`.
  pub fn reset_singleton<A: Abstraction + ?Sized>(&self, key: Option<&str>) {
    let id = AbstractionId::of::<A>();
    if let Some(registry) = diagnostics::absorb(self.registry(&id)) {
      registry.remove_singleton(key);
    }
  }

  /// Drops `A`'s registration. Observers are told the abstraction is gone.
  pub fn remove<A: Abstraction + ?Sized>(&self) {
    let id = AbstractionId::of::<A>();
    if self.container.remove(id.as_str()).is_some() {
      self.publish(&id, None);
    }
  }

  /// Drops every registration in this context.
  pub fn clear(&self) {
    for (identity, _) in self.container.drain() {
      self.publish(&AbstractionId::new(&identity), None);
    }
  }

  /// Tells every observer of this manager that it no longer serves its
  /// context. Called when the context is removed or replaced; registrations
  /// stay readable through handles that still hold the manager.
  pub(crate) fn detach(&self) {
    let mut hubs = Vec::new();
    self.observers.for_each(|identity, hub| hubs.push((identity.to_owned(), hub.clone())));
    // Sinks run outside the store's locks.
    for (identity, hub) in hubs {
      hub.fail_all(&self.not_found(&AbstractionId::new(&identity)));
    }
  }

  // --- Introspection ---

  pub fn contains<A: Abstraction + ?Sized>(&self) -> bool {
    self.container.contains(A::IDENTITY)
  }

  pub fn current_key<A: Abstraction + ?Sized>(&self) -> Option<String> {
    self
      .container
      .get(A::IDENTITY)
      .map(|registry| registry.current_key().to_owned())
  }

  /// The implementation keys registered for `A`, sorted.
  pub fn keys<A: Abstraction + ?Sized>(&self) -> Vec<String> {
    self
      .container
      .get(A::IDENTITY)
      .map(|registry| registry.keys())
      .unwrap_or_default()
  }

  /// Whether `A`'s singleton under `key` has been materialized.
  pub fn is_singleton_cached<A: Abstraction + ?Sized>(&self, key: &str) -> bool {
    self
      .container
      .get(A::IDENTITY)
      .map_or(false, |registry| registry.is_singleton_cached(key))
  }

  /// Number of registered abstractions.
  pub fn len(&self) -> usize {
    self.container.count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Identities of every registered abstraction, sorted.
  pub fn abstractions(&self) -> Vec<String> {
    let mut identities = Vec::with_capacity(self.container.count());
    self.container.for_each(|identity, _| identities.push(identity.to_owned()));
    identities.sort();
    identities
  }

  // --- Observation ---

  /// Subscribes `sink` to `A`'s change stream. Values delivered to it are
  /// resolved with `lifetime` and `constraint_key`.
  pub(crate) fn subscribe<A: Abstraction + ?Sized>(
    &self,
    id: SubscriberId,
    lifetime: Lifetime,
    constraint_key: Option<String>,
    sink: Sink,
  ) -> Subscription {
    ObserverHub::subscribe(
      &self.observers,
      A::IDENTITY,
      Subscriber {
        id,
        lifetime,
        constraint_key,
        sink,
      },
    )
  }

  /// Resolves a value for each addressed observer of `A` and delivers it.
  pub(crate) fn request_publish<A: Abstraction + ?Sized>(&self, target: Option<SubscriberId>) {
    self.publish(&AbstractionId::of::<A>(), target);
  }

  /// Number of live observed injections of `A` in this context.
  pub fn observer_count<A: Abstraction + ?Sized>(&self) -> usize {
    self
      .observers
      .get(A::IDENTITY)
      .map_or(0, |hub| hub.len())
  }

  /// Resolves and delivers under the hub's delivery guard, so overlapping
  /// publishes reach each subscriber in the order they read the registry.
  /// Without a registry, subscribers receive `Failed(NotAbstractionFound)`.
  fn publish(&self, id: &AbstractionId, target: Option<SubscriberId>) {
    let Some(hub) = self.observers.get(id.as_str()) else {
      return;
    };
    let _delivery = hub.delivery();
    let recipients = hub.recipients(target);
    if recipients.is_empty() {
      return;
    }

    let registry = self.container.get(id.as_str());
    for subscriber in recipients {
      let event = match &registry {
        Some(registry) => ObservedEvent::Value {
          target,
          instance: registry.get(subscriber.lifetime, subscriber.constraint_key.as_deref()),
        },
        None => ObservedEvent::Failed(self.not_found(id)),
      };
      (subscriber.sink)(event);
    }
  }

  // --- Errors ---

  fn not_found(&self, id: &AbstractionId) -> InjectionError {
    InjectionError::NotAbstractionFound {
      abstraction: id.to_string(),
      context: self.context.id(),
    }
  }

  fn already_registered(&self, id: &AbstractionId) -> InjectionError {
    InjectionError::AbstractionAlreadyRegistered {
      abstraction: id.to_string(),
      context: self.context.id(),
    }
  }
}

/// Casts an erased instance to the abstraction it was requested as.
pub(crate) fn cast<A: Abstraction + ?Sized>(
  id: &AbstractionId,
  key: &str,
  instance: &Instance,
) -> Result<Arc<A>> {
  downcast_instance::<A>(instance).ok_or_else(|| InjectionError::ImplementationsCouldNotBeCasted {
    abstraction: id.to_string(),
    key: key.to_owned(),
  })
}

impl fmt::Debug for DependencyManager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DependencyManager")
      .field("context", &self.context)
      .field("overwrite_allowed", &self.overwrite_allowed)
      .field("abstractions", &self.container.count())
      .finish()
  }
}
