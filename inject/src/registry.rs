//! Per-abstraction storage of keyed factories and cached singletons.

use crate::factory::{Factory, Instance, Lifetime};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Slot = Arc<OnceCell<Option<Instance>>>;

/// Lazily populated singleton instances, one slot per implementation key.
///
/// A slot remembers the first attempt even when the factory produced nothing.
#[derive(Default)]
pub(crate) struct SingletonCache {
  slots: Mutex<HashMap<String, Slot>>,
}

impl SingletonCache {
  /// Returns the cached instance for `key`, running `factory` exactly once
  /// per slot. Concurrent callers for an empty slot block until the first
  /// finishes and then share its result.
  fn get_or_init(&self, key: &str, factory: &Factory) -> Option<Instance> {
    let slot = {
      let mut slots = self.slots.lock();
      slots
        .entry(key.to_owned())
        .or_insert_with(|| Arc::new(OnceCell::new()))
        .clone()
    };
    // The factory runs outside the map lock so it can resolve other abstractions.
    slot.get_or_init(|| factory.invoke()).clone()
  }

  fn evict(&self, key: Option<&str>) {
    let mut slots = self.slots.lock();
    match key {
      Some(key) => {
        slots.remove(key);
      }
      None => slots.clear(),
    }
  }

  /// A cache sharing every slot except those of `replaced`, which start empty.
  fn fork<'a>(&self, replaced: impl IntoIterator<Item = &'a String>) -> Self {
    let mut slots = self.slots.lock().clone();
    for key in replaced {
      slots.remove(key);
    }
    Self {
      slots: Mutex::new(slots),
    }
  }

  fn is_cached(&self, key: &str) -> bool {
    self
      .slots
      .lock()
      .get(key)
      .map_or(false, |slot| slot.get().is_some())
  }
}

/// The factories registered for one abstraction inside one context.
///
/// A registry is an immutable snapshot: the factory map and current key never
/// change after construction. Updates go through [`ImplementationRegistry::copy_with`],
/// which builds a replacement that shares the singleton slots of untouched keys.
#[derive(Clone)]
pub(crate) struct ImplementationRegistry {
  current_key: String,
  factories: Arc<HashMap<String, Factory>>,
  singletons: Arc<SingletonCache>,
}

impl ImplementationRegistry {
  pub(crate) fn new(current_key: String, factories: HashMap<String, Factory>) -> Self {
    Self {
      current_key,
      factories: Arc::new(factories),
      singletons: Arc::new(SingletonCache::default()),
    }
  }

  pub(crate) fn current_key(&self) -> &str {
    &self.current_key
  }

  pub(crate) fn contains_key(&self, key: &str) -> bool {
    self.factories.contains_key(key)
  }

  pub(crate) fn keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.factories.keys().cloned().collect();
    keys.sort();
    keys
  }

  /// The key a lookup with the given constraint resolves to.
  pub(crate) fn resolve_key<'a>(&'a self, constraint_key: Option<&'a str>) -> &'a str {
    constraint_key.unwrap_or(self.current_key.as_str())
  }

  /// Invokes (or reuses, for singletons) the factory selected by
  /// `constraint_key`, falling back to the current key.
  ///
  /// Returns `None` both when the key has no factory and when the factory
  /// produced nothing; callers distinguish the two with [`Self::contains_key`].
  pub(crate) fn get(&self, lifetime: Lifetime, constraint_key: Option<&str>) -> Option<Instance> {
    let key = self.resolve_key(constraint_key);
    let factory = self.factories.get(key)?;
    match lifetime {
      Lifetime::Regular => factory.invoke(),
      Lifetime::Singleton => self.singletons.get_or_init(key, factory),
    }
  }

  /// Evicts the cached singleton for `key`, or every cached singleton when
  /// `key` is `None`. Idempotent.
  pub(crate) fn remove_singleton(&self, key: Option<&str>) {
    self.singletons.evict(key);
  }

  pub(crate) fn is_singleton_cached(&self, key: &str) -> bool {
    self.singletons.is_cached(key)
  }

  /// Builds a replacement whose factories are the union of the current ones
  /// and `factories` (new entries win).
  ///
  /// Cached singletons of untouched keys are carried over. Keys present in
  /// `factories` start uncached in the replacement, and lookups still running
  /// against this snapshot can never fill the replacement's slots for them.
  pub(crate) fn copy_with(
    &self,
    current_key: Option<String>,
    factories: HashMap<String, Factory>,
  ) -> Self {
    let (merged, singletons) = if factories.is_empty() {
      (self.factories.clone(), self.singletons.clone())
    } else {
      let singletons = Arc::new(self.singletons.fork(factories.keys()));
      let mut merged = (*self.factories).clone();
      merged.extend(factories);
      (Arc::new(merged), singletons)
    };
    Self {
      current_key: current_key.unwrap_or_else(|| self.current_key.clone()),
      factories: merged,
      singletons,
    }
  }
}

impl fmt::Debug for ImplementationRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ImplementationRegistry")
      .field("current_key", &self.current_key)
      .field("keys", &self.keys())
      .finish()
  }
}
