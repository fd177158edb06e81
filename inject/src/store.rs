//! A string-keyed map that is safe under concurrent reads and writes.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;

/// The storage every higher layer is built on.
///
/// Each operation is applied atomically with respect to the key it touches.
/// Values are handed out by clone (callers store `Arc`s), so no caller code
/// ever runs while a shard lock is held, with the exception of the closures
/// passed to [`ConcurrentStore::compute`] and
/// [`ConcurrentStore::get_or_insert_with`], which must stay short.
pub struct ConcurrentStore<V> {
  entries: DashMap<String, V>,
}

impl<V> Default for ConcurrentStore<V> {
  fn default() -> Self {
    Self {
      entries: DashMap::new(),
    }
  }
}

impl<V> fmt::Debug for ConcurrentStore<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConcurrentStore")
      .field("count", &self.entries.len())
      .finish()
  }
}

impl<V: Clone> ConcurrentStore<V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns a clone of the value under `key`, or `None` if absent.
  pub fn get(&self, key: &str) -> Option<V> {
    self.entries.get(key).map(|entry| entry.value().clone())
  }

  /// Stores `value` under `key`, returning the value it replaced.
  pub fn set(&self, key: impl Into<String>, value: V) -> Option<V> {
    self.entries.insert(key.into(), value)
  }

  /// Removes `key`, returning the value it held.
  pub fn remove(&self, key: &str) -> Option<V> {
    self.entries.remove(key).map(|(_, value)| value)
  }

  pub fn remove_all(&self) {
    self.entries.clear();
  }

  /// Removes `key` only if `predicate` holds for its value. The check and the
  /// removal happen under the same entry lock.
  pub fn remove_if(&self, key: &str, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
    self
      .entries
      .remove_if(key, |_, value| predicate(value))
      .map(|(_, value)| value)
  }

  /// Removes every entry and returns what was stored.
  pub fn drain(&self) -> Vec<(String, V)> {
    let keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
    keys
      .into_iter()
      .filter_map(|key| self.entries.remove(&key))
      .collect()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn count(&self) -> usize {
    self.entries.len()
  }

  /// Visits a snapshot of every entry. The callback runs without any lock held.
  pub fn for_each(&self, mut f: impl FnMut(&str, &V)) {
    let snapshot: Vec<(String, V)> = self
      .entries
      .iter()
      .map(|entry| (entry.key().clone(), entry.value().clone()))
      .collect();
    for (key, value) in &snapshot {
      f(key, value);
    }
  }

  /// Returns the value under `key`, inserting `make()` first if the key is absent.
  ///
  /// Two racing callers always observe the same value.
  pub fn get_or_insert_with(&self, key: &str, make: impl FnOnce() -> V) -> V {
    if let Some(existing) = self.get(key) {
      return existing;
    }
    self
      .entries
      .entry(key.to_owned())
      .or_insert_with(make)
      .value()
      .clone()
  }

  /// Runs `f` on the value under `key`, inserting `make()` first if absent.
  ///
  /// The entry stays locked while `f` runs, so [`Self::remove_if`] on the same
  /// key never interleaves with it.
  pub fn with_entry<R>(&self, key: &str, make: impl FnOnce() -> V, f: impl FnOnce(&V) -> R) -> R {
    let entry = self.entries.entry(key.to_owned()).or_insert_with(make);
    f(entry.value())
  }

  /// Atomic read-modify-write of a single key.
  ///
  /// `f` sees the current value (if any) and decides the replacement. Returning
  /// an error leaves the entry untouched.
  pub fn compute<E>(
    &self,
    key: &str,
    f: impl FnOnce(Option<&V>) -> Result<V, E>,
  ) -> Result<V, E> {
    match self.entries.entry(key.to_owned()) {
      Entry::Occupied(mut occupied) => {
        let next = f(Some(occupied.get()))?;
        occupied.insert(next.clone());
        Ok(next)
      }
      Entry::Vacant(vacant) => {
        let next = f(None)?;
        vacant.insert(next.clone());
        Ok(next)
      }
    }
  }
}
