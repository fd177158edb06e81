//! Change notification for observed injection.
//!
//! Each observed abstraction in a context owns one [`ObserverHub`]. Observed
//! wrappers subscribe to it; the dependency manager publishes to it whenever
//! the current implementation changes or the abstraction disappears. A hub
//! lives only as long as it has subscribers.

use crate::error::InjectionError;
use crate::factory::{Instance, Lifetime};
use crate::store::ConcurrentStore;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one subscription, used to address targeted deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
  pub(crate) fn next() -> Self {
    Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl fmt::Display for SubscriberId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "subscriber-{}", self.0)
  }
}

/// What an observer receives.
#[derive(Debug, Clone)]
pub enum ObservedEvent {
  /// A freshly resolved value. `target` is `None` for broadcasts.
  Value {
    target: Option<SubscriberId>,
    instance: Option<Instance>,
  },
  /// The stream can no longer produce values; observers drop what they hold.
  Failed(InjectionError),
}

impl ObservedEvent {
  /// Whether a subscriber with `id` should accept this event.
  pub fn is_for(&self, id: SubscriberId) -> bool {
    match self {
      ObservedEvent::Value { target, .. } => target.map_or(true, |target| target == id),
      ObservedEvent::Failed(_) => true,
    }
  }
}

pub(crate) type Sink = Arc<dyn Fn(ObservedEvent) + Send + Sync>;

/// The hubs of one dependency manager, keyed by abstraction identity.
pub(crate) type Hubs = ConcurrentStore<Arc<ObserverHub>>;

/// A subscriber along with how it wants its values resolved.
#[derive(Clone)]
pub(crate) struct Subscriber {
  pub(crate) id: SubscriberId,
  pub(crate) lifetime: Lifetime,
  pub(crate) constraint_key: Option<String>,
  pub(crate) sink: Sink,
}

#[derive(Default)]
pub(crate) struct ObserverHub {
  subscribers: Mutex<Vec<Subscriber>>,
  // Held from reading the registry until the last sink returns. Reentrant so a
  // factory running inside a delivery may publish to the same hub.
  delivery: ReentrantMutex<()>,
}

impl ObserverHub {
  /// Adds `subscriber` to the hub of `identity`, creating the hub if needed.
  pub(crate) fn subscribe(hubs: &Arc<Hubs>, identity: &str, subscriber: Subscriber) -> Subscription {
    let id = subscriber.id;
    // Pushed under the entry lock so a concurrent removal of an empty hub
    // cannot drop the subscriber with it.
    hubs.with_entry(
      identity,
      || Arc::new(ObserverHub::default()),
      |hub| hub.subscribers.lock().push(subscriber),
    );
    Subscription {
      id,
      identity: identity.to_owned(),
      hubs: Arc::downgrade(hubs),
    }
  }

  fn unsubscribe(&self, id: SubscriberId) {
    self.subscribers.lock().retain(|subscriber| subscriber.id != id);
  }

  pub(crate) fn len(&self) -> usize {
    self.subscribers.lock().len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Serializes deliveries. Every publish holds this guard from the moment it
  /// reads the registry until its sinks have run, so the last value a
  /// subscriber receives reflects the latest registry state.
  pub(crate) fn delivery(&self) -> ReentrantMutexGuard<'_, ()> {
    self.delivery.lock()
  }

  /// The subscribers a publish addressed to `target` reaches, copied out so
  /// sinks run without the subscriber lock held.
  pub(crate) fn recipients(&self, target: Option<SubscriberId>) -> Vec<Subscriber> {
    self
      .subscribers
      .lock()
      .iter()
      .filter(|subscriber| target.map_or(true, |target| target == subscriber.id))
      .cloned()
      .collect()
  }

  /// Delivers a completion-with-error to every subscriber.
  pub(crate) fn fail_all(&self, error: &InjectionError) {
    let _delivery = self.delivery();
    for subscriber in self.recipients(None) {
      (subscriber.sink)(ObservedEvent::Failed(error.clone()));
    }
  }
}

/// Keeps a subscription alive; dropping it unsubscribes.
///
/// The hub is discarded together with its last subscription.
pub struct Subscription {
  id: SubscriberId,
  identity: String,
  hubs: Weak<Hubs>,
}

impl Subscription {
  pub fn id(&self) -> SubscriberId {
    self.id
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("id", &self.id)
      .field("abstraction", &self.identity)
      .finish()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let Some(hubs) = self.hubs.upgrade() else {
      return;
    };
    if let Some(hub) = hubs.get(&self.identity) {
      hub.unsubscribe(self.id);
    }
    hubs.remove_if(&self.identity, |hub| hub.is_empty());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const IDENTITY: &str = "observer.tests.A";

  fn subscriber(id: SubscriberId, log: Arc<Mutex<Vec<String>>>) -> Subscriber {
    Subscriber {
      id,
      lifetime: Lifetime::Regular,
      constraint_key: None,
      sink: Arc::new(move |event: ObservedEvent| {
        let entry = match event {
          ObservedEvent::Value { .. } => format!("{} value", id),
          ObservedEvent::Failed(err) => format!("{} {}", id, err.kind()),
        };
        log.lock().push(entry);
      }),
    }
  }

  fn hub(hubs: &Hubs) -> Arc<ObserverHub> {
    hubs.get(IDENTITY).unwrap()
  }

  #[test]
  fn targeted_recipients_only_match_id() {
    let hubs = Arc::new(Hubs::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let (a, b) = (SubscriberId::next(), SubscriberId::next());
    let _sa = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(a, log.clone()));
    let _sb = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(b, log.clone()));

    let hub = hub(&hubs);
    assert_eq!(hub.recipients(Some(b)).len(), 1);
    assert_eq!(hub.recipients(Some(b))[0].id, b);
    assert_eq!(hub.recipients(None).len(), 2);
  }

  #[test]
  fn last_subscription_drops_the_hub() {
    let hubs = Arc::new(Hubs::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(SubscriberId::next(), log.clone()));
    let second = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(SubscriberId::next(), log));
    assert_eq!(hub(&hubs).len(), 2);

    drop(first);
    assert_eq!(hub(&hubs).len(), 1);
    drop(second);
    assert!(!hubs.contains(IDENTITY));
    assert_eq!(hubs.count(), 0);
  }

  #[test]
  fn subscription_outliving_its_hubs_is_harmless() {
    let hubs = Arc::new(Hubs::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let subscription = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(SubscriberId::next(), log));
    drop(hubs);
    drop(subscription);
  }

  #[test]
  fn fail_all_reaches_everyone() {
    let hubs = Arc::new(Hubs::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let _s1 = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(SubscriberId::next(), log.clone()));
    let _s2 = ObserverHub::subscribe(&hubs, IDENTITY, subscriber(SubscriberId::next(), log.clone()));
    hub(&hubs).fail_all(&InjectionError::NotAbstractionFound {
      abstraction: "A".into(),
      context: "global".into(),
    });
    let log = log.lock();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.ends_with("NotAbstractionFound")));
  }

  #[test]
  fn delivery_guard_is_reentrant() {
    let hub = ObserverHub::default();
    let _outer = hub.delivery();
    let _inner = hub.delivery();
  }

  #[test]
  fn event_addressing() {
    let me = SubscriberId::next();
    let other = SubscriberId::next();
    let broadcast = ObservedEvent::Value { target: None, instance: None };
    let targeted = ObservedEvent::Value { target: Some(other), instance: None };
    assert!(broadcast.is_for(me));
    assert!(!targeted.is_for(me));
    assert!(targeted.is_for(other));
  }
}
