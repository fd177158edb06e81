use super::{InjectionBuilder, Target};
use crate::context::Context;
use crate::diagnostics::report;
use crate::factory::{Abstraction, AbstractionId};
use crate::manager::{cast, DependencyManager};
use crate::observer::{ObservedEvent, Sink, SubscriberId, Subscription};

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// The delivered value, tagged with the binding that delivered it.
struct State<A: ?Sized> {
  generation: u64,
  value: Option<Arc<A>>,
}

type Slot<A> = Mutex<State<A>>;

/// The manager a wrapper currently listens to.
struct Binding {
  dependencies: Arc<DependencyManager>,
  _subscription: Subscription,
}

/// An injection of `A` that follows the abstraction's current implementation.
///
/// The wrapper subscribes to `A`'s change stream in its context when built.
/// Selecting another implementation, re-registering it in a test context, or
/// removing the abstraction replaces the value it hands out. When the context
/// itself is replaced or destroyed, the wrapper moves to the context's live
/// manager on the next read. Dropping the wrapper ends the subscription.
pub struct ObservedInjected<A: Abstraction + ?Sized> {
  id: SubscriberId,
  target: Target,
  slot: Arc<Slot<A>>,
  binding: Mutex<Binding>,
}

impl<A: Abstraction + ?Sized> ObservedInjected<A> {
  #[track_caller]
  pub fn builder() -> InjectionBuilder<A> {
    InjectionBuilder::new()
  }

  pub(crate) fn new(target: Target) -> Self {
    let id = SubscriberId::next();
    let slot: Arc<Slot<A>> = Arc::new(Mutex::new(State {
      generation: 0,
      value: None,
    }));
    let dependencies = target.dependencies();
    let binding = attach::<A>(id, &target, &slot, 0, dependencies.clone());

    let observed = Self {
      id,
      target,
      slot,
      binding: Mutex::new(binding),
    };
    dependencies.request_publish::<A>(Some(id));
    observed
  }

  /// The latest delivered value.
  ///
  /// When nothing has been delivered yet, a fresh delivery is requested first,
  /// which covers subscriptions made before the abstraction was registered.
  pub fn unwrap_value(&self) -> Option<Arc<A>> {
    let dependencies = self.rebind();
    if self.slot.lock().value.is_none() {
      dependencies.request_publish::<A>(Some(self.id));
    }
    let value = self.slot.lock().value.clone();
    if value.is_none() {
      self.target.report_missing::<A>();
    }
    value
  }

  pub fn subscriber_id(&self) -> SubscriberId {
    self.id
  }

  pub fn context(&self) -> &Context {
    &self.target.context
  }

  /// Moves the subscription to the context's live manager if it changed.
  ///
  /// Bumping the generation discards whatever the old manager still delivers.
  fn rebind(&self) -> Arc<DependencyManager> {
    let live = self.target.dependencies();
    let mut binding = self.binding.lock();
    if Arc::ptr_eq(&binding.dependencies, &live) {
      return live;
    }
    let generation = {
      let mut state = self.slot.lock();
      state.generation += 1;
      state.value = None;
      state.generation
    };
    *binding = attach::<A>(self.id, &self.target, &self.slot, generation, live.clone());
    live
  }
}

fn attach<A: Abstraction + ?Sized>(
  id: SubscriberId,
  target: &Target,
  slot: &Arc<Slot<A>>,
  generation: u64,
  dependencies: Arc<DependencyManager>,
) -> Binding {
  let sink = sink_for::<A>(id, Arc::downgrade(slot), generation, target.key.clone());
  let subscription = dependencies.subscribe::<A>(id, target.lifetime, target.key.clone(), sink);
  Binding {
    dependencies,
    _subscription: subscription,
  }
}

fn sink_for<A: Abstraction + ?Sized>(
  id: SubscriberId,
  slot: Weak<Slot<A>>,
  generation: u64,
  key: Option<String>,
) -> Sink {
  Arc::new(move |event: ObservedEvent| {
    let Some(slot) = slot.upgrade() else {
      return;
    };
    if !event.is_for(id) {
      return;
    }
    let value = match event {
      ObservedEvent::Value { instance, .. } => instance.and_then(|instance| {
        let key = key.as_deref().unwrap_or("<current>");
        match cast::<A>(&AbstractionId::of::<A>(), key, &instance) {
          Ok(value) => Some(value),
          Err(err) => {
            report(&err);
            None
          }
        }
      }),
      ObservedEvent::Failed(err) => {
        report(&err);
        None
      }
    };
    let mut state = slot.lock();
    if state.generation == generation {
      state.value = value;
    }
  })
}

impl<A: Abstraction + ?Sized> fmt::Debug for ObservedInjected<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.slot.lock();
    f.debug_struct("ObservedInjected")
      .field("abstraction", &A::IDENTITY)
      .field("id", &self.id)
      .field("target", &self.target)
      .field("generation", &state.generation)
      .field("has_value", &state.value.is_some())
      .finish()
  }
}
