#![allow(dead_code)]

use fibre_inject::{Abstraction, ContextManager, Factory};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};
use tracing_subscriber::Registry;

// --- Fixtures ---

pub trait Repository: Send + Sync {
  fn origin(&self) -> &'static str;
}

impl Abstraction for dyn Repository {
  const IDENTITY: &'static str = "fixtures.Repository";
}

pub struct LocalRepo;
impl Repository for LocalRepo {
  fn origin(&self) -> &'static str {
    "local"
  }
}

pub struct RemoteRepo;
impl Repository for RemoteRepo {
  fn origin(&self) -> &'static str {
    "remote"
  }
}

pub fn local_repo() -> Factory {
  Factory::from_fn(|| Arc::new(LocalRepo) as Arc<dyn Repository>)
}

pub fn remote_repo() -> Factory {
  Factory::from_fn(|| Arc::new(RemoteRepo) as Arc<dyn Repository>)
}

/// A concrete abstraction whose factory counts its invocations.
pub struct Ticket(pub usize);

impl Abstraction for Ticket {
  const IDENTITY: &'static str = "fixtures.Ticket";
}

pub fn counting_tickets() -> (Factory, Arc<AtomicUsize>) {
  let calls = Arc::new(AtomicUsize::new(0));
  let calls_in_factory = calls.clone();
  let factory = Factory::from_fn(move || {
    Arc::new(Ticket(calls_in_factory.fetch_add(1, Ordering::SeqCst)))
  });
  (factory, calls)
}

pub fn fresh_manager() -> Arc<ContextManager> {
  Arc::new(ContextManager::new())
}

// --- Diagnostic capture ---

/// The `kind` and `location` fields of every `fibre_inject` diagnostic seen
/// while capturing.
#[derive(Clone, Default)]
pub struct Captured {
  kinds: Arc<Mutex<Vec<String>>>,
  locations: Arc<Mutex<Vec<String>>>,
}

impl Captured {
  pub fn count(&self, kind: &str) -> usize {
    self.kinds.lock().unwrap().iter().filter(|k| *k == kind).count()
  }

  pub fn kinds(&self) -> Vec<String> {
    self.kinds.lock().unwrap().clone()
  }

  /// Locations, for the events that carry one.
  pub fn locations(&self) -> Vec<String> {
    self.locations.lock().unwrap().clone()
  }

  pub fn is_empty(&self) -> bool {
    self.kinds.lock().unwrap().is_empty()
  }
}

#[derive(Default)]
struct FieldVisitor {
  kind: Option<String>,
  location: Option<String>,
}

impl FieldVisitor {
  fn slot(&mut self, field: &Field) -> Option<&mut Option<String>> {
    match field.name() {
      "kind" => Some(&mut self.kind),
      "location" => Some(&mut self.location),
      _ => None,
    }
  }
}

impl Visit for FieldVisitor {
  fn record_str(&mut self, field: &Field, value: &str) {
    if let Some(slot) = self.slot(field) {
      *slot = Some(value.to_string());
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
    if let Some(slot) = self.slot(field) {
      if slot.is_none() {
        *slot = Some(format!("{:?}", value).trim_matches('"').to_string());
      }
    }
  }
}

struct CaptureLayer {
  captured: Captured,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
  fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
    if event.metadata().target() != fibre_inject::TARGET {
      return;
    }
    let mut fields = FieldVisitor::default();
    event.record(&mut fields);
    if let Some(kind) = fields.kind {
      self.captured.kinds.lock().unwrap().push(kind);
    }
    if let Some(location) = fields.location {
      self.captured.locations.lock().unwrap().push(location);
    }
  }
}

/// Runs `f` with a subscriber that records diagnostics emitted on this thread.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Captured) {
  let captured = Captured::default();
  let subscriber = Registry::default().with(CaptureLayer {
    captured: captured.clone(),
  });
  let result = tracing::subscriber::with_default(subscriber, f);
  (result, captured)
}
