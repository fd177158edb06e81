mod common;

use common::*;
use fibre_inject::{Context, Factory, Injector, Lifetime, Timing};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_observed_follows_select() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  injector.register::<dyn Repository, _, _>(
    "remote",
    [("local", local_repo()), ("remote", remote_repo())],
  );

  let observed = injector.inject::<dyn Repository>().build_observed();
  let plain = injector.inject::<dyn Repository>().build();
  assert_eq!(observed.unwrap_value().unwrap().origin(), "remote");
  assert_eq!(plain.unwrap_value().unwrap().origin(), "remote");

  injector.select::<dyn Repository>("local");
  assert_eq!(observed.unwrap_value().unwrap().origin(), "local");
  // A regular injection keeps what it resolved first.
  assert_eq!(plain.unwrap_value().unwrap().origin(), "remote");
}

#[test]
fn test_observed_value_is_stable_between_changes() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  injector.register_single::<Ticket>("main", counting_tickets().0);

  let observed = injector.inject::<Ticket>().build_observed();
  let first = observed.unwrap_value().unwrap();
  let again = observed.unwrap_value().unwrap();
  assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn test_observed_follows_test_context_reregistration() {
  let injector = Injector::with_manager(fresh_manager(), Context::tests("observed.rs"));
  injector.register_single::<dyn Repository>("remote", remote_repo());
  let observed = injector.inject::<dyn Repository>().build_observed();
  assert_eq!(observed.unwrap_value().unwrap().origin(), "remote");

  injector.register_single::<dyn Repository>("local", local_repo());
  assert_eq!(observed.unwrap_value().unwrap().origin(), "local");
}

#[test]
fn test_observed_with_key_ignores_select() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  injector.register::<dyn Repository, _, _>(
    "remote",
    [("local", local_repo()), ("remote", remote_repo())],
  );

  let pinned = injector
    .inject::<dyn Repository>()
    .key("remote")
    .lifetime(Lifetime::Singleton)
    .build_observed();
  injector.select::<dyn Repository>("local");

  assert_eq!(pinned.unwrap_value().unwrap().origin(), "remote");
}

#[test]
fn test_observers_are_independent() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  injector.register::<dyn Repository, _, _>(
    "remote",
    [("local", local_repo()), ("remote", remote_repo())],
  );

  let follower = injector.inject::<dyn Repository>().build_observed();
  let pinned = injector.inject::<dyn Repository>().key("remote").build_observed();
  assert_ne!(follower.subscriber_id(), pinned.subscriber_id());

  injector.select::<dyn Repository>("local");
  assert_eq!(follower.unwrap_value().unwrap().origin(), "local");
  assert_eq!(pinned.unwrap_value().unwrap().origin(), "remote");
}

#[test]
fn test_observed_before_registration_picks_up_value() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  let observed = injector.inject::<dyn Repository>().build_observed();
  assert!(observed.unwrap_value().is_none());

  injector.register_single::<dyn Repository>("local", local_repo());
  assert_eq!(observed.unwrap_value().unwrap().origin(), "local");
}

#[test]
fn test_remove_and_clear_reset_observers() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  injector.register_single::<dyn Repository>("local", local_repo());
  let observed = injector.inject::<dyn Repository>().build_observed();
  assert!(observed.unwrap_value().is_some());

  injector.remove::<dyn Repository>();
  assert!(observed.unwrap_value().is_none());

  injector.register_single::<dyn Repository>("remote", remote_repo());
  assert_eq!(observed.unwrap_value().unwrap().origin(), "remote");

  injector.clear();
  assert!(observed.unwrap_value().is_none());
}

#[test]
fn test_overlapping_selects_end_on_current_key() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  let slow_local = Factory::from_fn(|| {
    thread::sleep(Duration::from_millis(200));
    Arc::new(LocalRepo) as Arc<dyn Repository>
  });
  injector.register::<dyn Repository, _, _>(
    "remote",
    [("local", slow_local), ("remote", remote_repo())],
  );
  let observed = injector.inject::<dyn Repository>().build_observed();
  assert_eq!(observed.unwrap_value().unwrap().origin(), "remote");

  let barrier = Barrier::new(2);
  thread::scope(|scope| {
    scope.spawn(|| {
      barrier.wait();
      injector.select::<dyn Repository>("local");
    });
    scope.spawn(|| {
      barrier.wait();
      // Lands while the first select is still building its instance.
      thread::sleep(Duration::from_millis(50));
      injector.select::<dyn Repository>("remote");
    });
  });

  let current = injector.current_key::<dyn Repository>().unwrap();
  assert_eq!(observed.unwrap_value().unwrap().origin(), current);
}

#[test]
fn test_observed_survives_context_destroy() {
  let manager = fresh_manager();
  let context = Context::custom("observed.destroy");
  let injector = Injector::with_manager(manager.clone(), context.clone());
  injector.register_single::<dyn Repository>("local", local_repo());
  let observed = injector.inject::<dyn Repository>().build_observed();
  assert_eq!(observed.unwrap_value().unwrap().origin(), "local");

  injector.clone().destroy();
  assert!(observed.unwrap_value().is_none());

  let recreated = Injector::with_manager(manager, context);
  recreated.register_single::<dyn Repository>("remote", remote_repo());
  assert_eq!(observed.unwrap_value().unwrap().origin(), "remote");
  assert_eq!(recreated.dependencies().observer_count::<dyn Repository>(), 1);
}

#[test]
fn test_observed_follows_replaced_context() {
  let manager = fresh_manager();
  let injector = Injector::with_manager(manager.clone(), Context::Global);
  injector.register_single::<dyn Repository>("local", local_repo());
  let observed = injector.inject::<dyn Repository>().build_observed();
  assert!(observed.unwrap_value().is_some());

  let replacement = manager.register(&Context::Global);
  replacement.register_single::<dyn Repository>("remote", remote_repo());
  assert_eq!(observed.unwrap_value().unwrap().origin(), "remote");
}

#[test]
fn test_dropping_observed_unsubscribes() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  injector.register_single::<dyn Repository>("local", local_repo());
  let dependencies = injector.dependencies();

  let first = injector.inject::<dyn Repository>().build_observed();
  let second = injector.inject::<dyn Repository>().build_observed();
  assert_eq!(dependencies.observer_count::<dyn Repository>(), 2);

  drop(first);
  assert_eq!(dependencies.observer_count::<dyn Repository>(), 1);
  drop(second);
  assert_eq!(dependencies.observer_count::<dyn Repository>(), 0);
}

#[test]
fn test_eager_injection_resolves_at_build() {
  let injector = Injector::with_manager(fresh_manager(), Context::Global);
  let (factory, calls) = counting_tickets();
  injector.register_single::<Ticket>("main", factory);

  let lazy = injector.inject::<Ticket>().build();
  assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

  let _eager = injector.inject::<Ticket>().timing(Timing::Eager).build();
  assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

  lazy.unwrap_value();
  lazy.unwrap_value();
  assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}
