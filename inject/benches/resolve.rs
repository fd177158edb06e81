// benches/resolve.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fibre_inject::{Abstraction, Context, ContextManager, Factory, Injected, Injector, Lifetime};
use std::sync::Arc;

trait Clock: Send + Sync {
  fn now(&self) -> u64;
}

impl Abstraction for dyn Clock {
  const IDENTITY: &'static str = "bench.Clock";
}

struct Fixed(u64);

impl Clock for Fixed {
  fn now(&self) -> u64 {
    self.0
  }
}

fn setup() -> Injector {
  let injector = Injector::with_manager(Arc::new(ContextManager::new()), Context::Global);
  injector.register::<dyn Clock, _, _>(
    "system",
    [
      ("system", Factory::from_fn(|| Arc::new(Fixed(1)) as Arc<dyn Clock>)),
      ("frozen", Factory::from_fn(|| Arc::new(Fixed(0)) as Arc<dyn Clock>)),
    ],
  );
  injector
}

fn bench_get(c: &mut Criterion) {
  let injector = setup();
  let mut group = c.benchmark_group("Get");
  group.throughput(Throughput::Elements(1));

  group.bench_function("regular/current_key", |b| {
    b.iter(|| black_box(injector.get::<dyn Clock>(Lifetime::Regular, None).map(|clock| clock.now())))
  });
  group.bench_function("regular/constraint_key", |b| {
    b.iter(|| black_box(injector.get::<dyn Clock>(Lifetime::Regular, Some("frozen"))))
  });
  group.bench_function("singleton/cached", |b| {
    b.iter(|| black_box(injector.get::<dyn Clock>(Lifetime::Singleton, None)))
  });

  group.finish();
}

fn bench_wrappers(c: &mut Criterion) {
  let injector = setup();
  let mut group = c.benchmark_group("Wrappers");

  group.bench_function("injected/build_and_resolve", |b| {
    b.iter(|| {
      let injected: Injected<dyn Clock> = injector.inject::<dyn Clock>().build();
      black_box(injected.unwrap_value())
    })
  });

  let observed = injector.inject::<dyn Clock>().build_observed();
  group.bench_function("observed/read", |b| {
    b.iter(|| black_box(observed.unwrap_value()))
  });

  group.bench_function("observed/select", |b| {
    let mut flip = false;
    b.iter(|| {
      flip = !flip;
      injector.select::<dyn Clock>(if flip { "frozen" } else { "system" });
    })
  });

  group.finish();
}

criterion_group!(benches, bench_get, bench_wrappers);
criterion_main!(benches);
