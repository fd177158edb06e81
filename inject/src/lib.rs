//! # Fibre Inject
//!
//! A context-aware, thread-safe runtime dependency injection container.
//!
//! Abstractions (usually trait objects) are registered with one or more keyed
//! factories. One key is *current* and serves lookups that do not ask for a
//! specific implementation. Registrations live in isolated *contexts*, so test
//! suites can register their own implementations without touching the
//! application's global context.
//!
//! ## Core Concepts
//!
//! - **Abstraction**: a contract with a stable identity, see [`Abstraction`].
//! - **Factory**: a keyed producer of instances, see [`Factory`].
//! - **Lifetime**: [`Lifetime::Regular`] builds a fresh instance per lookup,
//!   [`Lifetime::Singleton`] caches one per implementation key.
//! - **Context**: an isolated namespace, see [`Context`] and [`ContextManager`].
//! - **Injector**: the facade for one context, see [`Injector`].
//! - **Wrappers**: [`Injected`] (lazy or eager, optional), [`ForcedInjected`]
//!   (panics on a miss) and [`ObservedInjected`] (follows the current key).
//!
//! Misses and rejected registrations never surface as errors. They are
//! reported as `tracing` events under the `fibre_inject` target; see
//! [`turn_off_logger`] to silence them.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_inject::{Abstraction, Factory, Injector, Lifetime};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! impl Abstraction for dyn Greeter {
//!   const IDENTITY: &'static str = "quickstart.Greeter";
//! }
//!
//! struct English;
//! impl Greeter for English {
//!   fn greet(&self) -> String {
//!     "Hello!".to_string()
//!   }
//! }
//!
//! struct German;
//! impl Greeter for German {
//!   fn greet(&self) -> String {
//!     "Hallo!".to_string()
//!   }
//! }
//!
//! let injector = Injector::global();
//! injector.register::<dyn Greeter, _, _>(
//!   "english",
//!   [
//!     ("english", Factory::from_fn(|| Arc::new(English) as Arc<dyn Greeter>)),
//!     ("german", Factory::from_fn(|| Arc::new(German) as Arc<dyn Greeter>)),
//!   ],
//! );
//!
//! let greeter = injector.get::<dyn Greeter>(Lifetime::Singleton, None).unwrap();
//! assert_eq!(greeter.greet(), "Hello!");
//!
//! let observed = injector.inject::<dyn Greeter>().build_observed();
//! injector.select::<dyn Greeter>("german");
//! assert_eq!(observed.unwrap_value().unwrap().greet(), "Hallo!");
//! ```

mod context;
mod diagnostics;
mod error;
mod factory;
pub mod global;
mod injector;
mod location;
mod macros;
mod manager;
mod observer;
mod registry;
mod store;
mod wrappers;

pub use context::{Context, ContextManager, ContextManagerBuilder, ExecutionMode, MODE_ENV_VAR};
pub use diagnostics::{logger_state, turn_off_logger, turn_on_logger, LoggerState, TARGET};
pub use error::{InjectionError, Result};
pub use factory::{downcast_instance, Abstraction, AbstractionId, Factory, Instance, Lifetime};
pub use injector::Injector;
pub use location::SourceLocation;
pub use manager::DependencyManager;
pub use observer::{ObservedEvent, SubscriberId, Subscription};
pub use store::ConcurrentStore;
pub use wrappers::{
  ForcedInjected, InjectionBuilder, Injected, ObservedInjected, ResolutionState, Timing,
};
