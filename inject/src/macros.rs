//! Public macros for ergonomic resolution from the process-wide default manager.

/// Resolves an abstraction from the global context, returning an `Option`.
///
/// The call site is recorded as the injection location, so a miss is
/// reported against the line that asked for the dependency.
///
/// # Examples
///
/// ```
/// use fibre_inject::{inject, Abstraction, Factory, Injector};
/// use std::sync::Arc;
///
/// struct Settings {
///   verbose: bool,
/// }
/// impl Abstraction for Settings {
///   const IDENTITY: &'static str = "docs.macros.Settings";
/// }
///
/// Injector::global().register_single::<Settings>(
///   "default",
///   Factory::from_fn(|| Arc::new(Settings { verbose: true })),
/// );
///
/// let settings = inject!(Settings).unwrap();
/// assert!(settings.verbose);
/// assert!(inject!(Settings, "missing").is_none());
/// ```
#[macro_export]
macro_rules! inject {
  // Arm for the current implementation: inject!(dyn MyTrait)
  ($type:ty) => {
    $crate::Injected::<$type>::builder().build().unwrap_value()
  };

  // Arm for a specific implementation key: inject!(dyn MyTrait, "key")
  ($type:ty, $key:expr) => {
    $crate::Injected::<$type>::builder()
      .key($key)
      .build()
      .unwrap_value()
  };
}

/// Resolves an abstraction from the global context and panics if nothing is
/// registered for it.
///
/// # Panics
///
/// Panics with a `ForcedInjectionFail` message naming the abstraction and the
/// call site. For a non-panicking version, use [`inject!`].
///
/// ```should_panic
/// use fibre_inject::{inject_forced, Abstraction};
///
/// struct Unregistered;
/// impl Abstraction for Unregistered {
///   const IDENTITY: &'static str = "docs.macros.Unregistered";
/// }
///
/// inject_forced!(Unregistered);
/// ```
#[macro_export]
macro_rules! inject_forced {
  ($type:ty) => {
    $crate::ForcedInjected::<$type>::builder()
      .build_forced()
      .value()
  };

  ($type:ty, $key:expr) => {
    $crate::ForcedInjected::<$type>::builder()
      .key($key)
      .build_forced()
      .value()
  };
}
