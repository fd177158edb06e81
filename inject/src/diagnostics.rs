//! Diagnostic emission and the process-wide logger switch.
//!
//! Diagnostics are plain `tracing` events under the `fibre_inject` target. The
//! crate never installs a subscriber; whatever the application configured
//! receives them. The switch only decides whether an event is emitted at all,
//! it never changes how resolution behaves.

use crate::error::InjectionError;

use std::sync::atomic::{AtomicU8, Ordering};

/// The `tracing` target every diagnostic is emitted under.
pub const TARGET: &str = "fibre_inject";

const STATE_ON: u8 = 0;
const STATE_MUTED: u8 = 1;
const STATE_FORCED_OFF: u8 = 2;

static LOGGER_STATE: AtomicU8 = AtomicU8::new(STATE_ON);

/// What the logger switch currently lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
  /// Every diagnostic is emitted.
  On,
  /// Only contract violations (cast failures, broken registration state) are emitted.
  Muted,
  /// Nothing is emitted.
  ForcedOff,
}

/// Re-enables all diagnostics.
pub fn turn_on_logger() {
  LOGGER_STATE.store(STATE_ON, Ordering::Release);
}

/// Silences diagnostics.
///
/// Without `forced`, contract violations such as
/// [`InjectionError::ImplementationsCouldNotBeCasted`] are still reported.
/// With `forced`, nothing is emitted until [`turn_on_logger`] is called.
pub fn turn_off_logger(forced: bool) {
  let state = if forced { STATE_FORCED_OFF } else { STATE_MUTED };
  LOGGER_STATE.store(state, Ordering::Release);
}

pub fn logger_state() -> LoggerState {
  match LOGGER_STATE.load(Ordering::Acquire) {
    STATE_ON => LoggerState::On,
    STATE_MUTED => LoggerState::Muted,
    _ => LoggerState::ForcedOff,
  }
}

/// Whether informational tracing (successful registrations, removals) is emitted.
pub(crate) fn verbose() -> bool {
  logger_state() == LoggerState::On
}

/// Surfaces an absorbed error as a diagnostic event.
pub(crate) fn report(err: &InjectionError) {
  match logger_state() {
    LoggerState::ForcedOff => return,
    LoggerState::Muted if !err.is_contract_violation() => return,
    _ => {}
  }

  match err {
    InjectionError::ImplementationsCouldNotBeCasted { .. }
    | InjectionError::UndefinedRegistrationType { .. }
    | InjectionError::ForcedInjectionFail { .. } => {
      tracing::error!(target: TARGET, kind = err.kind(), abstraction = err.abstraction(), "{}", err);
    }
    InjectionError::NoImplementationFoundOnInjection { location, .. } => {
      tracing::debug!(
        target: TARGET,
        kind = err.kind(),
        abstraction = err.abstraction(),
        location = location.as_str(),
        "{}",
        err
      );
    }
    _ => {
      tracing::warn!(target: TARGET, kind = err.kind(), abstraction = err.abstraction(), "{}", err);
    }
  }
}

/// Reports the error of a fallible internal operation and discards it.
pub(crate) fn absorb<T>(result: crate::Result<T>) -> Option<T> {
  match result {
    Ok(value) => Some(value),
    Err(err) => {
      report(&err);
      None
    }
  }
}
