use thiserror::Error;

/// Every condition the container can detect while registering or resolving.
///
/// All variants except [`InjectionError::ForcedInjectionFail`] are absorbed by the
/// layer that detects them and surfaced only as a diagnostic. Callers observe
/// them solely as "no value came back".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectionError {
  #[error("abstraction '{abstraction}' is already registered in context '{context}'")]
  AbstractionAlreadyRegistered { abstraction: String, context: String },

  #[error("abstraction '{abstraction}' must be registered in context '{context}' before implementations can be added")]
  AbstractionNotFoundForUpdate { abstraction: String, context: String },

  #[error("abstraction '{abstraction}' is not registered in context '{context}'")]
  NotAbstractionFound { abstraction: String, context: String },

  #[error("implementation '{key}' of '{abstraction}' could not be cast to the requested abstraction")]
  ImplementationsCouldNotBeCasted { abstraction: String, key: String },

  #[error("undefined registration type for abstraction '{abstraction}' in context '{context}'")]
  UndefinedRegistrationType { abstraction: String, context: String },

  #[error("abstraction '{abstraction}' has no implementation registered under key '{key}'")]
  UnknownImplementationKey { abstraction: String, key: String },

  #[error("no implementation found for '{abstraction}' injected at {location}")]
  NoImplementationFoundOnInjection { abstraction: String, location: String },

  #[error("forced injection of '{abstraction}' at {location} found no implementation")]
  ForcedInjectionFail { abstraction: String, location: String },
}

impl InjectionError {
  /// The stable name of the variant, recorded as the `kind` field of diagnostics.
  pub fn kind(&self) -> &'static str {
    match self {
      InjectionError::AbstractionAlreadyRegistered { .. } => "AbstractionAlreadyRegistered",
      InjectionError::AbstractionNotFoundForUpdate { .. } => "AbstractionNotFoundForUpdate",
      InjectionError::NotAbstractionFound { .. } => "NotAbstractionFound",
      InjectionError::ImplementationsCouldNotBeCasted { .. } => "ImplementationsCouldNotBeCasted",
      InjectionError::UndefinedRegistrationType { .. } => "UndefinedRegistrationType",
      InjectionError::UnknownImplementationKey { .. } => "UnknownImplementationKey",
      InjectionError::NoImplementationFoundOnInjection { .. } => "NoImplementationFoundOnInjection",
      InjectionError::ForcedInjectionFail { .. } => "ForcedInjectionFail",
    }
  }

  /// The identity of the abstraction the error refers to.
  pub fn abstraction(&self) -> &str {
    match self {
      InjectionError::AbstractionAlreadyRegistered { abstraction, .. }
      | InjectionError::AbstractionNotFoundForUpdate { abstraction, .. }
      | InjectionError::NotAbstractionFound { abstraction, .. }
      | InjectionError::ImplementationsCouldNotBeCasted { abstraction, .. }
      | InjectionError::UndefinedRegistrationType { abstraction, .. }
      | InjectionError::UnknownImplementationKey { abstraction, .. }
      | InjectionError::NoImplementationFoundOnInjection { abstraction, .. }
      | InjectionError::ForcedInjectionFail { abstraction, .. } => abstraction,
    }
  }

  /// Whether the error signals a caller-contract violation rather than a
  /// rejected or empty operation.
  pub(crate) fn is_contract_violation(&self) -> bool {
    matches!(
      self,
      InjectionError::ImplementationsCouldNotBeCasted { .. }
        | InjectionError::UndefinedRegistrationType { .. }
        | InjectionError::ForcedInjectionFail { .. }
    )
  }
}

/// A specialized `Result` type for `fibre_inject` operations.
pub type Result<T, E = InjectionError> = std::result::Result<T, E>;
