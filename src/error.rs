//! Error taxonomy for lookup resolution and container bootstrap.

use thiserror::Error;

/// Failures surfaced to callers performing bean lookups.
///
/// These are user-facing resolution outcomes, not internal faults, and they
/// are never silently defaulted: a lookup either yields a definition or one
/// of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
  /// No registered definition matched the requested type and qualifiers.
  #[error("no matching bean instances for: {type_name}")]
  NotFound {
    /// Name of the requested contract type.
    type_name: String,
  },

  /// More than one definition survived qualifier matching and the
  /// concreteness tie-break.
  #[error("multiple matching bean instances for: {type_name} matches: {candidates:?}")]
  Ambiguous {
    /// Name of the requested contract type.
    type_name: String,
    /// Implementation type names of the surviving candidates.
    candidates: Vec<String>,
  },
}

/// Fatal failures raised while assembling or loading the wiring program.
///
/// No partial-bootstrap state is considered safe: any of these aborts
/// container startup.
#[derive(Debug, Error)]
pub enum BootstrapError {
  /// An extension configurator or code decorator failed its structural
  /// contract.
  #[error("unable to load extension: {0}")]
  InvalidExtension(String),

  /// A type carries a bootstrap-task marker but no runnable payload.
  #[error("bootstrap task {0} is not runnable")]
  MalformedRole(String),

  /// The code emitter rejected the wiring program.
  #[error("wiring program emission failed: {0}")]
  EmitFailure(String),
}
