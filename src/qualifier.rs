//! Qualifying metadata: value-bearing markers used to disambiguate multiple
//! definitions of the same contract type.

use std::collections::BTreeMap;
use std::sync::Arc;

/// A value-bearing marker attached to a bean definition or a lookup request.
///
/// Equality is by value: two qualifiers with the same marker name and the
/// same attribute values compare equal regardless of the order attributes
/// were added in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Qualifier {
  marker: Arc<str>,
  attributes: BTreeMap<String, String>,
}

impl Qualifier {
  /// Creates a qualifier with the given marker name and no attributes.
  pub fn new(marker: impl Into<Arc<str>>) -> Self {
    Self {
      marker: marker.into(),
      attributes: BTreeMap::new(),
    }
  }

  /// Adds an attribute value to this qualifier.
  pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }

  pub fn marker(&self) -> &str {
    &self.marker
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self.attributes.get(key).map(String::as_str)
  }
}

/// Strategy deciding when a requested qualifier is equivalent to a declared
/// one during lookup matching.
///
/// The active strategy is selected at bootstrap through the
/// `weft.ioc.qualifying_metadata_factory` property; see [`metadata_factory`].
pub trait QualifyingMetadata: Send + Sync {
  /// The registered factory name of this strategy.
  fn name(&self) -> &'static str;

  /// True when `requested` is satisfied by `declared`.
  fn equivalent(&self, requested: &Qualifier, declared: &Qualifier) -> bool;
}

/// Default strategy: the marker name and every attribute value must match.
pub struct ValueEqualityMetadata;

impl QualifyingMetadata for ValueEqualityMetadata {
  fn name(&self) -> &'static str {
    "value_equality"
  }

  fn equivalent(&self, requested: &Qualifier, declared: &Qualifier) -> bool {
    requested == declared
  }
}

/// Looser strategy: only the marker name is compared, attribute values are
/// ignored.
pub struct MarkerOnlyMetadata;

impl QualifyingMetadata for MarkerOnlyMetadata {
  fn name(&self) -> &'static str {
    "marker_only"
  }

  fn equivalent(&self, requested: &Qualifier, declared: &Qualifier) -> bool {
    requested.marker == declared.marker
  }
}

/// Resolves a qualifier-equality strategy by its registered factory name.
pub fn metadata_factory(name: &str) -> Option<Arc<dyn QualifyingMetadata>> {
  match name {
    "value_equality" => Some(Arc::new(ValueEqualityMetadata)),
    "marker_only" => Some(Arc::new(MarkerOnlyMetadata)),
    _ => None,
  }
}

/// Superset match: every requested qualifier must have an equivalent in the
/// declared set. Definitions declare a closed set of supported qualifier
/// values; extra declared qualifiers do not disqualify a match.
pub fn matches_qualifiers(
  strategy: &dyn QualifyingMetadata,
  requested: &[Qualifier],
  declared: &[Qualifier],
) -> bool {
  requested
    .iter()
    .all(|req| declared.iter().any(|dec| strategy.equivalent(req, dec)))
}
