//! The type-scanning boundary: enumerates candidate component types, the
//! markers declared on them, and bootstrap configuration properties.

use crate::context::CreationalContext;
use crate::definition::{BeanInstance, CreationalCallback, TypeKey};
use crate::manager::BeanManager;
use crate::qualifier::Qualifier;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A runnable bootstrap-task payload.
pub type BootstrapTaskFn = Arc<dyn Fn() + Send + Sync>;

/// A discoverable candidate type: its name, its wiring identity, and the
/// recipe for constructing it.
///
/// Markers are not stored here; they come from
/// [`TypeScanner::markers_on`], keyed by the descriptor's name, so that the
/// same query also answers marker-on-marker questions during stereotype
/// resolution.
pub struct TypeDescriptor {
  name: Arc<str>,
  contract: TypeKey,
  implementation: TypeKey,
  qualifiers: Vec<Qualifier>,
  bean_name: Option<String>,
  concrete: bool,
  construct: Option<CreationalCallback>,
  provider: Option<Arc<TypeDescriptor>>,
  task: Option<BootstrapTaskFn>,
}

impl TypeDescriptor {
  /// A wirable component type with contract `C`, implementation `I` and
  /// the given creation callback.
  pub fn new<C: ?Sized + Any, I: ?Sized + Any>(
    name: impl Into<Arc<str>>,
    construct: impl Fn(&BeanManager, &Arc<CreationalContext>) -> BeanInstance + Send + Sync + 'static,
  ) -> Self {
    Self {
      name: name.into(),
      contract: TypeKey::of::<C>(),
      implementation: TypeKey::of::<I>(),
      qualifiers: Vec::new(),
      bean_name: None,
      concrete: true,
      construct: Some(Arc::new(construct)),
      provider: None,
      task: None,
    }
  }

  /// A non-wirable candidate carrying only a runnable bootstrap payload.
  pub fn task(name: impl Into<Arc<str>>, run: impl Fn() + Send + Sync + 'static) -> Self {
    Self {
      name: name.into(),
      contract: TypeKey::of::<()>(),
      implementation: TypeKey::of::<()>(),
      qualifiers: Vec::new(),
      bean_name: None,
      concrete: false,
      construct: None,
      provider: None,
      task: Some(Arc::new(run)),
    }
  }

  /// A candidate that declares markers but nothing to wire or run, e.g. a
  /// type used only to surface a stereotype marker to the classifier.
  pub fn marker_carrier(name: impl Into<Arc<str>>) -> Self {
    Self {
      name: name.into(),
      contract: TypeKey::of::<()>(),
      implementation: TypeKey::of::<()>(),
      qualifiers: Vec::new(),
      bean_name: None,
      concrete: false,
      construct: None,
      provider: None,
      task: None,
    }
  }

  pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
    self.qualifiers.push(qualifier);
    self
  }

  /// Sets the bean name used by the by-name index.
  pub fn named(mut self, bean_name: impl Into<String>) -> Self {
    self.bean_name = Some(bean_name.into());
    self
  }

  /// Marks whether the contract type should be treated as concrete (the
  /// default) or abstract/interface-only.
  pub fn concrete(mut self, concrete: bool) -> Self {
    self.concrete = concrete;
    self
  }

  /// Declares this type as provider-backed: its values are materialized
  /// through `provider` rather than constructed directly.
  pub fn provided_by(mut self, provider: Arc<TypeDescriptor>) -> Self {
    self.provider = Some(provider);
    self
  }

  pub fn name(&self) -> &Arc<str> {
    &self.name
  }

  pub fn contract(&self) -> TypeKey {
    self.contract
  }

  pub fn implementation(&self) -> TypeKey {
    self.implementation
  }

  pub fn qualifiers(&self) -> &[Qualifier] {
    &self.qualifiers
  }

  pub fn bean_name(&self) -> Option<&str> {
    self.bean_name.as_deref()
  }

  pub fn is_concrete(&self) -> bool {
    self.concrete
  }

  pub fn construct(&self) -> Option<&CreationalCallback> {
    self.construct.as_ref()
  }

  pub fn provider(&self) -> Option<&Arc<TypeDescriptor>> {
    self.provider.as_ref()
  }

  pub fn task_payload(&self) -> Option<&BootstrapTaskFn> {
    self.task.as_ref()
  }
}

/// The scanning source that enumerates candidate types and their declared
/// markers. Implementations must be deterministic for a given snapshot:
/// the same snapshot yields the same candidates in the same order.
pub trait TypeScanner: Send + Sync {
  /// Every discoverable candidate type, in a stable order.
  fn candidate_types(&self) -> Vec<Arc<TypeDescriptor>>;

  /// The markers declared on a type or on a marker type. Unknown names
  /// yield an empty set.
  fn markers_on(&self, name: &str) -> Vec<Arc<str>>;

  /// A named key/value properties map, or `None` when absent.
  fn properties_file(&self, name: &str) -> Option<HashMap<String, String>>;
}

/// An in-memory scanner over explicitly declared types and markers. This
/// is the standard way to hand a component set to the container, and
/// doubles as the scanner used throughout the test suite.
#[derive(Default)]
pub struct StaticScanner {
  types: Vec<Arc<TypeDescriptor>>,
  markers: HashMap<Arc<str>, Vec<Arc<str>>>,
  properties: HashMap<String, HashMap<String, String>>,
}

impl StaticScanner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a candidate type. Candidates are reported in insertion order.
  pub fn add_type(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
    let descriptor = Arc::new(descriptor);
    self.types.push(descriptor.clone());
    descriptor
  }

  /// Declares the markers present on a type or marker name.
  pub fn mark(&mut self, name: impl Into<Arc<str>>, markers: &[&str]) {
    self
      .markers
      .entry(name.into())
      .or_default()
      .extend(markers.iter().map(|m| Arc::<str>::from(*m)));
  }

  /// Registers a named properties map.
  pub fn with_properties(&mut self, file: impl Into<String>, map: HashMap<String, String>) {
    self.properties.insert(file.into(), map);
  }
}

impl TypeScanner for StaticScanner {
  fn candidate_types(&self) -> Vec<Arc<TypeDescriptor>> {
    self.types.clone()
  }

  fn markers_on(&self, name: &str) -> Vec<Arc<str>> {
    self.markers.get(name).cloned().unwrap_or_default()
  }

  fn properties_file(&self, name: &str) -> Option<HashMap<String, String>> {
    self.properties.get(name).cloned()
  }
}
