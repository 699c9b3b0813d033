//! The bean manager: the runtime index from (type, qualifiers, name) to
//! component definitions and live instances.
//!
//! The manager is populated by the wiring program at bootstrap time. It
//! owns the bean definitions and the creational-context tree; lookups are
//! safe under concurrent access, while registration is expected to happen
//! during the single-threaded bootstrap phase.

use crate::context::CreationalContext;
use crate::definition::{
  Anything, BeanDef, BeanInstance, CreationalCallback, DestructionCallback, TypeKey,
};
use crate::error::ResolutionError;
use crate::qualifier::{Qualifier, QualifyingMetadata, ValueEqualityMetadata};

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Identity of a live instance: the data address behind its shared
/// reference. Two clones of the same `Arc` produce the same key.
fn identity_key(instance: &BeanInstance) -> usize {
  Arc::as_ptr(instance).cast::<()>() as usize
}

pub struct BeanManager {
  bean_map: DashMap<TypeId, Vec<Arc<BeanDef>>>,
  named_beans: DashMap<String, Vec<Arc<BeanDef>>>,
  concrete_beans: DashSet<&'static str>,
  contexts: Mutex<HashMap<usize, Arc<CreationalContext>>>,
  // Identity-keyed back-references from proxy handle to real instance.
  // Weak on purpose: the registry owns instance lifetime, this table never
  // does.
  proxies: Mutex<HashMap<usize, Weak<dyn Any + Send + Sync>>>,
  qualifying: Arc<dyn QualifyingMetadata>,
  root_context: Arc<CreationalContext>,
}

impl BeanManager {
  pub fn new() -> Arc<Self> {
    Self::with_qualifying(Arc::new(ValueEqualityMetadata))
  }

  /// Creates a manager using the given qualifier-equality strategy.
  pub fn with_qualifying(qualifying: Arc<dyn QualifyingMetadata>) -> Arc<Self> {
    let manager = Self {
      bean_map: DashMap::new(),
      named_beans: DashMap::new(),
      concrete_beans: DashSet::new(),
      contexts: Mutex::new(HashMap::new()),
      proxies: Mutex::new(HashMap::new()),
      qualifying,
      root_context: CreationalContext::root(),
    };
    // The universal root type is treated like a concrete bean type for the
    // purpose of lookups, which excludes other non-concrete types from
    // qualified matching against it.
    manager.concrete_beans.insert(TypeKey::of::<Anything>().name());
    Arc::new(manager)
  }

  /// The root creational context: the whole-application singleton scope.
  pub fn root_context(&self) -> &Arc<CreationalContext> {
    &self.root_context
  }

  /// Registers a bean with the manager. Usually called by the wiring
  /// program to advertise the bean; registering at runtime makes the bean
  /// available for lookup but does not alter the wiring of previously
  /// declared beans.
  ///
  /// A `Some(instance)` registers a singleton sharing that instance; `None`
  /// registers a dependent bean created on demand. Definitions accumulate:
  /// nothing is ever overwritten.
  #[allow(clippy::too_many_arguments)]
  pub fn add_bean(
    &self,
    bean_type: TypeKey,
    impl_type: TypeKey,
    callback: CreationalCallback,
    instance: Option<BeanInstance>,
    qualifiers: Vec<Qualifier>,
    name: Option<String>,
    concrete: bool,
  ) -> Arc<BeanDef> {
    if concrete {
      self.concrete_beans.insert(bean_type.name());
    }

    let def = Arc::new(match instance {
      Some(instance) => BeanDef::singleton(
        bean_type, impl_type, qualifiers, name.clone(), concrete, callback, instance,
      ),
      None => BeanDef::dependent(bean_type, impl_type, qualifiers, name.clone(), concrete, callback),
    });

    if let Some(name) = name {
      self.named_beans.entry(name).or_default().push(def.clone());
    }
    self.register_bean(def.clone());
    def
  }

  /// Appends a definition to the by-type index.
  pub fn register_bean(&self, def: Arc<BeanDef>) -> Arc<BeanDef> {
    self
      .bean_map
      .entry(def.bean_type().id())
      .or_default()
      .push(def.clone());
    def
  }

  /// All definitions registered under the given bean name.
  pub fn lookup_beans_by_name(&self, name: &str) -> Vec<Arc<BeanDef>> {
    self
      .named_beans
      .get(name)
      .map(|defs| defs.clone())
      .unwrap_or_default()
  }

  /// All definitions assignable to `T`. The universal root type
  /// [`Anything`] matches every registered definition.
  pub fn lookup_beans<T: ?Sized + Any>(&self) -> Vec<Arc<BeanDef>> {
    self.defs_for(TypeId::of::<T>())
  }

  fn defs_for(&self, id: TypeId) -> Vec<Arc<BeanDef>> {
    if id == TypeId::of::<Anything>() {
      let mut all = Vec::new();
      for entry in self.bean_map.iter() {
        all.extend(entry.value().iter().cloned());
      }
      return all;
    }
    self
      .bean_map
      .get(&id)
      .map(|defs| defs.clone())
      .unwrap_or_default()
  }

  /// Looks up definitions by type and qualifiers.
  ///
  /// When exactly one definition is indexed under the type it is returned
  /// immediately, without qualifier matching. This short-circuit means a
  /// single registration with mismatched qualifiers is still returned; it
  /// is a documented lookup behavior, not an oversight.
  ///
  /// With several candidates, qualifier superset matching applies first.
  /// If more than one candidate remains, the concreteness tie-break runs:
  /// when the requested type is itself registered concrete, only
  /// concrete-flagged definitions are kept; otherwise only definitions
  /// whose implementation type is a registered concrete type are kept.
  pub fn lookup_beans_qualified<T: ?Sized + Any>(
    &self,
    qualifiers: &[Qualifier],
  ) -> Vec<Arc<BeanDef>> {
    let candidates = self.defs_for(TypeId::of::<T>());

    if candidates.len() <= 1 {
      return candidates;
    }

    let mut matching: Vec<Arc<BeanDef>> = candidates
      .into_iter()
      .filter(|def| def.matches(qualifiers, &*self.qualifying))
      .collect();

    if matching.len() > 1 {
      if self.concrete_beans.contains(type_name::<T>()) {
        matching.retain(|def| def.is_concrete());
      } else {
        matching.retain(|def| self.concrete_beans.contains(def.impl_type().name()));
      }
    }

    matching
  }

  /// Resolves exactly one definition for the type and qualifiers, or
  /// reports why resolution failed.
  pub fn lookup_bean<T: ?Sized + Any>(
    &self,
    qualifiers: &[Qualifier],
  ) -> Result<Arc<BeanDef>, ResolutionError> {
    let mut matching = self.lookup_beans_qualified::<T>(qualifiers);

    match matching.len() {
      1 => Ok(matching.swap_remove(0)),
      0 => Err(ResolutionError::NotFound {
        type_name: type_name::<T>().to_string(),
      }),
      _ => Err(ResolutionError::Ambiguous {
        type_name: type_name::<T>().to_string(),
        candidates: matching
          .iter()
          .map(|def| def.impl_type().name().to_string())
          .collect(),
      }),
    }
  }

  /// Resolves and materializes a single typed instance.
  ///
  /// A definition whose callback produced a value of a different type than
  /// it was registered under is reported as `NotFound`.
  pub fn instance_of<T: Any + Send + Sync>(
    &self,
    qualifiers: &[Qualifier],
  ) -> Result<Arc<T>, ResolutionError> {
    let def = self.lookup_bean::<T>(qualifiers)?;
    def
      .instance(self)
      .downcast::<T>()
      .map_err(|_| ResolutionError::NotFound {
        type_name: type_name::<T>().to_string(),
      })
  }

  /// Records an instance into its owning context and indexes the
  /// ownership, keeping the instance-to-context invariant in one place.
  pub fn register_creation(
    &self,
    context: &Arc<CreationalContext>,
    instance: BeanInstance,
    teardown: Option<DestructionCallback>,
  ) {
    context.record_creation(instance.clone(), teardown);
    self
      .contexts
      .lock()
      .insert(identity_key(&instance), context.clone());
  }

  /// Registers a proxy handle standing in for a real managed instance.
  pub fn add_proxy_reference(&self, proxy: &BeanInstance, real: &BeanInstance) {
    self
      .proxies
      .lock()
      .insert(identity_key(proxy), Arc::downgrade(real));
  }

  /// The actual bean reference behind `reference`: the un-proxied instance
  /// if `reference` is a proxy, otherwise `reference` itself.
  pub fn actual_bean_reference(&self, reference: &BeanInstance) -> BeanInstance {
    self
      .proxies
      .lock()
      .get(&identity_key(reference))
      .and_then(Weak::upgrade)
      .unwrap_or_else(|| reference.clone())
  }

  /// Whether `reference` is itself a proxy to a live managed instance.
  pub fn is_proxy_reference(&self, reference: &BeanInstance) -> bool {
    self
      .proxies
      .lock()
      .get(&identity_key(reference))
      .and_then(Weak::upgrade)
      .is_some()
  }

  /// Whether the referenced object is currently a managed bean.
  pub fn is_managed(&self, reference: &BeanInstance) -> bool {
    let actual = self.actual_bean_reference(reference);
    self.contexts.lock().contains_key(&identity_key(&actual))
  }

  /// Destroys a bean and every other bean created in the same creational
  /// context.
  ///
  /// The reference is first resolved through the proxy table; destruction
  /// always operates on the real instance. Unmanaged or already-destroyed
  /// references are a no-op, so calling this twice is safe. Every
  /// destroyed instance is removed from the ownership index and from both
  /// directions of the proxy table.
  pub fn destroy_bean(&self, reference: &BeanInstance) {
    let actual = self.actual_bean_reference(reference);
    let context = self.contexts.lock().get(&identity_key(&actual)).cloned();

    let Some(context) = context else {
      return;
    };

    let instances = context.all_created_instances();
    context.destroy();

    let mut contexts = self.contexts.lock();
    let mut proxies = self.proxies.lock();
    for instance in &instances {
      let key = identity_key(instance);
      contexts.remove(&key);
      proxies.remove(&key);
      proxies.retain(|_, real| match real.upgrade() {
        Some(real) => identity_key(&real) != key,
        None => false,
      });
    }
  }

  /// Number of registered definitions, counting multi-bindings.
  pub fn registered_bean_count(&self) -> usize {
    self.bean_map.iter().map(|entry| entry.value().len()).sum()
  }

  /// Clears the definition indices. Live contexts and the proxy table are
  /// untouched; this resets what is advertised for lookup between
  /// bootstraps.
  pub fn destroy_all_beans(&self) {
    self.bean_map.clear();
    self.named_beans.clear();
  }
}
