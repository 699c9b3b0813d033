//! Bean definitions: the identity and creation recipe of a managed
//! component.

use crate::context::CreationalContext;
use crate::manager::BeanManager;
use crate::qualifier::{matches_qualifiers, Qualifier, QualifyingMetadata};

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-erased reference to a managed instance.
pub type BeanInstance = Arc<dyn Any + Send + Sync>;

/// Constructs one instance of a bean.
///
/// The callback resolves dependencies through the manager and records
/// everything it creates into the supplied creational context (via
/// [`BeanManager::register_creation`]), so that the whole object graph can
/// later be torn down together.
pub type CreationalCallback =
  Arc<dyn Fn(&BeanManager, &Arc<CreationalContext>) -> BeanInstance + Send + Sync>;

/// Invoked for an instance when its owning context is destroyed. Each
/// recorded callback runs exactly once, in reverse creation order.
pub type DestructionCallback = Arc<dyn Fn(&BeanInstance) + Send + Sync>;

/// Identity of a Rust type as seen by the registry: the `TypeId` for exact
/// index matching plus the type name for diagnostics and the concrete-type
/// set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
  id: TypeId,
  name: &'static str,
}

impl TypeKey {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub(crate) fn id(&self) -> TypeId {
    self.id
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.name)
  }
}

/// The universal root type. A lookup for `Anything` matches every
/// registered definition, which is how "get everything" queries are
/// expressed. The registry treats it as a concrete type so that qualified
/// matching against it excludes other non-concrete contracts.
pub struct Anything;

/// Scope kind of a bean definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeanScope {
  /// One shared instance for the application lifetime.
  Singleton,
  /// A fresh instance, in a fresh creational context, per lookup.
  Dependent,
}

enum BeanKind {
  Singleton { instance: BeanInstance },
  Dependent,
}

/// A registered component definition: contract type, concrete
/// implementation type, qualifiers, optional name, concreteness and the
/// creation callback.
pub struct BeanDef {
  bean_type: TypeKey,
  impl_type: TypeKey,
  qualifiers: Vec<Qualifier>,
  name: Option<String>,
  concrete: bool,
  kind: BeanKind,
  callback: CreationalCallback,
}

impl BeanDef {
  /// A singleton definition carrying the shared instance materialized at
  /// bootstrap.
  pub fn singleton(
    bean_type: TypeKey,
    impl_type: TypeKey,
    qualifiers: Vec<Qualifier>,
    name: Option<String>,
    concrete: bool,
    callback: CreationalCallback,
    instance: BeanInstance,
  ) -> Self {
    Self {
      bean_type,
      impl_type,
      qualifiers,
      name,
      concrete,
      kind: BeanKind::Singleton { instance },
      callback,
    }
  }

  /// A dependent definition; instances are created on demand.
  pub fn dependent(
    bean_type: TypeKey,
    impl_type: TypeKey,
    qualifiers: Vec<Qualifier>,
    name: Option<String>,
    concrete: bool,
    callback: CreationalCallback,
  ) -> Self {
    Self {
      bean_type,
      impl_type,
      qualifiers,
      name,
      concrete,
      kind: BeanKind::Dependent,
      callback,
    }
  }

  pub fn bean_type(&self) -> TypeKey {
    self.bean_type
  }

  pub fn impl_type(&self) -> TypeKey {
    self.impl_type
  }

  pub fn qualifiers(&self) -> &[Qualifier] {
    &self.qualifiers
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn is_concrete(&self) -> bool {
    self.concrete
  }

  pub fn scope(&self) -> BeanScope {
    match self.kind {
      BeanKind::Singleton { .. } => BeanScope::Singleton,
      BeanKind::Dependent => BeanScope::Dependent,
    }
  }

  /// True when every requested qualifier has an equivalent in this
  /// definition's declared set.
  pub fn matches(&self, requested: &[Qualifier], strategy: &dyn QualifyingMetadata) -> bool {
    matches_qualifiers(strategy, requested, &self.qualifiers)
  }

  /// Materializes an instance of this bean.
  ///
  /// Singletons return the shared instance. Dependent beans run their
  /// creation callback against a fresh child of the root creational
  /// context, so the resulting object graph can be destroyed as a unit.
  pub fn instance(&self, manager: &BeanManager) -> BeanInstance {
    match &self.kind {
      BeanKind::Singleton { instance } => instance.clone(),
      BeanKind::Dependent => {
        let context = manager.root_context().create_child(self.impl_type.name());
        (self.callback)(manager, &context)
      }
    }
  }
}

impl fmt::Debug for BeanDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BeanDef")
      .field("bean_type", &self.bean_type)
      .field("impl_type", &self.impl_type)
      .field("name", &self.name)
      .field("concrete", &self.concrete)
      .field("scope", &self.scope())
      .finish()
  }
}
