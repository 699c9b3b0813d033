//! The build-time injector graph: one node per discoverable type, with
//! provider indirection for lazy materialization and cycle breaking.
//!
//! Graph nodes exist only while the wiring program is being constructed;
//! they are discarded after emission and never persist into the runtime
//! model.

use crate::classifier::{RoleMap, WiringRole};
use crate::reachability::ReachableTypes;
use crate::scanner::{TypeDescriptor, TypeScanner};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Index of an injector node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InjectorId(usize);

/// How a node materializes its value.
pub enum InjectorKind {
  /// Constructed directly from its creation callback.
  Direct,
  /// Materialized through a provider node. `provided` flips true the
  /// first time the value is materialized; later wiring sites read a
  /// cached accessor instead of re-invoking the provider. This is also
  /// the indirection that breaks construction cycles: wiring through the
  /// provider call defers the actual object reference until after both
  /// sides exist.
  ProviderBacked {
    provider: InjectorId,
    provided: bool,
  },
}

/// A build-time wiring node for one type.
pub struct Injector {
  descriptor: Arc<TypeDescriptor>,
  enabled: bool,
  rendered: bool,
  singleton: bool,
  testmock: bool,
  alternative: bool,
  kind: InjectorKind,
}

impl Injector {
  pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
    &self.descriptor
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn is_rendered(&self) -> bool {
    self.rendered
  }

  pub fn is_singleton(&self) -> bool {
    self.singleton
  }

  pub fn is_testmock(&self) -> bool {
    self.testmock
  }

  pub fn is_alternative(&self) -> bool {
    self.alternative
  }

  pub fn kind(&self) -> &InjectorKind {
    &self.kind
  }

  fn scope_role(&self) -> WiringRole {
    if self.singleton {
      WiringRole::Singleton
    } else {
      WiringRole::Dependent
    }
  }
}

/// One statement of the wiring program.
pub enum WiringStatement {
  /// Register a bean definition; singletons also materialize their shared
  /// instance at this point.
  DeclareBean {
    descriptor: Arc<TypeDescriptor>,
    scope: WiringRole,
  },
  /// Materialize a provided value by invoking its provider.
  InvokeProvider {
    descriptor: Arc<TypeDescriptor>,
    provider: Arc<TypeDescriptor>,
    scope: WiringRole,
  },
  /// Re-read a previously materialized provided value from its cached
  /// accessor.
  ReadProvided { descriptor: Arc<TypeDescriptor> },
}

impl WiringStatement {
  pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
    match self {
      WiringStatement::DeclareBean { descriptor, .. }
      | WiringStatement::InvokeProvider { descriptor, .. }
      | WiringStatement::ReadProvided { descriptor } => descriptor,
    }
  }
}

/// The constructed graph. Disabled injectors are retained for diagnostics
/// but produce no statements.
pub struct InjectorGraph {
  injectors: Vec<Injector>,
  by_name: HashMap<Arc<str>, InjectorId>,
  provider_nodes: HashSet<InjectorId>,
}

impl InjectorGraph {
  pub fn len(&self) -> usize {
    self.injectors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.injectors.is_empty()
  }

  pub fn get(&self, id: InjectorId) -> &Injector {
    &self.injectors[id.0]
  }

  pub fn lookup(&self, name: &str) -> Option<InjectorId> {
    self.by_name.get(name).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (InjectorId, &Injector)> {
    self.injectors.iter().enumerate().map(|(i, inj)| (InjectorId(i), inj))
  }

  /// Whether the node was created to back another node's provider link.
  pub fn is_provider_node(&self, id: InjectorId) -> bool {
    self.provider_nodes.contains(&id)
  }

  /// The creation statement for one node, or `None` when the node is
  /// disabled or has nothing to construct.
  ///
  /// For a provider-backed singleton the first call materializes the value
  /// and flips the node's `provided` state; subsequent calls return the
  /// cached-accessor statement, which is how a singleton-scoped provided
  /// value is shared across wiring sites.
  pub fn creation_statement(&mut self, id: InjectorId) -> Option<WiringStatement> {
    let (descriptor, scope, singleton, backing) = {
      let injector = &self.injectors[id.0];
      if !injector.enabled || injector.descriptor.construct().is_none() {
        return None;
      }
      let backing = match &injector.kind {
        InjectorKind::Direct => None,
        InjectorKind::ProviderBacked { provider, provided } => Some((*provider, *provided)),
      };
      (
        injector.descriptor.clone(),
        injector.scope_role(),
        injector.singleton,
        backing,
      )
    };

    match backing {
      None => {
        self.injectors[id.0].rendered = true;
        Some(WiringStatement::DeclareBean { descriptor, scope })
      }
      Some((provider, provided)) => {
        if singleton && provided {
          return Some(WiringStatement::ReadProvided { descriptor });
        }
        let provider_descriptor = self.injectors[provider.0].descriptor.clone();
        if let InjectorKind::ProviderBacked { provided, .. } = &mut self.injectors[id.0].kind {
          *provided = true;
        }
        self.injectors[id.0].rendered = true;
        Some(WiringStatement::InvokeProvider {
          descriptor,
          provider: provider_descriptor,
          scope,
        })
      }
    }
  }
}

/// Builds the injector graph from the scanner's candidate list and emits
/// the ordered wiring program.
///
/// The builder does not detect dependency cycles. A cycle between
/// injection points is a build-time contract violation unless at least one
/// edge on it is declared through a provider-style accessor
/// ([`TypeDescriptor::provided_by`]), which defers dereference until after
/// both objects exist.
pub struct GraphBuilder<'a> {
  pub scanner: &'a dyn TypeScanner,
  pub roles: &'a RoleMap,
  pub reachable: &'a ReachableTypes,
  pub enabled_alternatives: &'a HashSet<String>,
}

impl<'a> GraphBuilder<'a> {
  /// Creates one injector per concrete wirable candidate; a
  /// provider-backed candidate also registers a nested node for the
  /// provider implementation itself, linked from its delegate.
  pub fn build(&self, candidates: &[Arc<TypeDescriptor>]) -> InjectorGraph {
    let mut graph = InjectorGraph {
      injectors: Vec::new(),
      by_name: HashMap::new(),
      provider_nodes: HashSet::new(),
    };

    for candidate in candidates {
      if candidate.construct().is_none() {
        continue;
      }

      match candidate.provider() {
        None => {
          let injector = self.direct_injector(candidate);
          self.register(&mut graph, injector, false);
        }
        Some(provider) => {
          let provider_markers = self.scanner.markers_on(provider.name());
          let delegate_markers = self.scanner.markers_on(candidate.name());

          let enabled = self.type_enabled(candidate, &delegate_markers)
            || self.reachable.contains(provider.name());

          let provider_node = Injector {
            descriptor: provider.clone(),
            enabled,
            rendered: true,
            singleton: self.roles.has_role(WiringRole::Singleton, &provider_markers),
            testmock: self.roles.has_role(WiringRole::TestMockOverride, &provider_markers),
            alternative: false,
            kind: InjectorKind::Direct,
          };
          let provider_id = self.register(&mut graph, provider_node, true);

          let delegate = Injector {
            descriptor: candidate.clone(),
            enabled,
            rendered: true,
            singleton: self.roles.has_role(WiringRole::Singleton, &provider_markers),
            testmock: self.roles.has_role(WiringRole::TestMockOverride, &provider_markers),
            alternative: self.roles.has_role(WiringRole::Alternative, &delegate_markers),
            kind: InjectorKind::ProviderBacked {
              provider: provider_id,
              provided: false,
            },
          };
          self.register(&mut graph, delegate, false);
        }
      }
    }

    graph
  }

  fn direct_injector(&self, candidate: &Arc<TypeDescriptor>) -> Injector {
    let markers = self.scanner.markers_on(candidate.name());
    let (scope, _) = self.roles.classify_scope(&markers);

    Injector {
      descriptor: candidate.clone(),
      enabled: self.type_enabled(candidate, &markers),
      rendered: false,
      singleton: scope == WiringRole::Singleton,
      testmock: self.roles.has_role(WiringRole::TestMockOverride, &markers),
      alternative: self.roles.has_role(WiringRole::Alternative, &markers),
      kind: InjectorKind::Direct,
    }
  }

  /// Enablement: reachable from the live-code set, and (for alternatives)
  /// listed in the enabled-alternatives configuration.
  fn type_enabled(&self, candidate: &Arc<TypeDescriptor>, markers: &[Arc<str>]) -> bool {
    if self.roles.has_role(WiringRole::Alternative, markers)
      && !self.enabled_alternatives.contains(&**candidate.name())
    {
      return false;
    }
    self.reachable.contains(candidate.name())
  }

  fn register(&self, graph: &mut InjectorGraph, injector: Injector, provider_node: bool) -> InjectorId {
    let id = InjectorId(graph.injectors.len());
    graph.by_name.insert(injector.descriptor.name().clone(), id);
    if provider_node {
      graph.provider_nodes.insert(id);
    }
    graph.injectors.push(injector);
    id
  }

  /// Emits the ordered wiring program: one creation statement per enabled
  /// injector, in graph order. Disabled injectors are logged and skipped.
  pub fn emit(&self, graph: &mut InjectorGraph) -> Vec<WiringStatement> {
    let mut statements = Vec::new();

    for index in 0..graph.len() {
      let id = InjectorId(index);
      if !graph.get(id).is_enabled() {
        tracing::debug!(
          type_name = %graph.get(id).descriptor().name(),
          "injector disabled by reachability or alternative gating; no wiring emitted"
        );
        continue;
      }
      if let Some(statement) = graph.creation_statement(id) {
        statements.push(statement);
      }
    }

    statements
  }
}
