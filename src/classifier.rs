//! Wiring-role classification of discovered types, including recursive
//! resolution of composite ("stereotype") markers.

use crate::scanner::TypeScanner;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The closed set of wiring roles a discovered type can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WiringRole {
  Singleton,
  Dependent,
  TopLevelProvider,
  InjectionPoint,
  ProducerElement,
  Alternative,
  TestMockOverride,
}

/// Built-in marker names recognized by the default role configuration.
pub mod markers {
  pub const SINGLETON: &str = "Singleton";
  pub const APPLICATION_SCOPED: &str = "ApplicationScoped";
  pub const DEPENDENT: &str = "Dependent";
  pub const PRODUCES: &str = "Produces";
  pub const PROVIDER: &str = "Provider";
  pub const INJECT: &str = "Inject";
  pub const ALTERNATIVE: &str = "Alternative";
  pub const TEST_MOCK: &str = "TestMock";
  pub const STEREOTYPE: &str = "Stereotype";
  pub const BOOTSTRAP_BEFORE: &str = "BootstrapBefore";
  pub const BOOTSTRAP_AFTER: &str = "BootstrapAfter";
}

/// Mapping from wiring roles to the marker names that confer them.
#[derive(Default)]
pub struct RoleMap {
  roles: HashMap<WiringRole, HashSet<Arc<str>>>,
  // Markers whose Dependent classification came from stereotype
  // defaulting rather than an explicit scope marker.
  defaulted: HashSet<Arc<str>>,
}

impl RoleMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Associates a marker name with a role. A marker may confer several
  /// roles.
  pub fn map_role(&mut self, role: WiringRole, marker: impl Into<Arc<str>>) {
    self.roles.entry(role).or_default().insert(marker.into());
  }

  pub fn is_role(&self, role: WiringRole, marker: &str) -> bool {
    self
      .roles
      .get(&role)
      .map(|set| set.contains(marker))
      .unwrap_or(false)
  }

  /// True when any of the given markers confers the role.
  pub fn has_role(&self, role: WiringRole, markers: &[Arc<str>]) -> bool {
    markers.iter().any(|m| self.is_role(role, m))
  }

  pub(crate) fn mark_defaulted(&mut self, marker: Arc<str>) {
    self.defaulted.insert(marker);
  }

  /// Classifies the scope of a type from the markers declared on it.
  /// Returns the scope role (always `Singleton` or `Dependent`) and
  /// whether that scope was defaulted rather than explicitly declared.
  pub fn classify_scope(&self, markers: &[Arc<str>]) -> (WiringRole, bool) {
    if markers.iter().any(|m| self.is_role(WiringRole::Singleton, m)) {
      return (WiringRole::Singleton, false);
    }
    if let Some(m) = markers.iter().find(|m| self.is_role(WiringRole::Dependent, m)) {
      return (WiringRole::Dependent, self.defaulted.contains(&**m));
    }
    (WiringRole::Dependent, true)
  }
}

/// Folds the built-in marker names into `map`, matching what the wiring
/// program expects out of the box. Runs after extension configurators so
/// custom mappings are never clobbered, only extended.
pub fn apply_default_roles(map: &mut RoleMap) {
  map.map_role(WiringRole::Singleton, markers::SINGLETON);
  map.map_role(WiringRole::Singleton, markers::APPLICATION_SCOPED);
  map.map_role(WiringRole::Dependent, markers::DEPENDENT);
  map.map_role(WiringRole::ProducerElement, markers::PRODUCES);
  map.map_role(WiringRole::TopLevelProvider, markers::PROVIDER);
  map.map_role(WiringRole::InjectionPoint, markers::INJECT);
  map.map_role(WiringRole::Alternative, markers::ALTERNATIVE);
  map.map_role(WiringRole::TestMockOverride, markers::TEST_MOCK);
}

/// The default role configuration as a standalone map.
pub fn default_role_map() -> RoleMap {
  let mut map = RoleMap::new();
  apply_default_roles(&mut map);
  map
}

/// Resolves every stereotype marker reachable from the candidate set and
/// folds the results into `roles`. Stereotypes are processed in discovery
/// order (candidate order, then marker order within a candidate).
pub fn process_stereotypes(scanner: &dyn TypeScanner, roles: &mut RoleMap) {
  let mut memo: HashMap<Arc<str>, (WiringRole, bool)> = HashMap::new();
  let mut in_progress: HashSet<Arc<str>> = HashSet::new();

  for candidate in scanner.candidate_types() {
    for marker in scanner.markers_on(candidate.name()) {
      if is_stereotype(scanner, &marker) {
        resolve_stereotype(scanner, roles, &mut memo, &mut in_progress, &marker);
      }
    }
  }
}

fn is_stereotype(scanner: &dyn TypeScanner, marker: &str) -> bool {
  scanner
    .markers_on(marker)
    .iter()
    .any(|m| &**m == markers::STEREOTYPE)
}

/// Resolves one stereotype marker to its scope role, memoized per marker.
///
/// A stereotype defaults its carriers to Dependent scope unless one of its
/// constituent markers is itself classified Singleton or Dependent, in
/// which case the explicit classification wins, is propagated by mapping
/// the stereotype marker into that role's set, and is reported as
/// non-default. A self-referential stereotype resolves as default without
/// recursing again.
fn resolve_stereotype(
  scanner: &dyn TypeScanner,
  roles: &mut RoleMap,
  memo: &mut HashMap<Arc<str>, (WiringRole, bool)>,
  in_progress: &mut HashSet<Arc<str>>,
  marker: &Arc<str>,
) -> (WiringRole, bool) {
  if let Some(resolved) = memo.get(marker) {
    return *resolved;
  }
  if !in_progress.insert(marker.clone()) {
    return (WiringRole::Dependent, true);
  }

  let mut role = WiringRole::Dependent;
  let mut is_default = true;

  for constituent in scanner.markers_on(marker) {
    if &*constituent != markers::STEREOTYPE && is_stereotype(scanner, &constituent) {
      let (nested_role, nested_default) =
        resolve_stereotype(scanner, roles, memo, in_progress, &constituent);
      if !nested_default {
        is_default = false;
        if nested_role == WiringRole::Singleton {
          role = WiringRole::Singleton;
        }
      }
    }
    if roles.is_role(WiringRole::Singleton, &constituent) {
      is_default = false;
      role = WiringRole::Singleton;
    } else if roles.is_role(WiringRole::Dependent, &constituent) {
      is_default = false;
    }
  }

  roles.map_role(role, marker.clone());
  if is_default {
    roles.mark_defaulted(marker.clone());
  }

  in_progress.remove(marker);
  memo.insert(marker.clone(), (role, is_default));
  (role, is_default)
}
