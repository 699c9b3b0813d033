use weft_ioc::{
  Anything, BeanInstance, BeanManager, CreationalCallback, Qualifier, ResolutionError, TypeKey,
};

use pretty_assertions::assert_eq;
use std::sync::Arc;

// --- Test Fixtures ---

// Contract and implementation types for lookup tests. Contracts are plain
// marker structs; what matters to the registry is the key and the flags.
struct Gateway;
struct StripeGateway;
struct WireGateway;

struct LonelyService;

fn noop_callback() -> CreationalCallback {
  Arc::new(|_, _| Arc::new(()) as BeanInstance)
}

fn register(
  manager: &BeanManager,
  bean_type: TypeKey,
  impl_type: TypeKey,
  qualifiers: Vec<Qualifier>,
  name: Option<&str>,
  concrete: bool,
) {
  manager.add_bean(
    bean_type,
    impl_type,
    noop_callback(),
    None,
    qualifiers,
    name.map(str::to_string),
    concrete,
  );
}

// --- Lookup Tests ---

#[test]
fn single_registration_short_circuits_qualifier_matching() {
  // Arrange: one definition, declared with a qualifier the request will
  // not carry.
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<LonelyService>(),
    TypeKey::of::<LonelyService>(),
    vec![Qualifier::new("Primary")],
    None,
    true,
  );

  // Act: request with a completely different qualifier.
  let found = manager.lookup_beans_qualified::<LonelyService>(&[Qualifier::new("Backup")]);

  // Assert: the single candidate is returned unconditionally.
  assert_eq!(found.len(), 1);
}

#[test]
fn lookup_one_fails_not_found_for_unregistered_type() {
  struct NeverRegistered;

  let manager = BeanManager::new();
  let result = manager.lookup_bean::<NeverRegistered>(&[]);

  assert!(matches!(result, Err(ResolutionError::NotFound { .. })));
}

#[test]
fn qualifier_superset_matching_selects_among_candidates() {
  // Arrange: two definitions under the same contract with different
  // qualifier sets, so the short-circuit does not apply.
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![Qualifier::new("Fast"), Qualifier::new("Durable")],
    None,
    false,
  );
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<WireGateway>(),
    vec![Qualifier::new("Slow")],
    None,
    false,
  );

  // Act
  let result = manager.lookup_bean::<Gateway>(&[Qualifier::new("Fast")]);

  // Assert: only the definition whose declared set contains every
  // requested qualifier survives.
  let def = result.expect("exactly one candidate should match");
  assert_eq!(def.impl_type(), TypeKey::of::<StripeGateway>());
}

#[test]
fn concrete_requested_type_keeps_only_concrete_definitions() {
  // Arrange: the contract is registered concrete by the first definition;
  // the second definition is not concrete-flagged.
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    None,
    true,
  );
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<WireGateway>(),
    vec![],
    None,
    false,
  );

  // Act: empty request matches both; the tie-break applies.
  let result = manager.lookup_bean::<Gateway>(&[]);

  let def = result.expect("tie-break should leave one definition");
  assert_eq!(def.impl_type(), TypeKey::of::<StripeGateway>());
  assert!(def.is_concrete());
}

#[test]
fn non_concrete_requested_type_filters_by_concrete_implementation() {
  // Arrange: neither Gateway definition is concrete-flagged, but the
  // StripeGateway implementation type is separately registered as a
  // concrete bean.
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    None,
    false,
  );
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<WireGateway>(),
    vec![],
    None,
    false,
  );
  register(
    &manager,
    TypeKey::of::<StripeGateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    None,
    true,
  );

  // Act
  let result = manager.lookup_bean::<Gateway>(&[]);

  // Assert: only the definition whose implementation is a registered
  // concrete type remains.
  let def = result.expect("tie-break should leave one definition");
  assert_eq!(def.impl_type(), TypeKey::of::<StripeGateway>());
}

#[test]
fn unresolvable_tie_is_reported_ambiguous() {
  // Arrange: two concrete definitions under a concrete contract, nothing
  // to break the tie.
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    None,
    true,
  );
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<WireGateway>(),
    vec![],
    None,
    true,
  );

  let result = manager.lookup_bean::<Gateway>(&[]);

  match result {
    Err(ResolutionError::Ambiguous { candidates, .. }) => {
      assert_eq!(candidates.len(), 2);
    }
    other => panic!("expected Ambiguous, got {other:?}"),
  }
}

#[test]
fn universal_root_type_matches_every_definition() {
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    None,
    true,
  );
  register(
    &manager,
    TypeKey::of::<LonelyService>(),
    TypeKey::of::<LonelyService>(),
    vec![],
    None,
    true,
  );

  let all = manager.lookup_beans::<Anything>();
  assert_eq!(all.len(), 2);
}

#[test]
fn destroy_all_beans_clears_the_definition_indices() {
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    Some("gateway"),
    true,
  );
  assert_eq!(manager.registered_bean_count(), 1);

  manager.destroy_all_beans();

  assert_eq!(manager.registered_bean_count(), 0);
  assert!(manager.lookup_beans::<Gateway>().is_empty());
  assert!(manager.lookup_beans_by_name("gateway").is_empty());
}

#[test]
fn named_definitions_accumulate_and_never_overwrite() {
  let manager = BeanManager::new();
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<StripeGateway>(),
    vec![],
    Some("gateway"),
    true,
  );
  register(
    &manager,
    TypeKey::of::<Gateway>(),
    TypeKey::of::<WireGateway>(),
    vec![],
    Some("gateway"),
    true,
  );

  let named = manager.lookup_beans_by_name("gateway");
  assert_eq!(named.len(), 2);

  assert!(manager.lookup_beans_by_name("unknown").is_empty());
}
