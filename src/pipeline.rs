//! The bootstrap pipeline: extension configurators, code decorators,
//! bootstrap-task ordering, role classification, graph construction and
//! assembly of the batched wiring program.
//!
//! Apart from reachability analysis (which the caller runs up front on its
//! own worker pool), every phase here mutates shared builder state without
//! synchronization and must stay single-threaded.

use crate::classifier::{apply_default_roles, markers, process_stereotypes, RoleMap};
use crate::emitter::{Exposure, WiringProgram, DECLARATION_BATCH_SIZE};
use crate::error::BootstrapError;
use crate::graph::{GraphBuilder, WiringStatement};
use crate::qualifier::{metadata_factory, QualifyingMetadata, ValueEqualityMetadata};
use crate::reachability::ReachableTypes;
use crate::scanner::{BootstrapTaskFn, TypeDescriptor, TypeScanner};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Properties file consulted at bootstrap.
pub const PROPERTIES_FILE: &str = "weft.properties";
/// Property selecting the qualifier-equality strategy by factory name.
pub const QUALIFYING_METADATA_FACTORY_PROPERTY: &str = "weft.ioc.qualifying_metadata_factory";
/// Property listing enabled alternative types, whitespace-separated.
pub const ENABLED_ALTERNATIVES_PROPERTY: &str = "weft.ioc.enabled_alternatives";

/// Mutable state threaded through the pipeline phases: the statements
/// extensions append to the end of the program, and the active qualifier
/// strategy.
pub struct ProcessingContext {
  pub qualifying: Arc<dyn QualifyingMetadata>,
  pub append_to_end: Vec<WiringStatement>,
}

/// Build-time wiring state shared with extensions: the role map, the
/// reachability oracle, alternative gating and collected exposures.
pub struct InjectionContext {
  pub roles: RoleMap,
  pub reachable: ReachableTypes,
  pub enabled_alternatives: HashSet<String>,
  pub exposures: Vec<Exposure>,
}

/// A build-time extension hooked into the pipeline. `configure` runs
/// before any component classification; `after_initialization` runs after
/// the graph is built, in the same order extensions were loaded.
pub trait ExtensionConfigurator: Send + Sync {
  fn configure(
    &self,
    processing: &mut ProcessingContext,
    injection: &mut InjectionContext,
  ) -> Result<(), BootstrapError>;

  fn after_initialization(
    &self,
    processing: &mut ProcessingContext,
    injection: &mut InjectionContext,
  ) -> Result<(), BootstrapError> {
    let _ = (processing, injection);
    Ok(())
  }
}

/// A per-marker code decorator: contributes extra wiring statements for
/// every candidate carrying its capability marker.
pub trait CodeDecorator: Send + Sync {
  fn decorate(&self, descriptor: &Arc<TypeDescriptor>) -> Vec<WiringStatement>;
}

/// A decorator declaration as loaded by the pipeline. Loading fails fast
/// unless exactly one capability-marker type argument is declared.
pub struct DecoratorBinding {
  pub marker_args: Vec<Arc<str>>,
  pub decorator: Arc<dyn CodeDecorator>,
}

impl DecoratorBinding {
  pub fn new(marker: impl Into<Arc<str>>, decorator: Arc<dyn CodeDecorator>) -> Self {
    Self {
      marker_args: vec![marker.into()],
      decorator,
    }
  }
}

/// Runs the full pipeline and assembles the batched wiring program.
/// Returns the program together with the qualifier strategy the emitted
/// unit must install.
pub fn assemble_program(
  scanner: &dyn TypeScanner,
  reachable: ReachableTypes,
  extensions: &[Arc<dyn ExtensionConfigurator>],
  decorator_bindings: &[DecoratorBinding],
) -> Result<(WiringProgram, Arc<dyn QualifyingMetadata>), BootstrapError> {
  let mut processing = ProcessingContext {
    qualifying: Arc::new(ValueEqualityMetadata),
    append_to_end: Vec::new(),
  };
  let mut injection = InjectionContext {
    roles: RoleMap::new(),
    reachable,
    enabled_alternatives: HashSet::new(),
    exposures: Vec::new(),
  };

  apply_properties(scanner, &mut processing, &mut injection)?;

  // Phase 1: extension configurators, before any classification.
  for extension in extensions {
    extension.configure(&mut processing, &mut injection)?;
  }

  let candidates = scanner.candidate_types();

  // Phase 2: split bootstrap tasks into before/after groups.
  let (before_tasks, after_tasks) = classify_tasks(scanner, &candidates)?;

  // Phase 3: load decorators, one capability marker each.
  let decorators = load_decorators(decorator_bindings)?;

  // Phase 4: default role classification, then stereotype resolution.
  apply_default_roles(&mut injection.roles);
  process_stereotypes(scanner, &mut injection.roles);

  // Phase 5: build the graph and emit the base program.
  let builder = GraphBuilder {
    scanner,
    roles: &injection.roles,
    reachable: &injection.reachable,
    enabled_alternatives: &injection.enabled_alternatives,
  };
  let mut graph = builder.build(&candidates);
  let mut statements = builder.emit(&mut graph);

  for candidate in &candidates {
    for marker in scanner.markers_on(candidate.name()) {
      if let Some(decorator) = decorators.get(&marker) {
        statements.extend(decorator.decorate(candidate));
      }
    }
  }

  // Phase 6: post-initialization hooks, in load order.
  for extension in extensions {
    extension.after_initialization(&mut processing, &mut injection)?;
  }

  statements.append(&mut processing.append_to_end);

  // Phase 7: assemble. The graph is discarded here; its nodes never
  // outlive program construction.
  let batches = batch_statements(statements);
  let program = WiringProgram {
    before_tasks,
    batches,
    exposures: injection.exposures,
    after_tasks,
  };

  Ok((program, processing.qualifying))
}

fn apply_properties(
  scanner: &dyn TypeScanner,
  processing: &mut ProcessingContext,
  injection: &mut InjectionContext,
) -> Result<(), BootstrapError> {
  let Some(properties) = scanner.properties_file(PROPERTIES_FILE) else {
    return Ok(());
  };

  for (key, value) in &properties {
    match key.as_str() {
      QUALIFYING_METADATA_FACTORY_PROPERTY => {
        let strategy = metadata_factory(value).ok_or_else(|| {
          BootstrapError::InvalidExtension(format!(
            "unknown qualifying metadata factory: {value}"
          ))
        })?;
        processing.qualifying = strategy;
      }
      ENABLED_ALTERNATIVES_PROPERTY => {
        for alternative in value.split_whitespace() {
          injection
            .enabled_alternatives
            .insert(alternative.trim().to_string());
        }
      }
      other => {
        tracing::debug!(key = other, "ignoring unrecognized bootstrap property");
      }
    }
  }

  Ok(())
}

/// Groups candidates carrying a bootstrap-task marker by their declared
/// order. A task-marked type without a runnable payload fails the
/// pipeline.
fn classify_tasks(
  scanner: &dyn TypeScanner,
  candidates: &[Arc<TypeDescriptor>],
) -> Result<TaskGroups, BootstrapError> {
  let mut before = Vec::new();
  let mut after = Vec::new();

  for candidate in candidates {
    let candidate_markers = scanner.markers_on(candidate.name());
    let runs_before = candidate_markers
      .iter()
      .any(|m| &**m == markers::BOOTSTRAP_BEFORE);
    let runs_after = candidate_markers
      .iter()
      .any(|m| &**m == markers::BOOTSTRAP_AFTER);

    if !runs_before && !runs_after {
      continue;
    }

    let Some(task) = candidate.task_payload() else {
      return Err(BootstrapError::MalformedRole(candidate.name().to_string()));
    };

    let entry = (candidate.name().clone(), task.clone());
    if runs_before {
      before.push(entry);
    } else {
      after.push(entry);
    }
  }

  Ok((before, after))
}

type TaskGroups = (
  Vec<(Arc<str>, BootstrapTaskFn)>,
  Vec<(Arc<str>, BootstrapTaskFn)>,
);

fn load_decorators(
  bindings: &[DecoratorBinding],
) -> Result<HashMap<Arc<str>, Arc<dyn CodeDecorator>>, BootstrapError> {
  let mut decorators = HashMap::new();

  for binding in bindings {
    if binding.marker_args.len() != 1 {
      return Err(BootstrapError::InvalidExtension(format!(
        "code decorator must bind exactly one capability marker, found {}",
        binding.marker_args.len()
      )));
    }
    decorators.insert(binding.marker_args[0].clone(), binding.decorator.clone());
  }

  Ok(decorators)
}

fn batch_statements(statements: Vec<WiringStatement>) -> Vec<Vec<WiringStatement>> {
  let mut batches = Vec::new();
  let mut current = Vec::new();

  for statement in statements {
    if current.len() == DECLARATION_BATCH_SIZE {
      batches.push(std::mem::take(&mut current));
    }
    current.push(statement);
  }
  if !current.is_empty() {
    batches.push(current);
  }

  batches
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::definition::BeanInstance;
  use crate::scanner::StaticScanner;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Fixture;

  fn wirable(name: &str) -> TypeDescriptor {
    TypeDescriptor::new::<Fixture, Fixture>(name, |_, _| Arc::new(Fixture) as BeanInstance)
  }

  #[test]
  fn task_marked_type_without_payload_is_malformed() {
    let mut scanner = StaticScanner::new();
    scanner.add_type(wirable("app.NotATask"));
    scanner.mark("app.NotATask", &["BootstrapBefore"]);

    let result = assemble_program(&scanner, ReachableTypes::everything(), &[], &[]);
    assert!(matches!(result, Err(BootstrapError::MalformedRole(_))));
  }

  #[test]
  fn decorator_binding_must_name_exactly_one_marker() {
    struct Noop;
    impl CodeDecorator for Noop {
      fn decorate(&self, _descriptor: &Arc<TypeDescriptor>) -> Vec<WiringStatement> {
        Vec::new()
      }
    }

    let scanner = StaticScanner::new();
    let binding = DecoratorBinding {
      marker_args: vec![Arc::from("Timed"), Arc::from("Counted")],
      decorator: Arc::new(Noop),
    };

    let result = assemble_program(&scanner, ReachableTypes::everything(), &[], &[binding]);
    assert!(matches!(result, Err(BootstrapError::InvalidExtension(_))));
  }

  #[test]
  fn statements_are_batched_in_fixed_size_units() {
    let mut scanner = StaticScanner::new();
    for i in 0..(DECLARATION_BATCH_SIZE + 3) {
      scanner.add_type(wirable(&format!("app.Component{i}")));
    }

    let (program, _) = assemble_program(&scanner, ReachableTypes::everything(), &[], &[])
      .expect("pipeline should assemble");

    assert_eq!(program.batches.len(), 2);
    assert_eq!(program.batches[0].len(), DECLARATION_BATCH_SIZE);
    assert_eq!(program.batches[1].len(), 3);
    assert_eq!(program.statement_count(), DECLARATION_BATCH_SIZE + 3);
  }

  #[test]
  fn unknown_qualifying_factory_fails_bootstrap() {
    let mut scanner = StaticScanner::new();
    let mut properties = HashMap::new();
    properties.insert(
      QUALIFYING_METADATA_FACTORY_PROPERTY.to_string(),
      "no_such_factory".to_string(),
    );
    scanner.with_properties(PROPERTIES_FILE, properties);

    let result = assemble_program(&scanner, ReachableTypes::everything(), &[], &[]);
    assert!(matches!(result, Err(BootstrapError::InvalidExtension(_))));
  }

  #[test]
  fn extension_hooks_run_in_declared_order() {
    static CONFIGURE_CALLS: AtomicUsize = AtomicUsize::new(0);
    static AFTER_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Probe;
    impl ExtensionConfigurator for Probe {
      fn configure(
        &self,
        _processing: &mut ProcessingContext,
        _injection: &mut InjectionContext,
      ) -> Result<(), BootstrapError> {
        CONFIGURE_CALLS.fetch_add(1, Ordering::SeqCst);
        // after_initialization must not have run yet for anyone.
        assert_eq!(AFTER_CALLS.load(Ordering::SeqCst), 0);
        Ok(())
      }

      fn after_initialization(
        &self,
        _processing: &mut ProcessingContext,
        _injection: &mut InjectionContext,
      ) -> Result<(), BootstrapError> {
        AFTER_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
      }
    }

    let scanner = StaticScanner::new();
    let extensions: Vec<Arc<dyn ExtensionConfigurator>> =
      vec![Arc::new(Probe), Arc::new(Probe)];

    assemble_program(&scanner, ReachableTypes::everything(), &extensions, &[])
      .expect("pipeline should assemble");

    assert_eq!(CONFIGURE_CALLS.load(Ordering::SeqCst), 2);
    assert_eq!(AFTER_CALLS.load(Ordering::SeqCst), 2);
  }
}
