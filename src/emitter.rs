//! The emission boundary: turns an ordered wiring program into a loadable
//! bootstrap unit, plus the generation cache that lets a bootstrap skip
//! graph construction entirely.

use crate::classifier::WiringRole;
use crate::container::ApplicationContext;
use crate::error::BootstrapError;
use crate::graph::WiringStatement;
use crate::manager::BeanManager;
use crate::qualifier::QualifyingMetadata;
use crate::scanner::{BootstrapTaskFn, TypeDescriptor, TypeScanner};

use parking_lot::Mutex;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

/// Wiring statements are grouped into batches of this size, and each batch
/// becomes its own emitted unit invoked in sequence. This bounds the size
/// of any single generated unit; batch boundaries carry no ordering
/// significance beyond preserving the overall statement sequence.
pub const DECLARATION_BATCH_SIZE: usize = 500;

/// Kind of member a cross-boundary access stub is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureKind {
  Field,
  Method,
}

/// Access level a field stub must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateAccess {
  Read,
  Write,
  Both,
}

/// A private field or method the wiring program needed cross-boundary
/// access to. Emitters that materialize source text generate accessor
/// stubs from these; the in-process backend has nothing to generate and
/// carries them through untouched.
#[derive(Debug, Clone)]
pub struct Exposure {
  pub owner: Arc<str>,
  pub member: String,
  pub kind: ExposureKind,
  pub access: PrivateAccess,
}

/// The fully assembled wiring program, in execution order: before-tasks,
/// then the batched declaration statements, then exposure stubs, then
/// after-tasks.
pub struct WiringProgram {
  pub before_tasks: Vec<(Arc<str>, BootstrapTaskFn)>,
  pub batches: Vec<Vec<WiringStatement>>,
  pub exposures: Vec<Exposure>,
  pub after_tasks: Vec<(Arc<str>, BootstrapTaskFn)>,
}

impl WiringProgram {
  pub fn statement_count(&self) -> usize {
    self.batches.iter().map(Vec::len).sum()
  }
}

/// A loadable bootstrap unit: executing it populates a fresh bean manager
/// and root creational context.
pub trait Bootstrapper: Send + Sync {
  fn bootstrap_container(&self) -> Result<ApplicationContext, BootstrapError>;
}

/// The compilation backend. Accepts the ordered wiring program plus the
/// declared exposures and produces a loadable unit; the wiring core does
/// not care how.
pub trait CodeEmitter: Send + Sync {
  fn emit(
    &self,
    program: WiringProgram,
    qualifying: Arc<dyn QualifyingMetadata>,
  ) -> Result<Arc<dyn Bootstrapper>, BootstrapError>;
}

/// The in-crate backend: packages each statement batch into a directly
/// executable unit, with no source text involved.
pub struct InProcessEmitter;

impl CodeEmitter for InProcessEmitter {
  fn emit(
    &self,
    program: WiringProgram,
    qualifying: Arc<dyn QualifyingMetadata>,
  ) -> Result<Arc<dyn Bootstrapper>, BootstrapError> {
    Ok(Arc::new(InProcessBootstrapper {
      program,
      qualifying,
    }))
  }
}

struct InProcessBootstrapper {
  program: WiringProgram,
  qualifying: Arc<dyn QualifyingMetadata>,
}

impl Bootstrapper for InProcessBootstrapper {
  fn bootstrap_container(&self) -> Result<ApplicationContext, BootstrapError> {
    let manager = BeanManager::with_qualifying(self.qualifying.clone());

    for (name, task) in &self.program.before_tasks {
      tracing::debug!(task = %name, "running bootstrap task");
      task();
    }

    for batch in &self.program.batches {
      declare_batch(&manager, batch);
    }

    for (name, task) in &self.program.after_tasks {
      tracing::debug!(task = %name, "running bootstrap task");
      task();
    }

    Ok(ApplicationContext::new(manager))
  }
}

/// Executes one declaration batch against the manager. Each batch is its
/// own unit so no single unit grows unboundedly with the component count.
fn declare_batch(manager: &Arc<BeanManager>, batch: &[WiringStatement]) {
  for statement in batch {
    match statement {
      WiringStatement::DeclareBean { descriptor, scope }
      | WiringStatement::InvokeProvider {
        descriptor, scope, ..
      } => {
        declare_bean(manager, descriptor, *scope);
      }
      WiringStatement::ReadProvided { descriptor } => {
        // The shared value was materialized by an earlier statement;
        // wiring sites read the cached accessor at this point.
        tracing::debug!(type_name = %descriptor.name(), "provided value already materialized");
      }
    }
  }
}

fn declare_bean(manager: &Arc<BeanManager>, descriptor: &Arc<TypeDescriptor>, scope: WiringRole) {
  let Some(callback) = descriptor.construct().cloned() else {
    return;
  };

  let instance = match scope {
    WiringRole::Singleton => {
      let root = manager.root_context().clone();
      Some(callback(manager, &root))
    }
    _ => None,
  };

  manager.add_bean(
    descriptor.contract(),
    descriptor.implementation(),
    callback,
    instance,
    descriptor.qualifiers().to_vec(),
    descriptor.bean_name().map(str::to_string),
    descriptor.is_concrete(),
  );
}

struct CachedUnit {
  fingerprint: u64,
  bootstrapper: Arc<dyn Bootstrapper>,
}

/// A process-lifetime cache of the compiled wiring program, keyed by a
/// classpath-snapshot fingerprint.
///
/// The cache is an explicit object handed to the bootstrap entry point and
/// guarded by one mutex; its lifecycle is tied to process start and
/// classpath change, never to ambient global state. A cold cache simply
/// means the program is assembled and emitted; a hit skips straight to the
/// previously produced unit.
#[derive(Default)]
pub struct GenerationCache {
  slot: Mutex<Option<CachedUnit>>,
}

impl GenerationCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn lookup(&self, fingerprint: u64) -> Option<Arc<dyn Bootstrapper>> {
    let slot = self.slot.lock();
    slot
      .as_ref()
      .filter(|unit| unit.fingerprint == fingerprint)
      .map(|unit| unit.bootstrapper.clone())
  }

  pub fn store(&self, fingerprint: u64, bootstrapper: Arc<dyn Bootstrapper>) {
    *self.slot.lock() = Some(CachedUnit {
      fingerprint,
      bootstrapper,
    });
  }

  pub fn invalidate(&self) {
    *self.slot.lock() = None;
  }
}

// Fixed seeds keep the fingerprint stable across processes, which matters
// the moment a cache outlives the process that wrote it.
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
  0x575e_f715_37ab_8b01,
  0x0da1_9353_21b4_86e5,
  0x9e37_79b9_7f4a_7c15,
  0xc2b2_ae3d_27d4_eb4f,
);

/// Fingerprint of the scanner's current snapshot: candidate names and the
/// markers on them, in scanner order.
pub fn classpath_fingerprint(scanner: &dyn TypeScanner) -> u64 {
  let state = ahash::RandomState::with_seeds(
    FINGERPRINT_SEEDS.0,
    FINGERPRINT_SEEDS.1,
    FINGERPRINT_SEEDS.2,
    FINGERPRINT_SEEDS.3,
  );
  let mut hasher = state.build_hasher();

  for descriptor in scanner.candidate_types() {
    descriptor.name().hash(&mut hasher);
    for marker in scanner.markers_on(descriptor.name()) {
      marker.hash(&mut hasher);
    }
  }

  hasher.finish()
}
