//! The container bootstrap entry point and the populated application
//! context it hands back.

use crate::context::CreationalContext;
use crate::definition::BeanInstance;
use crate::emitter::{classpath_fingerprint, CodeEmitter, GenerationCache, InProcessEmitter};
use crate::error::BootstrapError;
use crate::manager::BeanManager;
use crate::pipeline::{assemble_program, DecoratorBinding, ExtensionConfigurator};
use crate::reachability::ReachableTypes;
use crate::scanner::TypeScanner;

use std::sync::Arc;
use std::time::Instant;

/// The runtime context returned by a successful bootstrap: the populated
/// bean manager and, through it, the root creational context.
pub struct ApplicationContext {
  manager: Arc<BeanManager>,
}

impl ApplicationContext {
  pub(crate) fn new(manager: Arc<BeanManager>) -> Self {
    Self { manager }
  }

  pub fn bean_manager(&self) -> &Arc<BeanManager> {
    &self.manager
  }

  pub fn root_context(&self) -> &Arc<CreationalContext> {
    self.manager.root_context()
  }

  /// A cloneable handle for disposing managed instances without holding
  /// the whole context.
  pub fn disposer(&self) -> Disposer {
    Disposer {
      manager: self.manager.clone(),
    }
  }
}

/// Disposes managed bean instances; destruction cascades through the
/// instance's creational context.
#[derive(Clone)]
pub struct Disposer {
  manager: Arc<BeanManager>,
}

impl Disposer {
  pub fn dispose(&self, reference: &BeanInstance) {
    self.manager.destroy_bean(reference);
  }
}

/// Bootstraps a wired application from a scanner snapshot.
///
/// The container assembles the wiring program (or replays a cached unit),
/// executes it to populate a fresh bean manager, finishes the root
/// creational context and returns the application context. Each bootstrap
/// produces a fresh manager, so repeated bootstraps never leak definitions
/// into one another.
pub struct Container {
  scanner: Arc<dyn TypeScanner>,
  reachable: ReachableTypes,
  emitter: Arc<dyn CodeEmitter>,
  cache: Arc<GenerationCache>,
  extensions: Vec<Arc<dyn ExtensionConfigurator>>,
  decorators: Vec<DecoratorBinding>,
}

impl Container {
  /// A container over the given scanner, with pruning disabled, the
  /// in-process emitter and a fresh generation cache.
  pub fn new(scanner: Arc<dyn TypeScanner>) -> Self {
    Self {
      scanner,
      reachable: ReachableTypes::everything(),
      emitter: Arc::new(InProcessEmitter),
      cache: Arc::new(GenerationCache::new()),
      extensions: Vec::new(),
      decorators: Vec::new(),
    }
  }

  /// Supplies real reachability data, enabling wiring pruning.
  pub fn with_reachability(mut self, reachable: ReachableTypes) -> Self {
    self.reachable = reachable;
    self
  }

  pub fn with_emitter(mut self, emitter: Arc<dyn CodeEmitter>) -> Self {
    self.emitter = emitter;
    self
  }

  /// Shares a generation cache across containers, typically one per
  /// process tied to the classpath snapshot.
  pub fn with_cache(mut self, cache: Arc<GenerationCache>) -> Self {
    self.cache = cache;
    self
  }

  pub fn with_extension(mut self, extension: Arc<dyn ExtensionConfigurator>) -> Self {
    self.extensions.push(extension);
    self
  }

  pub fn with_decorator(mut self, binding: DecoratorBinding) -> Self {
    self.decorators.push(binding);
    self
  }

  /// Runs the bootstrap and returns the populated application context.
  pub fn bootstrap(&self) -> Result<ApplicationContext, BootstrapError> {
    let started = Instant::now();
    let fingerprint = classpath_fingerprint(&*self.scanner);

    let bootstrapper = match self.cache.lookup(fingerprint) {
      Some(cached) => {
        tracing::debug!("wiring program cache hit; skipping graph construction");
        cached
      }
      None => {
        tracing::info!("generating container wiring program...");
        let (program, qualifying) = assemble_program(
          &*self.scanner,
          self.reachable.clone(),
          &self.extensions,
          &self.decorators,
        )?;
        let bootstrapper = self.emitter.emit(program, qualifying)?;
        self.cache.store(fingerprint, bootstrapper.clone());
        bootstrapper
      }
    };

    let application = bootstrapper.bootstrap_container()?;
    application.root_context().finish();

    tracing::info!(
      elapsed_ms = started.elapsed().as_millis() as u64,
      beans = application.bean_manager().registered_bean_count(),
      "container bootstrapped"
    );

    Ok(application)
  }
}
