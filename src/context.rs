//! Creational contexts: scoped sets of co-created instances with shared
//! teardown.

use crate::definition::{BeanInstance, DestructionCallback};

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Scope label of the root context, which represents the whole-application
/// singleton scope.
pub const APPLICATION_SCOPE: &str = "application";

/// A record of all instances created together, their teardown callbacks and
/// their parent/child relationship.
///
/// The sole root context is created at bootstrap and lives for the
/// application lifetime. Additional contexts are created per
/// dependent-scoped object-graph request and destroyed when that graph is
/// disposed. Every live managed instance maps to exactly one owning
/// context.
pub struct CreationalContext {
  parent: Option<Arc<CreationalContext>>,
  scope: Arc<str>,
  root: bool,
  finished: AtomicBool,
  created: Mutex<Vec<(BeanInstance, Option<DestructionCallback>)>>,
}

impl CreationalContext {
  pub(crate) fn root() -> Arc<Self> {
    Arc::new(Self {
      parent: None,
      scope: Arc::from(APPLICATION_SCOPE),
      root: true,
      finished: AtomicBool::new(false),
      created: Mutex::new(Vec::new()),
    })
  }

  /// Allocates a child context, used when a dependent-scoped object graph
  /// is materialized.
  pub fn create_child(self: &Arc<Self>, scope: &str) -> Arc<CreationalContext> {
    Arc::new(Self {
      parent: Some(self.clone()),
      scope: Arc::from(scope),
      root: false,
      finished: AtomicBool::new(false),
      created: Mutex::new(Vec::new()),
    })
  }

  pub fn scope(&self) -> &str {
    &self.scope
  }

  pub fn is_root(&self) -> bool {
    self.root
  }

  pub fn parent(&self) -> Option<&Arc<CreationalContext>> {
    self.parent.as_ref()
  }

  /// Appends an instance (and its optional teardown callback) to this
  /// context, in creation order.
  pub fn record_creation(&self, instance: BeanInstance, teardown: Option<DestructionCallback>) {
    self.created.lock().push((instance, teardown));
  }

  /// Snapshot of every instance this context caused to be created, in
  /// creation order. Empty once the context has been destroyed.
  pub fn all_created_instances(&self) -> Vec<BeanInstance> {
    self
      .created
      .lock()
      .iter()
      .map(|(instance, _)| instance.clone())
      .collect()
  }

  /// Invokes every recorded teardown callback in reverse creation order,
  /// then clears the owned-instance list. Destroying twice is a no-op the
  /// second time.
  ///
  /// A panicking teardown callback is logged and the cascade continues;
  /// aborting mid-cascade would leave later instances without their
  /// teardown.
  pub fn destroy(&self) {
    let drained = std::mem::take(&mut *self.created.lock());

    for (instance, teardown) in drained.into_iter().rev() {
      if let Some(teardown) = teardown {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| teardown(&instance)));
        if outcome.is_err() {
          tracing::error!(
            scope = %self.scope,
            "teardown callback panicked during context destruction; continuing cascade"
          );
        }
      }
    }
  }

  /// Lifecycle barrier called once, on the root context only, after the
  /// bootstrap wiring program completes. Signals that eager singleton
  /// materialization is done and the application may begin serving
  /// lookups. This mutates no data.
  pub fn finish(&self) {
    if !self.root {
      tracing::warn!(scope = %self.scope, "finish() called on a non-root creational context");
      return;
    }
    if self.finished.swap(true, Ordering::SeqCst) {
      tracing::warn!("root creational context finished more than once");
    }
  }

  pub fn is_finished(&self) -> bool {
    self.finished.load(Ordering::SeqCst)
  }
}
