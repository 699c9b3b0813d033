use weft_ioc::{BeanInstance, BeanManager, DestructionCallback};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Test Fixtures ---

struct Widget {
  label: &'static str,
}

type TeardownLog = Arc<Mutex<Vec<&'static str>>>;

fn log_teardown(log: &TeardownLog, label: &'static str) -> DestructionCallback {
  let log = log.clone();
  Arc::new(move |_| log.lock().unwrap().push(label))
}

// --- Lifecycle Tests ---

#[test]
fn destroying_one_instance_cascades_through_its_context() {
  // Arrange: three instances created together in one child context.
  let manager = BeanManager::new();
  let log: TeardownLog = Arc::new(Mutex::new(Vec::new()));

  let context = manager.root_context().create_child("widget_graph");
  let x: BeanInstance = Arc::new(Widget { label: "x" });
  let y: BeanInstance = Arc::new(Widget { label: "y" });
  let z: BeanInstance = Arc::new(Widget { label: "z" });

  manager.register_creation(&context, x.clone(), Some(log_teardown(&log, "x")));
  manager.register_creation(&context, y.clone(), Some(log_teardown(&log, "y")));
  manager.register_creation(&context, z.clone(), Some(log_teardown(&log, "z")));

  assert!(manager.is_managed(&x));
  assert!(manager.is_managed(&z));

  // Act: destroying any instance in the context destroys the whole graph.
  manager.destroy_bean(&x);

  // Assert: teardown ran exactly once per instance, in reverse creation
  // order, and every instance left the registry indices.
  assert_eq!(*log.lock().unwrap(), vec!["z", "y", "x"]);
  assert!(!manager.is_managed(&x));
  assert!(!manager.is_managed(&y));
  assert!(!manager.is_managed(&z));
}

#[test]
fn destroy_is_idempotent_on_destroyed_and_unmanaged_references() {
  let manager = BeanManager::new();
  let teardowns = Arc::new(AtomicUsize::new(0));

  let context = manager.root_context().create_child("single");
  let widget: BeanInstance = Arc::new(Widget { label: "only" });
  {
    let teardowns = teardowns.clone();
    manager.register_creation(
      &context,
      widget.clone(),
      Some(Arc::new(move |_| {
        teardowns.fetch_add(1, Ordering::SeqCst);
      })),
    );
  }

  manager.destroy_bean(&widget);
  manager.destroy_bean(&widget);
  assert_eq!(teardowns.load(Ordering::SeqCst), 1);

  // An instance the manager never saw is a no-op too.
  let stranger: BeanInstance = Arc::new(Widget { label: "stranger" });
  manager.destroy_bean(&stranger);
  assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn proxy_references_resolve_to_the_actual_instance() {
  let manager = BeanManager::new();

  let context = manager.root_context().create_child("proxied");
  let real: BeanInstance = Arc::new(Widget { label: "real" });
  let proxy: BeanInstance = Arc::new(Widget { label: "proxy" });

  manager.register_creation(&context, real.clone(), None);
  manager.add_proxy_reference(&proxy, &real);

  assert!(manager.is_proxy_reference(&proxy));
  assert!(!manager.is_proxy_reference(&real));

  let actual = manager.actual_bean_reference(&proxy);
  assert!(Arc::ptr_eq(&actual, &real));

  // A proxy counts as managed because its real instance is.
  assert!(manager.is_managed(&proxy));
}

#[test]
fn destruction_through_a_proxy_operates_on_the_real_instance() {
  let manager = BeanManager::new();
  let log: TeardownLog = Arc::new(Mutex::new(Vec::new()));

  let context = manager.root_context().create_child("proxied");
  let real: BeanInstance = Arc::new(Widget { label: "real" });
  let proxy: BeanInstance = Arc::new(Widget { label: "proxy" });

  manager.register_creation(&context, real.clone(), Some(log_teardown(&log, "real")));
  manager.add_proxy_reference(&proxy, &real);

  // Act: destroy via the proxy handle.
  manager.destroy_bean(&proxy);

  // Assert: the real instance was torn down and both the ownership entry
  // and the proxy mapping are gone.
  assert_eq!(*log.lock().unwrap(), vec!["real"]);
  assert!(!manager.is_managed(&real));
  assert!(!manager.is_proxy_reference(&proxy));
}

#[test]
fn teardown_panic_does_not_stop_the_cascade() {
  let manager = BeanManager::new();
  let log: TeardownLog = Arc::new(Mutex::new(Vec::new()));

  let context = manager.root_context().create_child("faulty");
  let first: BeanInstance = Arc::new(Widget { label: "first" });
  let second: BeanInstance = Arc::new(Widget { label: "second" });

  manager.register_creation(&context, first.clone(), Some(log_teardown(&log, "first")));
  manager.register_creation(
    &context,
    second.clone(),
    Some(Arc::new(|_| panic!("teardown failure"))),
  );

  manager.destroy_bean(&first);

  // The panicking callback (second, destroyed first) is logged and
  // skipped; the remaining teardown still runs.
  assert_eq!(*log.lock().unwrap(), vec!["first"]);
  assert!(!manager.is_managed(&first));
  assert!(!manager.is_managed(&second));
}

#[test]
fn finish_is_a_root_only_barrier() {
  let manager = BeanManager::new();
  let root = manager.root_context();

  assert!(!root.is_finished());
  root.finish();
  assert!(root.is_finished());

  // Finishing a child context is refused.
  let child = root.create_child("child");
  child.finish();
  assert!(!child.is_finished());
}

#[test]
fn contexts_track_parents_and_scope_labels() {
  let manager = BeanManager::new();
  let root = manager.root_context();
  assert!(root.is_root());
  assert_eq!(root.scope(), weft_ioc::APPLICATION_SCOPE);
  assert!(root.parent().is_none());

  let child = root.create_child("request");
  assert!(!child.is_root());
  assert_eq!(child.scope(), "request");
  assert!(child
    .parent()
    .map(|parent| parent.is_root())
    .unwrap_or(false));
}
