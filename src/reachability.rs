//! Reachability analysis: which types are exercised by the live
//! application graph, used to prune unused wiring.

use dashmap::DashSet;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Information about whether types are reachable from the live application
/// graph.
///
/// When backed by real analysis data the oracle answers from its set; the
/// permissive [`ReachableTypes::everything`] instance reports every type
/// reachable, which disables pruning entirely.
#[derive(Clone)]
pub struct ReachableTypes {
  reachable: Option<HashSet<String>>,
}

impl ReachableTypes {
  /// A reusable oracle that reports all types as reachable and analysis as
  /// disabled.
  pub fn everything() -> Self {
    Self { reachable: None }
  }

  /// An oracle backed by real analysis data.
  pub fn from_set(reachable: HashSet<String>) -> Self {
    Self {
      reachable: Some(reachable),
    }
  }

  /// True when real analysis is in use and no types are presently
  /// considered reachable.
  pub fn is_empty(&self) -> bool {
    self.reachable.as_ref().map(HashSet::is_empty).unwrap_or(false)
  }

  /// True when the named type is reachable, or when analysis is disabled.
  pub fn contains(&self, name: &str) -> bool {
    self
      .reachable
      .as_ref()
      .map(|set| set.contains(name))
      .unwrap_or(true)
  }

  /// Adds a type to the reachable set. Returns true when analysis is
  /// enabled and the type was not already present.
  pub fn add(&mut self, name: impl Into<String>) -> bool {
    match self.reachable.as_mut() {
      Some(set) => set.insert(name.into()),
      None => false,
    }
  }

  /// Whether this oracle reports true analysis data or blindly reports
  /// everything reachable.
  pub fn is_based_on_analysis(&self) -> bool {
    self.reachable.is_some()
  }

  /// The reachable names, or `None` when everything is reachable.
  pub fn to_names(&self) -> Option<&HashSet<String>> {
    self.reachable.as_ref()
  }
}

/// One candidate source artifact to analyze: the type it defines and its
/// source text.
pub struct SourceArtifact {
  pub type_name: Arc<str>,
  pub source: String,
}

struct PoolState {
  queue: Mutex<VecDeque<SourceArtifact>>,
  active: Mutex<usize>,
  done: Condvar,
}

/// Runs reachability analysis over candidate source artifacts on a bounded
/// worker pool.
///
/// Pool size is the available parallelism; each task lexically scans one
/// artifact and merges the type names it discovers into one shared set.
/// Tasks have no ordering dependency on each other. The call blocks until
/// all tasks complete or `timeout` elapses; on timeout the set gathered so
/// far is returned and a warning is logged.
pub fn analyze_reachability(artifacts: Vec<SourceArtifact>, timeout: Duration) -> ReachableTypes {
  let started = Instant::now();
  let task_count = artifacts.len();

  let discovered: Arc<DashSet<String>> = Arc::new(DashSet::new());
  let workers = num_cpus::get().min(task_count.max(1));
  let state = Arc::new(PoolState {
    queue: Mutex::new(VecDeque::from(artifacts)),
    active: Mutex::new(workers),
    done: Condvar::new(),
  });

  for _ in 0..workers {
    let state = state.clone();
    let discovered = discovered.clone();
    thread::spawn(move || {
      loop {
        let artifact = state.queue.lock().pop_front();
        let Some(artifact) = artifact else {
          break;
        };
        scan_type_dependencies(&artifact.source, &discovered);
        discovered.insert(artifact.type_name.to_string());
      }
      let mut active = state.active.lock();
      *active -= 1;
      if *active == 0 {
        state.done.notify_all();
      }
    });
  }

  {
    let mut active = state.active.lock();
    while *active > 0 {
      if state
        .done
        .wait_for(&mut active, timeout.saturating_sub(started.elapsed()))
        .timed_out()
      {
        tracing::warn!(
          pending_workers = *active,
          "reachability analysis timed out; proceeding with partial results"
        );
        break;
      }
    }
  }

  let reachable: HashSet<String> = discovered.iter().map(|entry| entry.key().clone()).collect();

  tracing::debug!(
    artifacts = task_count,
    reachable = reachable.len(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    "reachability analysis complete"
  );

  ReachableTypes::from_set(reachable)
}

/// Lexical dependency scan: collects identifier tokens that look like type
/// names (leading uppercase), including the segments of qualified paths.
fn scan_type_dependencies(source: &str, out: &DashSet<String>) {
  let mut token = String::new();
  for ch in source.chars() {
    if ch.is_alphanumeric() || ch == '_' {
      token.push(ch);
    } else {
      flush_token(&mut token, out);
    }
  }
  flush_token(&mut token, out);
}

fn flush_token(token: &mut String, out: &DashSet<String>) {
  if token
    .chars()
    .next()
    .map(|c| c.is_ascii_uppercase())
    .unwrap_or(false)
  {
    out.insert(std::mem::take(token));
  } else {
    token.clear();
  }
}
