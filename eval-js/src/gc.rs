//! Cycle collection for the reference-counted value graph.
//!
//! Values are `Rc` handles, so acyclic garbage is freed as soon as its last handle drops. Cycles
//! are not: a function declared in the Scope it closes over, or stored on the Global Object of the
//! realm its Scope belongs to, keeps the whole chain alive. [`collect_cycles`] finds them by trial
//! deletion. Starting from every live Object, Array and Scope, it counts the strong references each
//! reachable allocation receives from inside the traversed graph. An allocation with more strong
//! references than that is held from outside (host code, a running call) and stays alive together
//! with everything it reaches. Whatever remains is unreachable; clearing its mutable slots breaks
//! the cycles and lets `Rc` free it.
//!
//! Host closures, host objects, ambient lookups and deferred identifiers are opaque. Anything
//! they hold counts as referenced from outside, so the collector can leak through them but never
//! frees a reachable value.

use crate::env::{Scope, WeakScope};
use crate::function::Function;
use crate::object::{Object, WeakObject};
use crate::realm::Realm;
use crate::value::{Array, Value, WeakArray};
use ahash::{AHashMap, AHashSet};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::rc::Rc;

/// Implemented by every allocation the collector can see into.
pub(crate) trait Trace {
  /// Reports each strong reference this allocation holds. Returns `false` if the contents are
  /// borrowed and cannot be inspected; the allocation is then treated as live.
  fn trace(&self, tracer: &mut Tracer) -> bool;

  /// Drops everything held through interior mutability. Returns `false` if nothing was cleared.
  fn clear(&self) -> bool {
    false
  }
}

/// Collects the outgoing references reported by [`Trace::trace`].
#[derive(Default)]
pub(crate) struct Tracer {
  edges: Vec<Node>,
}

impl Tracer {
  pub(crate) fn value(&mut self, value: &Value) {
    match value {
      Value::Array(array) => self.edges.push(Node::Array(array.clone())),
      Value::Object(obj) => self.object(obj),
      Value::Function(func) => self.edges.push(Node::Function(func.clone())),
      _ => {}
    }
  }

  pub(crate) fn object(&mut self, obj: &Object) {
    self.edges.push(Node::Object(obj.clone()));
  }

  pub(crate) fn scope(&mut self, scope: &Scope) {
    self.edges.push(Node::Scope(scope.clone()));
  }

  pub(crate) fn realm(&mut self, realm: &Rc<Realm>) {
    self.edges.push(Node::Realm(realm.clone()));
  }
}

enum Node {
  Object(Object),
  Array(Array),
  Function(Function),
  Scope(Scope),
  Realm(Rc<Realm>),
}

impl Node {
  fn addr(&self) -> usize {
    match self {
      Node::Object(obj) => obj.addr(),
      Node::Array(array) => array.addr(),
      Node::Function(func) => func.addr(),
      Node::Scope(scope) => scope.addr(),
      Node::Realm(realm) => Rc::as_ptr(realm) as *const () as usize,
    }
  }

  fn strong_count(&self) -> usize {
    match self {
      Node::Object(obj) => obj.strong_count(),
      Node::Array(array) => array.strong_count(),
      Node::Function(func) => func.strong_count(),
      Node::Scope(scope) => scope.strong_count(),
      Node::Realm(realm) => Rc::strong_count(realm),
    }
  }

  fn trace(&self, tracer: &mut Tracer) -> bool {
    match self {
      Node::Object(obj) => obj.trace(tracer),
      Node::Array(array) => array.trace(tracer),
      Node::Function(func) => func.trace(tracer),
      Node::Scope(scope) => scope.trace(tracer),
      Node::Realm(realm) => {
        tracer.object(&realm.global_object());
        true
      }
    }
  }

  fn clear(&self) -> bool {
    match self {
      Node::Object(obj) => obj.clear(),
      Node::Array(array) => array.clear(),
      Node::Function(func) => func.clear(),
      Node::Scope(scope) => scope.clear(),
      Node::Realm(_) => false,
    }
  }
}

/// A mutable container created on this thread. Every reference cycle passes through one.
pub(crate) enum Candidate {
  Object(WeakObject),
  Array(WeakArray),
  Scope(WeakScope),
}

impl Candidate {
  fn upgrade(&self) -> Option<Node> {
    match self {
      Candidate::Object(obj) => obj.upgrade().map(Node::Object),
      Candidate::Array(array) => array.upgrade().map(Node::Array),
      Candidate::Scope(scope) => scope.upgrade().map(Node::Scope),
    }
  }

  fn is_alive(&self) -> bool {
    match self {
      Candidate::Object(obj) => obj.is_alive(),
      Candidate::Array(array) => array.is_alive(),
      Candidate::Scope(scope) => scope.is_alive(),
    }
  }
}

const MIN_PRUNE_AT: usize = 1024;

struct Registry {
  candidates: Vec<Candidate>,
  /// Length at which dead entries are dropped from `candidates`.
  prune_at: usize,
}

thread_local! {
  static REGISTRY: RefCell<Registry> = const {
    RefCell::new(Registry {
      candidates: Vec::new(),
      prune_at: MIN_PRUNE_AT,
    })
  };
}

pub(crate) fn register(candidate: Candidate) {
  let _ = REGISTRY.try_with(|registry| {
    let Ok(mut registry) = registry.try_borrow_mut() else {
      return;
    };
    registry.candidates.push(candidate);
    if registry.candidates.len() >= registry.prune_at {
      registry.candidates.retain(Candidate::is_alive);
      registry.prune_at = (registry.candidates.len() * 2).max(MIN_PRUNE_AT);
    }
  });
}

struct GraphEntry {
  node: Node,
  /// Strong references coming from other traversed allocations.
  internal: usize,
  edges: Vec<usize>,
  opaque: bool,
}

/// Frees unreachable reference cycles among the values created on this thread.
///
/// Runs automatically when an outermost evaluation returns; hosts that keep functions past their
/// evaluation can call it after dropping them. Returns the number of allocations cleared.
pub fn collect_cycles() -> usize {
  let candidates = REGISTRY
    .try_with(|registry| {
      registry
        .try_borrow_mut()
        .map(|mut registry| std::mem::take(&mut registry.candidates))
        .unwrap_or_default()
    })
    .unwrap_or_default();

  let cleared = clear_unreachable(&candidates);

  let survivors: Vec<_> = candidates.into_iter().filter(Candidate::is_alive).collect();
  let _ = REGISTRY.try_with(|registry| {
    if let Ok(mut registry) = registry.try_borrow_mut() {
      let registered_meanwhile = std::mem::replace(&mut registry.candidates, survivors);
      registry.candidates.extend(registered_meanwhile);
      registry.prune_at = (registry.candidates.len() * 2).max(MIN_PRUNE_AT);
    }
  });

  tracing::debug!(target: "eval_js::gc", cleared, "cycle collection");
  cleared
}

fn clear_unreachable(candidates: &[Candidate]) -> usize {
  // The graph holds exactly one handle per allocation; every other temporary handle is dropped
  // before strong counts are read.
  let mut graph: AHashMap<usize, GraphEntry> = AHashMap::new();
  let mut pending = Vec::new();
  for candidate in candidates {
    let Some(node) = candidate.upgrade() else {
      continue;
    };
    let addr = node.addr();
    if let Entry::Vacant(slot) = graph.entry(addr) {
      slot.insert(GraphEntry {
        node,
        internal: 0,
        edges: Vec::new(),
        opaque: false,
      });
      pending.push(addr);
    }
  }

  while let Some(addr) = pending.pop() {
    let mut tracer = Tracer::default();
    let traced = match graph.get(&addr) {
      Some(entry) => entry.node.trace(&mut tracer),
      None => continue,
    };
    let mut edges = Vec::with_capacity(tracer.edges.len());
    for child in tracer.edges {
      let child_addr = child.addr();
      match graph.entry(child_addr) {
        Entry::Occupied(mut slot) => slot.get_mut().internal += 1,
        Entry::Vacant(slot) => {
          slot.insert(GraphEntry {
            node: child,
            internal: 1,
            edges: Vec::new(),
            opaque: false,
          });
          pending.push(child_addr);
        }
      }
      edges.push(child_addr);
    }
    if let Some(entry) = graph.get_mut(&addr) {
      entry.edges = edges;
      entry.opaque = !traced;
    }
  }

  // Held from outside: more strong references than the graph plus our own handle account for.
  let mut live: Vec<usize> = graph
    .iter()
    .filter(|(_, entry)| entry.opaque || entry.node.strong_count() > entry.internal + 1)
    .map(|(addr, _)| *addr)
    .collect();
  let mut marked: AHashSet<usize> = live.iter().copied().collect();
  while let Some(addr) = live.pop() {
    if let Some(entry) = graph.get(&addr) {
      for child in &entry.edges {
        if marked.insert(*child) {
          live.push(*child);
        }
      }
    }
  }

  let cleared = graph
    .iter()
    .filter(|(addr, _)| !marked.contains(*addr))
    .filter(|(_, entry)| entry.node.clear())
    .count();
  drop(graph);
  cleared
}
