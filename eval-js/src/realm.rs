use crate::console;
use crate::error::EvalError;
use crate::native::HostClass;
use crate::object::Object;
use crate::options::{EvalOptions, Limits};
use crate::property::PropertyKey;
use crate::value::Value;
use ahash::AHashMap;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Per-evaluation state shared by every Scope of one evaluation: the Global Object, the registered
/// host classes and call-depth accounting.
///
/// Each call to [`Evaluator::evaluate`](crate::Evaluator::evaluate) creates a new realm, so globals
/// never leak between evaluations.
pub(crate) struct Realm {
  global_object: Object,
  classes: AHashMap<PropertyKey, Rc<dyn HostClass>>,
  limits: Limits,
  depth: Cell<usize>,
}

impl Realm {
  pub(crate) fn new(options: &EvalOptions, classes: AHashMap<PropertyKey, Rc<dyn HostClass>>) -> Self {
    let global_object = Object::new();
    global_object.set(
      "console",
      Value::Object(console::console_object(options.console.clone())),
    );

    Self {
      global_object,
      classes,
      limits: options.limits.clone(),
      depth: Cell::new(0),
    }
  }

  pub(crate) fn global_object(&self) -> Object {
    self.global_object.clone()
  }

  pub(crate) fn class(&self, name: &str) -> Option<Rc<dyn HostClass>> {
    self.classes.get(name).cloned()
  }

  /// Records entry into a function call. The returned guard records the exit when dropped.
  pub(crate) fn enter_call(&self) -> Result<CallDepthGuard<'_>, EvalError> {
    let depth = self.depth.get();
    if depth >= self.limits.max_call_depth {
      return Err(EvalError::StackOverflow {
        limit: self.limits.max_call_depth,
      });
    }
    self.depth.set(depth + 1);
    Ok(CallDepthGuard { realm: self })
  }

  #[cfg(test)]
  pub(crate) fn call_depth(&self) -> usize {
    self.depth.get()
  }
}

impl fmt::Debug for Realm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Realm")
      .field("limits", &self.limits)
      .field("depth", &self.depth.get())
      .finish_non_exhaustive()
  }
}

pub(crate) struct CallDepthGuard<'a> {
  realm: &'a Realm,
}

impl Drop for CallDepthGuard<'_> {
  fn drop(&mut self) {
    let depth = self.realm.depth.get();
    self.realm.depth.set(depth.saturating_sub(1));
  }
}
