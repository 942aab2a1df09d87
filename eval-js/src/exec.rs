use crate::env::Scope;
use crate::error::EvalError;
use crate::execution_context;
use crate::gc;
use crate::native::HostClass;
use crate::options::EvalOptions;
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::value::Value;
use ahash::AHashMap;
use std::fmt;
use std::rc::Rc;
use tracing::instrument;

/// Entry point for running code against a fresh Global Object.
///
/// An `Evaluator` only holds configuration and registered host classes. Every call to
/// [`Evaluator::evaluate`] builds a new realm, so two evaluations never observe each other's
/// globals; values returned from one evaluation (functions included) stay usable afterwards.
pub struct Evaluator {
  options: EvalOptions,
  classes: AHashMap<PropertyKey, Rc<dyn HostClass>>,
}

impl Evaluator {
  pub fn new(options: EvalOptions) -> Self {
    Self {
      options,
      classes: AHashMap::new(),
    }
  }

  pub fn options(&self) -> &EvalOptions {
    &self.options
  }

  /// Makes `class` available to [`Scope::prototype`] and [`Scope::construct`] in later
  /// evaluations. A class registered under an existing name replaces it.
  pub fn register_class(&mut self, class: Rc<dyn HostClass>) {
    self.classes.insert(PropertyKey::new(class.name()), class);
  }

  /// Runs `code` in a new root Scope.
  pub fn evaluate<F>(&self, code: F) -> Result<Value, EvalError>
  where
    F: FnOnce(&Scope) -> Result<Value, EvalError>,
  {
    self.evaluate_with_args(&[], |scope, _args| code(scope))
  }

  /// Runs `code` in a new root Scope, passing `args` through to it.
  ///
  /// The root Scope is the active Scope while `code` runs; whatever Scope was active before is
  /// restored afterwards, whether `code` succeeds or fails. When no other evaluation or call is
  /// running on this thread, unreachable reference cycles are collected before returning.
  #[instrument(level = "debug", skip_all, fields(argc = args.len()))]
  pub fn evaluate_with_args<F>(&self, args: &[Value], code: F) -> Result<Value, EvalError>
  where
    F: FnOnce(&Scope, &[Value]) -> Result<Value, EvalError>,
  {
    let realm = Rc::new(Realm::new(&self.options, self.classes.clone()));
    let root = Scope::root(realm);
    let result = root.eval(args, code);
    if let Err(err) = &result {
      tracing::debug!(%err, "evaluation failed");
    }
    drop(root);
    if execution_context::is_idle() {
      gc::collect_cycles();
    }
    result
  }
}

impl Default for Evaluator {
  fn default() -> Self {
    Self::new(EvalOptions::default())
  }
}

impl fmt::Debug for Evaluator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut classes: Vec<_> = self.classes.keys().cloned().collect();
    classes.sort();
    f.debug_struct("Evaluator")
      .field("options", &self.options)
      .field("classes", &classes)
      .finish()
  }
}

/// Evaluates `code` with default options (console output goes to stdout).
pub fn evaluate<F>(code: F) -> Result<Value, EvalError>
where
  F: FnOnce(&Scope) -> Result<Value, EvalError>,
{
  Evaluator::default().evaluate(code)
}
