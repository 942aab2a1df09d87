//! Lexical environments.
//!
//! A [`Scope`] is one link of the environment chain. The root Scope of an evaluation owns the
//! realm (and through it the Global Object); every function call spawns a child Scope whose parent
//! is the callee's defining Scope. Scopes are reference counted so a closure keeps its defining
//! chain alive after the creating call returns.

use crate::error::EvalError;
use crate::execution_context;
use crate::function::{self, Body, Function};
use crate::gc::{self, Trace, Tracer};
use crate::native::Prototype;
use crate::object::Object;
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::value::{Identifier, Value};
use ahash::AHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Bindings owned by a single Scope.
pub type Locals = AHashMap<PropertyKey, Value>;

/// Host-provided bindings consulted before a Scope's own locals.
///
/// This lets an embedding expose variables that live outside the evaluation (for example, the
/// locals of the host code that drives it) without declaring them in the Scope.
pub trait AmbientLookup {
  fn get(&self, name: &str) -> Option<Value>;

  /// Updates an existing ambient binding. Returns `false` if `name` is not an ambient binding, in
  /// which case assignment continues outward.
  fn set(&self, _name: &str, _value: &Value) -> bool {
    false
  }
}

/// Outcome of walking the scope chain for a name.
#[derive(Clone, Debug)]
pub enum Resolution {
  Value(Value),
  Function(Function),
  Unresolved,
}

struct ScopeData {
  parent: Option<Scope>,
  realm: Rc<Realm>,
  locals: RefCell<Locals>,
  target: Value,
  ambient: RefCell<Option<Rc<dyn AmbientLookup>>>,
}

/// A lexical environment.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

impl Scope {
  /// The root Scope of `realm`; `this` is the Global Object.
  pub(crate) fn root(realm: Rc<Realm>) -> Self {
    let target = Value::Object(realm.global_object());
    Self::register(ScopeData {
      parent: None,
      realm,
      locals: RefCell::new(Locals::default()),
      target,
      ambient: RefCell::new(None),
    })
  }

  fn register(data: ScopeData) -> Scope {
    let scope = Scope(Rc::new(data));
    gc::register(gc::Candidate::Scope(WeakScope(Rc::downgrade(&scope.0))));
    scope
  }

  /// Creates a child Scope.
  ///
  /// `target` overrides `this` for the child; `None` inherits this Scope's receiver.
  pub fn spawn(&self, target: Option<Value>, locals: Locals) -> Scope {
    Self::register(ScopeData {
      parent: Some(self.clone()),
      realm: self.0.realm.clone(),
      locals: RefCell::new(locals),
      target: target.unwrap_or_else(|| self.0.target.clone()),
      ambient: RefCell::new(None),
    })
  }

  pub fn parent(&self) -> Option<&Scope> {
    self.0.parent.as_ref()
  }

  pub fn is_root(&self) -> bool {
    self.0.parent.is_none()
  }

  pub(crate) fn realm(&self) -> &Rc<Realm> {
    &self.0.realm
  }

  /// The Global Object shared by every Scope of this evaluation (`window`, `global`).
  pub fn global_object(&self) -> Object {
    self.0.realm.global_object()
  }

  /// The receiver (`this`) active in this Scope.
  pub fn this_value(&self) -> Value {
    self.0.target.clone()
  }

  /// Installs (or clears) the ambient lookup consulted by this Scope.
  pub fn set_ambient(&self, ambient: Option<Rc<dyn AmbientLookup>>) {
    *self.0.ambient.borrow_mut() = ambient;
  }

  /// A binding held directly in this Scope's locals.
  pub fn local(&self, name: &str) -> Option<Value> {
    self.0.locals.borrow().get(name).cloned()
  }

  fn own_binding(&self, name: &str) -> Option<Value> {
    let ambient = self.0.ambient.borrow().clone();
    if let Some(value) = ambient.and_then(|ambient| ambient.get(name)) {
      return Some(value);
    }
    if let Some(value) = self.local(name) {
      return Some(value);
    }
    if self.is_root() {
      let global = self.global_object();
      if global.has_own_or_inherited(name) {
        return Some(global.get(name));
      }
    }
    None
  }

  /// Walks the chain for `name`: ambient bindings, then locals, then (at the root) the Global
  /// Object, then the parent.
  pub fn lookup(&self, name: &str) -> Resolution {
    let mut current = Some(self);
    while let Some(scope) = current {
      if let Some(value) = scope.own_binding(name) {
        return match value {
          Value::Function(func) => Resolution::Function(func),
          value => Resolution::Value(value),
        };
      }
      current = scope.parent();
    }
    Resolution::Unresolved
  }

  /// Plain variable read: the bound value (functions are not invoked), or a deferred
  /// [`Identifier`] if nothing binds `name`.
  pub fn reference(&self, name: &str) -> Value {
    match self.lookup(name) {
      Resolution::Value(value) => value,
      Resolution::Function(func) => Value::Function(func),
      Resolution::Unresolved => Value::Identifier(Identifier::new(name)),
    }
  }

  /// Bare-name reference with call syntax.
  ///
  /// - A function binding is called with `args` and this Scope's receiver.
  /// - Any other binding is returned as-is; `args` are ignored.
  /// - An unresolved name produces a deferred [`Identifier`] carrying `args`, or, when `body` is
  ///   given, a new function named `name` whose parameters are the identifiers in `args`.
  pub fn resolve(&self, name: &str, args: &[Value], body: Option<Body>) -> Result<Value, EvalError> {
    match self.lookup(name) {
      Resolution::Function(func) => {
        tracing::trace!(target: "eval_js::scope", name, "resolved to function");
        func.call(self.this_value(), args)
      }
      Resolution::Value(value) => {
        tracing::trace!(target: "eval_js::scope", name, "resolved to value");
        Ok(value)
      }
      Resolution::Unresolved => match body {
        None => {
          tracing::debug!(target: "eval_js::scope", name, "unresolved name deferred");
          Ok(Value::Identifier(Identifier::with_args(name, args)))
        }
        Some(body) => {
          let params = args
            .iter()
            .map(|arg| match arg {
              Value::Identifier(id) => Ok(id.clone()),
              _ => Err(EvalError::TypeError("function parameters must be identifiers")),
            })
            .collect::<Result<Vec<_>, _>>()?;
          Ok(Value::Function(Function::new(
            Some(PropertyKey::new(name)),
            params,
            body,
            self,
          )))
        }
      },
    }
  }

  /// Calls the function bound to `name` (see [`Scope::resolve`]).
  pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    self.resolve(name, args, None)
  }

  /// `var`/`let` declaration: binds `name` in this Scope's locals.
  pub fn declare(&self, name: &str, value: Value) {
    self
      .0
      .locals
      .borrow_mut()
      .insert(PropertyKey::new(name), value);
  }

  /// Assignment to a bare name.
  ///
  /// Updates the nearest ambient or local binding of `name`. A name bound nowhere becomes a
  /// property of the Global Object; assignment never creates a Scope-local binding.
  pub fn assign(&self, name: &str, value: Value) {
    let mut current = Some(self);
    while let Some(scope) = current {
      let ambient = scope.0.ambient.borrow().clone();
      if ambient.is_some_and(|ambient| ambient.set(name, &value)) {
        return;
      }
      if let Some(slot) = scope.0.locals.borrow_mut().get_mut(name) {
        *slot = value;
        return;
      }
      current = scope.parent();
    }
    tracing::debug!(target: "eval_js::scope", name, "assignment to global object");
    self.global_object().set(name, value);
  }

  /// An anonymous function expression closing over this Scope.
  pub fn function(
    &self,
    params: &[&str],
    body: impl Fn(&Scope, &[Value]) -> Result<Value, EvalError> + 'static,
  ) -> Function {
    let params = params.iter().map(|param| Identifier::new(*param)).collect();
    Function::new(None, params, function::body(body), self)
  }

  /// Hoists a named function: into the Global Object at the root, into the locals otherwise.
  pub fn declare_function(&self, func: &Function) -> Result<(), EvalError> {
    let name = func
      .name()
      .ok_or(EvalError::TypeError("function declarations require a name"))?;
    if self.is_root() {
      self.global_object().set(name, Value::Function(func.clone()));
    } else {
      self.declare(name, Value::Function(func.clone()));
    }
    Ok(())
  }

  /// `function name(params) { body }` as a statement.
  ///
  /// Goes through the same fallback as an unresolved reference with a body, then hoists the
  /// result. A name that already resolves yields that binding instead and nothing is declared.
  pub fn function_declaration(
    &self,
    name: &str,
    params: &[&str],
    body: impl Fn(&Scope, &[Value]) -> Result<Value, EvalError> + 'static,
  ) -> Result<Value, EvalError> {
    let args: Vec<Value> = params
      .iter()
      .map(|param| Value::Identifier(Identifier::new(*param)))
      .collect();
    let value = match self.lookup(name) {
      Resolution::Unresolved => self.resolve(name, &args, Some(function::body(body)))?,
      Resolution::Function(func) => Value::Function(func),
      Resolution::Value(value) => value,
    };
    if let Value::Function(func) = &value {
      if func.name() == Some(name) {
        self.declare_function(func)?;
      }
    }
    Ok(value)
  }

  /// Runs `code` with this Scope as the active Scope, restoring the previous one afterwards.
  pub fn eval<F>(&self, args: &[Value], code: F) -> Result<Value, EvalError>
  where
    F: FnOnce(&Scope, &[Value]) -> Result<Value, EvalError>,
  {
    let _active = execution_context::enter(self.clone());
    code(self, args)
  }

  /// The prototype of a host class registered with the evaluator (`Name.prototype`).
  pub fn prototype(&self, class_name: &str) -> Result<Prototype, EvalError> {
    let class = self
      .0
      .realm
      .class(class_name)
      .ok_or_else(|| EvalError::UnknownClass(class_name.to_string()))?;
    Ok(Prototype::new(class))
  }

  /// `new Name(args...)`, with the class name and arguments taken from a deferred reference.
  pub fn construct(&self, identifier: &Identifier) -> Result<Value, EvalError> {
    let class_name = identifier.name().as_str();
    let class = self
      .0
      .realm
      .class(class_name)
      .ok_or_else(|| EvalError::UnknownClass(class_name.to_string()))?;
    class.construct(identifier.args())
  }

  /// Identity comparison.
  pub fn same_instance(&self, other: &Scope) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  pub(crate) fn addr(&self) -> usize {
    Rc::as_ptr(&self.0) as *const () as usize
  }

  pub(crate) fn strong_count(&self) -> usize {
    Rc::strong_count(&self.0)
  }
}

impl Trace for Scope {
  fn trace(&self, tracer: &mut Tracer) -> bool {
    let Ok(locals) = self.0.locals.try_borrow() else {
      return false;
    };
    for value in locals.values() {
      tracer.value(value);
    }
    drop(locals);
    if let Some(parent) = &self.0.parent {
      tracer.scope(parent);
    }
    tracer.realm(&self.0.realm);
    tracer.value(&self.0.target);
    // Ambient bindings belong to the host and are opaque.
    true
  }

  fn clear(&self) -> bool {
    let (Ok(mut locals), Ok(mut ambient)) =
      (self.0.locals.try_borrow_mut(), self.0.ambient.try_borrow_mut())
    else {
      return false;
    };
    let taken = (std::mem::take(&mut *locals), ambient.take());
    drop(locals);
    drop(ambient);
    drop(taken);
    true
  }
}

pub(crate) struct WeakScope(Weak<ScopeData>);

impl WeakScope {
  pub(crate) fn upgrade(&self) -> Option<Scope> {
    self.0.upgrade().map(Scope)
  }

  pub(crate) fn is_alive(&self) -> bool {
    self.0.strong_count() > 0
  }
}

impl fmt::Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut locals: Vec<_> = self.0.locals.borrow().keys().cloned().collect();
    locals.sort();
    f.debug_struct("Scope")
      .field("root", &self.is_root())
      .field("locals", &locals)
      .finish_non_exhaustive()
  }
}
