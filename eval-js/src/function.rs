use crate::env::Scope;
use crate::error::EvalError;
use crate::execution_context;
use crate::gc::{Trace, Tracer};
use crate::ops;
use crate::property::PropertyKey;
use crate::value::{Identifier, Value};
use std::fmt;
use std::rc::Rc;

/// An executable function body supplied by the host.
///
/// The body runs inside the Scope spawned for the call (parameters, `arguments` and `this` are
/// bound there) and also receives the raw argument list. Its return value is the call's result;
/// a body with nothing to return yields [`Value::Undefined`].
pub type Body = Rc<dyn Fn(&Scope, &[Value]) -> Result<Value, EvalError>>;

/// Wraps a closure as a [`Body`].
pub fn body(f: impl Fn(&Scope, &[Value]) -> Result<Value, EvalError> + 'static) -> Body {
  Rc::new(f)
}

// Remaining stack below which a script call switches to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// A native function implemented in Rust: `(this, args) -> result`.
///
/// Native functions do not spawn a Scope.
pub type NativeFn = Rc<dyn Fn(&Value, &[Value]) -> Result<Value, EvalError>>;

#[derive(Clone)]
enum CallHandler {
  /// A host-supplied body closed over its defining Scope.
  Script { body: Body, scope: Scope },
  Native(NativeFn),
}

struct FunctionData {
  name: Option<PropertyKey>,
  params: Rc<[Identifier]>,
  handler: CallHandler,
  /// Set for bound functions: the receiver every call uses.
  bound_this: Option<Value>,
}

/// A first-class function value.
///
/// Cloning shares the same function; two separately created functions are never equal, even with
/// the same name, parameters and body.
#[derive(Clone)]
pub struct Function(Rc<FunctionData>);

impl Function {
  /// Creates a function closing over `scope`.
  pub fn new(name: Option<PropertyKey>, params: Vec<Identifier>, body: Body, scope: &Scope) -> Self {
    Self(Rc::new(FunctionData {
      name,
      params: Rc::from(params),
      handler: CallHandler::Script {
        body,
        scope: scope.clone(),
      },
      bound_this: None,
    }))
  }

  /// Creates a function closing over the currently active Scope.
  pub fn in_active_scope(
    name: Option<PropertyKey>,
    params: Vec<Identifier>,
    body: Body,
  ) -> Result<Self, EvalError> {
    let scope = execution_context::current_scope().ok_or(EvalError::NoActiveScope)?;
    Ok(Self::new(name, params, body, &scope))
  }

  /// Creates a native function. `params` only contributes to [`Function::arity`].
  pub fn native(
    name: &str,
    params: &[&str],
    call: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
  ) -> Self {
    Self(Rc::new(FunctionData {
      name: Some(PropertyKey::new(name)),
      params: params.iter().map(|param| Identifier::new(*param)).collect(),
      handler: CallHandler::Native(Rc::new(call)),
      bound_this: None,
    }))
  }

  pub fn name(&self) -> Option<&str> {
    self.0.name.as_ref().map(PropertyKey::as_str)
  }

  pub fn params(&self) -> &[Identifier] {
    &self.0.params
  }

  /// Number of declared parameters.
  pub fn arity(&self) -> usize {
    self.0.params.len()
  }

  pub fn is_bound(&self) -> bool {
    self.0.bound_this.is_some()
  }

  /// The fixed receiver of a bound function.
  pub fn bound_this(&self) -> Option<&Value> {
    self.0.bound_this.as_ref()
  }

  /// `Function.prototype.call`.
  ///
  /// Bound functions ignore `receiver`. For body functions a `null`/`undefined` receiver becomes
  /// the Global Object of the defining realm.
  pub fn call(&self, receiver: Value, args: &[Value]) -> Result<Value, EvalError> {
    let this = match &self.0.bound_this {
      Some(bound) => bound.clone(),
      None => receiver,
    };

    match &self.0.handler {
      CallHandler::Native(call) => {
        tracing::trace!(target: "eval_js::call", function = self.display_name(), argc = args.len(), "native call");
        call(&this, args)
      }
      CallHandler::Script { body, scope } => {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
          self.call_script(body, scope, this, args)
        })
      }
    }
  }

  fn call_script(
    &self,
    body: &Body,
    scope: &Scope,
    this: Value,
    args: &[Value],
  ) -> Result<Value, EvalError> {
    let _span = tracing::trace_span!(
      target: "eval_js::call",
      "call",
      function = self.display_name(),
      argc = args.len()
    )
    .entered();
    let _depth = scope.realm().enter_call()?;

    let this = if this.is_nullish() {
      Value::Object(scope.global_object())
    } else {
      this
    };

    let mut locals = crate::env::Locals::default();
    for (idx, param) in self.0.params.iter().enumerate() {
      let value = args.get(idx).cloned().unwrap_or(Value::Undefined);
      locals.insert(param.name().clone(), value);
    }
    locals.insert(PropertyKey::new("arguments"), Value::from(args.to_vec()));

    let frame = scope.spawn(Some(this), locals);
    frame.eval(args, |scope, args| body(scope, args))
  }

  /// `Function.prototype.apply`.
  ///
  /// `args` is the argument list as an array; `null`/`undefined` mean no arguments.
  pub fn apply(&self, receiver: Value, args: &Value) -> Result<Value, EvalError> {
    let args = ops::to_argument_list(args)?;
    self.call(receiver, &args)
  }

  /// `Function.prototype.bind`.
  ///
  /// Returns a new function whose receiver is fixed to `receiver`. Binding an already bound
  /// function returns it unchanged.
  pub fn bind(&self, receiver: Value) -> Function {
    if self.is_bound() {
      return self.clone();
    }
    Function(Rc::new(FunctionData {
      name: self.0.name.clone(),
      params: self.0.params.clone(),
      handler: self.0.handler.clone(),
      bound_this: Some(receiver),
    }))
  }

  /// Identity comparison.
  pub fn same_instance(&self, other: &Function) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  pub(crate) fn addr(&self) -> usize {
    Rc::as_ptr(&self.0) as *const () as usize
  }

  pub(crate) fn strong_count(&self) -> usize {
    Rc::strong_count(&self.0)
  }

  fn display_name(&self) -> &str {
    self.name().unwrap_or("<anonymous>")
  }
}

impl Trace for Function {
  fn trace(&self, tracer: &mut Tracer) -> bool {
    if let Some(bound) = &self.0.bound_this {
      tracer.value(bound);
    }
    // Captures of host closures are opaque.
    if let CallHandler::Script { scope, .. } = &self.0.handler {
      tracer.scope(scope);
    }
    true
  }
}

impl PartialEq for Function {
  fn eq(&self, other: &Self) -> bool {
    self.same_instance(other)
  }
}

impl fmt::Debug for Function {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Function")
      .field("name", &self.name())
      .field("params", &self.0.params)
      .field("bound", &self.is_bound())
      .finish()
  }
}
