//! Host classes exposed through prototypes.
//!
//! A [`HostClass`] is a capability set implemented in Rust. Its methods are reachable as
//! `Name.prototype.method` through [`Prototype::get`], which wraps the method in a [`Function`]
//! that passes the call's receiver to the host implementation. This is the only way host methods
//! become visible; nothing is injected into a shared global namespace.

use crate::error::EvalError;
use crate::function::Function;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// A native method callable with an explicit receiver.
pub type HostMethodFn = fn(this: &Value, args: &[Value]) -> Result<Value, EvalError>;

/// Registry metadata for one host method.
#[derive(Clone, Copy)]
pub struct HostMethod {
  pub name: &'static str,
  /// Parameter names; only used for the resulting function's arity.
  pub params: &'static [&'static str],
  pub call: HostMethodFn,
}

impl fmt::Debug for HostMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HostMethod")
      .field("name", &self.name)
      .field("params", &self.params)
      .finish()
  }
}

/// A class implemented by the embedding.
pub trait HostClass {
  fn name(&self) -> &str;

  /// Looks up an instance method by name.
  fn method(&self, name: &str) -> Option<HostMethod>;

  /// `new Name(args...)`.
  fn construct(&self, _args: &[Value]) -> Result<Value, EvalError> {
    Err(EvalError::NotConstructable(self.name().to_string()))
  }
}

/// `Name.prototype` for a host class.
#[derive(Clone)]
pub struct Prototype {
  class: Rc<dyn HostClass>,
}

impl Prototype {
  pub(crate) fn new(class: Rc<dyn HostClass>) -> Self {
    Self { class }
  }

  pub fn class_name(&self) -> &str {
    self.class.name()
  }

  /// `Name.prototype.method` as a function value.
  ///
  /// The function forwards its receiver to the host method, so it is normally used through
  /// [`Function::call`] or [`Function::apply`]. A method the class does not provide is a
  /// [`EvalError::NameNotFound`].
  pub fn get(&self, method: &str) -> Result<Function, EvalError> {
    let Some(meta) = self.class.method(method) else {
      return Err(EvalError::NameNotFound {
        class: self.class.name().to_string(),
        name: method.to_string(),
      });
    };
    tracing::trace!(target: "eval_js::native", class = self.class.name(), method, "prototype method");
    let call = meta.call;
    Ok(Function::native(meta.name, meta.params, move |this, args| {
      call(this, args)
    }))
  }
}

impl fmt::Debug for Prototype {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Prototype")
      .field("class", &self.class.name())
      .finish()
  }
}
