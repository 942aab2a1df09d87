//! The prototype-based object model.
//!
//! An [`Object`] is a shared handle to a property map plus an optional prototype. Reads walk the
//! prototype chain; writes always land in the receiving object's own storage, so writing through a
//! derived object shadows the prototype's property instead of mutating it.

use crate::error::EvalError;
use crate::gc::{self, Trace, Tracer};
use crate::property::PropertyKey;
use crate::value::Value;
use ahash::AHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Default)]
struct ObjectData {
  properties: AHashMap<PropertyKey, Value>,
  prototype: Option<Object>,
}

/// A JavaScript object.
///
/// Cloning an `Object` clones the handle; equality is identity (see [`Object::same_instance`]).
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
  /// Creates an empty object with no prototype.
  pub fn new() -> Self {
    Self::with_prototype(None)
  }

  /// Creates an empty object delegating lookups to `prototype`.
  pub fn with_prototype(prototype: Option<Object>) -> Self {
    let obj = Self(Rc::new(RefCell::new(ObjectData {
      properties: AHashMap::new(),
      prototype,
    })));
    gc::register(gc::Candidate::Object(obj.downgrade()));
    obj
  }

  /// A handle that does not keep the object alive.
  pub fn downgrade(&self) -> WeakObject {
    WeakObject(Rc::downgrade(&self.0))
  }

  pub(crate) fn addr(&self) -> usize {
    Rc::as_ptr(&self.0) as *const () as usize
  }

  pub(crate) fn strong_count(&self) -> usize {
    Rc::strong_count(&self.0)
  }

  pub fn prototype(&self) -> Option<Object> {
    self.0.borrow().prototype.clone()
  }

  /// Replaces the prototype.
  ///
  /// Fails with [`EvalError::PrototypeCycle`] if `self` already appears in the chain of
  /// `prototype`, which keeps every chain walk finite.
  pub fn set_prototype(&self, prototype: Option<Object>) -> Result<(), EvalError> {
    let mut current = prototype.clone();
    while let Some(obj) = current {
      if obj.same_instance(self) {
        return Err(EvalError::PrototypeCycle);
      }
      current = obj.prototype();
    }
    self.0.borrow_mut().prototype = prototype;
    Ok(())
  }

  /// Property read. Own properties win, then the prototype chain is consulted; a key found nowhere
  /// reads as `undefined`.
  pub fn get(&self, key: &str) -> Value {
    self.lookup(key).unwrap_or(Value::Undefined)
  }

  /// Like [`Object::get`] but distinguishes "not found" from a stored `undefined`.
  pub fn lookup(&self, key: &str) -> Option<Value> {
    let mut current = Some(self.clone());
    while let Some(obj) = current {
      let data = obj.0.borrow();
      if let Some(value) = data.properties.get(key) {
        return Some(value.clone());
      }
      current = data.prototype.clone();
    }
    None
  }

  /// Writes an own property. The prototype chain is never touched.
  pub fn set(&self, key: impl Into<PropertyKey>, value: Value) {
    let key = key.into();
    tracing::trace!(target: "eval_js::object", key = %key, "set");
    self.0.borrow_mut().properties.insert(key, value);
  }

  pub fn has_own(&self, key: &str) -> bool {
    self.0.borrow().properties.contains_key(key)
  }

  /// Whether `key` is bound on this object or anywhere along its prototype chain.
  pub fn has_own_or_inherited(&self, key: &str) -> bool {
    self.lookup(key).is_some()
  }

  /// Removes an own property, returning its previous value.
  pub fn delete(&self, key: &str) -> Option<Value> {
    self.0.borrow_mut().properties.remove(key)
  }

  /// Own property names, sorted.
  pub fn keys(&self) -> Vec<PropertyKey> {
    let mut keys: Vec<_> = self.0.borrow().properties.keys().cloned().collect();
    keys.sort();
    keys
  }

  /// Property-call syntax: `obj.name(args...)`.
  ///
  /// A function-valued property is called with `self` as the receiver. Any other value is returned
  /// unchanged and `args` are ignored.
  pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match self.get(name) {
      Value::Function(func) => func.call(Value::Object(self.clone()), args),
      value => Ok(value),
    }
  }

  /// Identity comparison.
  pub fn same_instance(&self, other: &Object) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Default for Object {
  fn default() -> Self {
    Self::new()
  }
}

impl Trace for Object {
  fn trace(&self, tracer: &mut Tracer) -> bool {
    let Ok(data) = self.0.try_borrow() else {
      return false;
    };
    for value in data.properties.values() {
      tracer.value(value);
    }
    if let Some(prototype) = &data.prototype {
      tracer.object(prototype);
    }
    true
  }

  fn clear(&self) -> bool {
    let Ok(mut data) = self.0.try_borrow_mut() else {
      return false;
    };
    let taken = std::mem::take(&mut *data);
    drop(data);
    drop(taken);
    true
  }
}

/// A non-owning reference to an [`Object`].
#[derive(Clone, Debug)]
pub struct WeakObject(Weak<RefCell<ObjectData>>);

impl WeakObject {
  /// The object, if it has not been freed.
  pub fn upgrade(&self) -> Option<Object> {
    self.0.upgrade().map(Object)
  }

  pub(crate) fn is_alive(&self) -> bool {
    self.0.strong_count() > 0
  }
}

impl PartialEq for Object {
  fn eq(&self, other: &Self) -> bool {
    self.same_instance(other)
  }
}

impl fmt::Debug for Object {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Only keys: values may refer back to this object.
    f.debug_struct("Object")
      .field("keys", &self.keys())
      .field("has_prototype", &self.0.borrow().prototype.is_some())
      .finish()
  }
}
