use crate::error::EvalError;
use crate::function::Function;
use crate::gc::{self, Trace, Tracer};
use crate::object::Object;
use crate::ops;
use crate::property::PropertyKey;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::thread::LocalKey;

thread_local! {
  /// Arrays being rendered by `Display`, innermost last.
  static RENDERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
  /// Arrays being formatted by `Debug`.
  static DEBUGGING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
  /// Array pairs being compared by `PartialEq`.
  static COMPARING: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Marks `entry` as in progress on `stack` until dropped. Entering an entry that is already in
/// progress yields `None`, which is how self-referencing arrays are detected.
struct CycleGuard<T: Copy + PartialEq + 'static> {
  stack: &'static LocalKey<RefCell<Vec<T>>>,
}

impl<T: Copy + PartialEq + 'static> CycleGuard<T> {
  fn enter(stack: &'static LocalKey<RefCell<Vec<T>>>, entry: T) -> Option<Self> {
    let entered = stack.with(|active| {
      let mut active = active.borrow_mut();
      if active.contains(&entry) {
        return false;
      }
      active.push(entry);
      true
    });
    entered.then_some(Self { stack })
  }
}

impl<T: Copy + PartialEq + 'static> Drop for CycleGuard<T> {
  fn drop(&mut self) {
    let _ = self.stack.try_with(|active| active.borrow_mut().pop());
  }
}

/// Canonical array index: decimal digits with no sign and no leading zero.
fn array_index(key: &str) -> Option<usize> {
  let canonical = key == "0"
    || (!key.is_empty() && !key.starts_with('0') && key.bytes().all(|b| b.is_ascii_digit()));
  canonical.then(|| key.parse::<usize>().ok()).flatten()
}

/// A JavaScript value.
///
/// Primitives are stored inline. Objects, functions and arrays are shared handles: cloning a
/// `Value` never copies the underlying storage.
#[derive(Clone, Debug)]
pub enum Value {
  /// The JavaScript `undefined` value, also used for "no value produced".
  Undefined,
  /// The JavaScript `null` value.
  Null,
  Bool(bool),
  /// A JavaScript number (IEEE-754 double).
  Number(f64),
  String(Rc<str>),
  /// A shared, mutable sequence of values (`arguments`, host arrays).
  Array(Array),
  Object(Object),
  Function(Function),
  /// A deferred reference to a name that did not resolve.
  Identifier(Identifier),
  /// An opaque instance created by a host class.
  Host(HostObject),
}

impl Value {
  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  /// `true` for `undefined` and `null`.
  pub fn is_nullish(&self) -> bool {
    matches!(self, Value::Undefined | Value::Null)
  }

  pub fn as_object(&self) -> Option<&Object> {
    match self {
      Value::Object(obj) => Some(obj),
      _ => None,
    }
  }

  pub fn as_function(&self) -> Option<&Function> {
    match self {
      Value::Function(func) => Some(func),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&Array> {
    match self {
      Value::Array(array) => Some(array),
      _ => None,
    }
  }

  pub fn as_identifier(&self) -> Option<&Identifier> {
    match self {
      Value::Identifier(id) => Some(id),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  /// Calls this value as a function, e.g. the result of an expression like `(f || g)(args...)`.
  pub fn call(&self, this: Value, args: &[Value]) -> Result<Value, EvalError> {
    match self {
      Value::Function(func) => func.call(this, args),
      other => Err(EvalError::NotCallable(other.to_string())),
    }
  }

  /// Property access (`value.key`) on any value.
  ///
  /// Objects walk their prototype chain. Arrays and strings expose `length` and arrays expose
  /// numeric indices; functions expose `name` and `length`. Everything else reads as `undefined`.
  pub fn get(&self, key: &str) -> Value {
    match self {
      Value::Object(obj) => obj.get(key),
      Value::Array(array) => match key {
        "length" => Value::Number(array.len() as f64),
        _ => array_index(key)
          .and_then(|idx| array.get(idx))
          .unwrap_or(Value::Undefined),
      },
      Value::String(s) if key == "length" => Value::Number(s.encode_utf16().count() as f64),
      Value::Function(func) => match key {
        "name" => Value::from(func.name().unwrap_or("")),
        "length" => Value::Number(func.arity() as f64),
        _ => Value::Undefined,
      },
      _ => Value::Undefined,
    }
  }
}

impl PartialEq for Value {
  /// Strict equality (`===`). See [`ops::strict_equals`].
  fn eq(&self, other: &Self) -> bool {
    ops::strict_equals(self, other)
  }
}

impl fmt::Display for Value {
  /// ECMAScript `ToString` for the supported value set.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Undefined => f.write_str("undefined"),
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Number(n) => f.write_str(&ops::number_to_string(*n)),
      Value::String(s) => f.write_str(s),
      Value::Array(array) => {
        // A cyclic element renders as empty, like `Array.prototype.join`.
        let Some(_rendering) = CycleGuard::enter(&RENDERING, array.addr()) else {
          return Ok(());
        };
        for (idx, value) in array.to_vec().iter().enumerate() {
          if idx > 0 {
            f.write_str(",")?;
          }
          if !value.is_nullish() {
            write!(f, "{value}")?;
          }
        }
        Ok(())
      }
      Value::Object(_) => f.write_str("[object Object]"),
      Value::Function(func) => {
        let params = func
          .params()
          .iter()
          .map(|param| param.name().as_str())
          .collect::<Vec<_>>()
          .join(", ");
        write!(
          f,
          "function {name}({params}) {{ [native code] }}",
          name = func.name().unwrap_or("")
        )
      }
      Value::Identifier(id) => f.write_str(id.name().as_str()),
      Value::Host(host) => write!(f, "[object {class}]", class = host.class_name()),
    }
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Self::Number(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Self::Number(value as f64)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::String(Rc::from(value))
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::String(Rc::from(value))
  }
}

impl From<Vec<Value>> for Value {
  fn from(value: Vec<Value>) -> Self {
    Self::Array(Array::from(value))
  }
}

impl From<Array> for Value {
  fn from(value: Array) -> Self {
    Self::Array(value)
  }
}

impl From<Object> for Value {
  fn from(value: Object) -> Self {
    Self::Object(value)
  }
}

impl From<Function> for Value {
  fn from(value: Function) -> Self {
    Self::Function(value)
  }
}

impl From<Identifier> for Value {
  fn from(value: Identifier) -> Self {
    Self::Identifier(value)
  }
}

impl From<HostObject> for Value {
  fn from(value: HostObject) -> Self {
    Self::Host(value)
  }
}

/// A shared, growable array of values.
///
/// Arrays are the one container type compared structurally: two arrays are equal when they hold
/// equal elements in the same order, whether or not they are the same instance.
#[derive(Clone)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
  pub fn new() -> Self {
    Self::from(Vec::new())
  }

  pub fn len(&self) -> usize {
    self.0.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.borrow().is_empty()
  }

  pub fn get(&self, idx: usize) -> Option<Value> {
    self.0.borrow().get(idx).cloned()
  }

  /// Writes `value` at `idx`, filling any gap with `undefined`.
  pub fn set(&self, idx: usize, value: Value) {
    let mut items = self.0.borrow_mut();
    if idx >= items.len() {
      items.resize(idx + 1, Value::Undefined);
    }
    items[idx] = value;
  }

  pub fn push(&self, value: Value) {
    self.0.borrow_mut().push(value);
  }

  /// A snapshot of the current elements.
  pub fn to_vec(&self) -> Vec<Value> {
    self.0.borrow().clone()
  }

  /// Whether both handles refer to the same storage.
  pub fn same_instance(&self, other: &Array) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  pub(crate) fn addr(&self) -> usize {
    Rc::as_ptr(&self.0) as *const () as usize
  }

  pub(crate) fn strong_count(&self) -> usize {
    Rc::strong_count(&self.0)
  }

  pub(crate) fn downgrade(&self) -> WeakArray {
    WeakArray(Rc::downgrade(&self.0))
  }
}

impl Default for Array {
  fn default() -> Self {
    Self::new()
  }
}

impl From<Vec<Value>> for Array {
  fn from(value: Vec<Value>) -> Self {
    let array = Self(Rc::new(RefCell::new(value)));
    gc::register(gc::Candidate::Array(array.downgrade()));
    array
  }
}

impl Trace for Array {
  fn trace(&self, tracer: &mut Tracer) -> bool {
    let Ok(items) = self.0.try_borrow() else {
      return false;
    };
    for item in items.iter() {
      tracer.value(item);
    }
    true
  }

  fn clear(&self) -> bool {
    let Ok(mut items) = self.0.try_borrow_mut() else {
      return false;
    };
    let taken = std::mem::take(&mut *items);
    drop(items);
    drop(taken);
    true
  }
}

pub(crate) struct WeakArray(Weak<RefCell<Vec<Value>>>);

impl WeakArray {
  pub(crate) fn upgrade(&self) -> Option<Array> {
    self.0.upgrade().map(Array)
  }

  pub(crate) fn is_alive(&self) -> bool {
    self.0.strong_count() > 0
  }
}

impl fmt::Debug for Array {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(_debugging) = CycleGuard::enter(&DEBUGGING, self.addr()) else {
      return f.write_str("[cyclic]");
    };
    f.debug_list().entries(self.to_vec().iter()).finish()
  }
}

impl PartialEq for Array {
  fn eq(&self, other: &Self) -> bool {
    if self.same_instance(other) {
      return true;
    }
    // A pair already being compared further up is assumed equal; any difference shows up there.
    let Some(_comparing) = CycleGuard::enter(&COMPARING, (self.addr(), other.addr())) else {
      return true;
    };
    let a = self.0.borrow();
    let b = other.0.borrow();
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
  }
}

/// An unresolved name reference.
///
/// Produced when a name is referenced but nothing in the scope chain binds it. `args` holds the
/// argument references supplied with the reference; when the reference names a function
/// declaration these are the parameter identifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
  name: PropertyKey,
  args: Rc<[Value]>,
}

impl Identifier {
  pub fn new(name: impl Into<PropertyKey>) -> Self {
    Self {
      name: name.into(),
      args: Rc::from(Vec::new()),
    }
  }

  pub fn with_args(name: impl Into<PropertyKey>, args: &[Value]) -> Self {
    Self {
      name: name.into(),
      args: Rc::from(args),
    }
  }

  pub fn name(&self) -> &PropertyKey {
    &self.name
  }

  pub fn args(&self) -> &[Value] {
    &self.args
  }
}

/// An opaque value owned by the host, typically produced by a host class constructor.
///
/// Compared by identity.
#[derive(Clone)]
pub struct HostObject {
  class_name: Rc<str>,
  data: Rc<dyn Any>,
}

impl HostObject {
  pub fn new<T: Any>(class_name: &str, data: T) -> Self {
    Self {
      class_name: Rc::from(class_name),
      data: Rc::new(data),
    }
  }

  pub fn class_name(&self) -> &str {
    &self.class_name
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.data.downcast_ref::<T>()
  }

  pub fn same_instance(&self, other: &HostObject) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }
}

impl fmt::Debug for HostObject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HostObject")
      .field("class_name", &self.class_name)
      .finish_non_exhaustive()
  }
}
