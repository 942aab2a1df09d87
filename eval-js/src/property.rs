use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

/// A property or binding name.
///
/// Keys are cheap to clone and can be looked up by `&str` in the maps that store them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PropertyKey(Rc<str>);

impl PropertyKey {
  pub fn new(name: &str) -> Self {
    Self(Rc::from(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Borrow<str> for PropertyKey {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl From<&str> for PropertyKey {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl From<String> for PropertyKey {
  fn from(value: String) -> Self {
    Self(Rc::from(value))
  }
}

impl From<Rc<str>> for PropertyKey {
  fn from(value: Rc<str>) -> Self {
    Self(value)
  }
}

impl fmt::Debug for PropertyKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&*self.0, f)
  }
}

impl fmt::Display for PropertyKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
