use crate::function::Function;
use crate::object::Object;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Destination of `console.log`.
pub trait ConsoleSink {
  fn log(&self, values: &[Value]);
}

/// Writes each logged value on its own line to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
  fn log(&self, values: &[Value]) {
    for value in values {
      println!("{value}");
    }
  }
}

/// Keeps every logged value in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingConsole {
  messages: Rc<RefCell<Vec<Value>>>,
}

impl RecordingConsole {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn messages(&self) -> Vec<Value> {
    self.messages.borrow().clone()
  }

  /// Messages rendered with `ToString`.
  pub fn lines(&self) -> Vec<String> {
    self
      .messages
      .borrow()
      .iter()
      .map(|value| value.to_string())
      .collect()
  }

  pub fn clear(&self) {
    self.messages.borrow_mut().clear();
  }
}

impl ConsoleSink for RecordingConsole {
  fn log(&self, values: &[Value]) {
    self.messages.borrow_mut().extend(values.iter().cloned());
  }
}

/// The `console` object installed in each Global Object.
pub(crate) fn console_object(sink: Rc<dyn ConsoleSink>) -> Object {
  let console = Object::new();
  let log = Function::native("log", &[], move |_this, args| {
    sink.log(args);
    Ok(Value::Undefined)
  });
  console.set("log", Value::Function(log));
  console
}
