use crate::console::{ConsoleSink, StdoutConsole};
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Resource limits applied to each evaluation.
///
/// Deserializable so embeddings can keep it in their own configuration files; missing fields take
/// their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Maximum number of nested body-function calls before [`EvalError::StackOverflow`].
  ///
  /// [`EvalError::StackOverflow`]: crate::EvalError::StackOverflow
  pub max_call_depth: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_call_depth: 512,
    }
  }
}

/// Construction-time evaluator options.
#[derive(Clone)]
pub struct EvalOptions {
  pub limits: Limits,
  /// Sink behind `console.log` in every Global Object.
  pub console: Rc<dyn ConsoleSink>,
}

impl Default for EvalOptions {
  fn default() -> Self {
    Self {
      limits: Limits::default(),
      console: Rc::new(StdoutConsole),
    }
  }
}

impl fmt::Debug for EvalOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EvalOptions")
      .field("limits", &self.limits)
      .finish_non_exhaustive()
  }
}
