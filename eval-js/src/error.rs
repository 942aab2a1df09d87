use crate::value::Value;

/// Errors produced while evaluating code.
///
/// Unresolved names are deliberately absent from this list: a reference that does not resolve
/// produces an [`Identifier`](crate::Identifier) value, not an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
  /// A prototype-derived call named a method the host class does not provide.
  #[error("{class}.prototype.{name} is not defined")]
  NameNotFound { class: String, name: String },

  /// No host class with this name is registered with the evaluator.
  #[error("{0} is not defined")]
  UnknownClass(String),

  /// An operation expected a callable value.
  #[error("{0} is not a function")]
  NotCallable(String),

  /// `new` was applied to a host class without a constructor.
  #[error("{0} is not a constructor")]
  NotConstructable(String),

  /// An attempted prototype mutation would introduce a cycle in the prototype chain.
  #[error("cyclic prototype chain")]
  PrototypeCycle,

  #[error("type error: {0}")]
  TypeError(&'static str),

  /// The nested call depth exceeded [`Limits::max_call_depth`](crate::Limits::max_call_depth).
  #[error("maximum call stack size exceeded (limit {limit})")]
  StackOverflow { limit: usize },

  /// A function was created from the active scope while no evaluation was running.
  #[error("no active scope")]
  NoActiveScope,

  /// A thrown value raised by a function body or native function.
  #[error("uncaught exception: {0}")]
  Throw(Value),
}
