//! An embeddable evaluation core with JavaScript semantics.
//!
//! There is no parser: the embedding drives evaluation through the API directly, supplying
//! function bodies as Rust closures. What this crate provides is the runtime model those bodies
//! run against:
//! - Lexical environments ([`Scope`]) chained to a per-evaluation Global Object
//! - Prototype-based objects ([`Object`])
//! - First-class functions with closures, `arguments`, and `call`/`apply`/`bind` receiver
//!   semantics ([`Function`])
//! - Host classes reachable through prototypes ([`HostClass`], [`Prototype`])
//!
//! # Name resolution
//!
//! A bare name is resolved by walking the scope chain: the Scope's ambient bindings
//! ([`AmbientLookup`]), then its locals, then (only at the root) the Global Object and its
//! prototype chain, then the parent Scope. A name that resolves nowhere is not an error; it
//! produces a deferred [`Identifier`] value, or a new [`Function`] if a body was supplied. See
//! [`Scope::resolve`].
//!
//! # Evaluations
//!
//! Each [`Evaluator::evaluate`] call gets its own Global Object. The Scope currently running is
//! tracked per thread ([`current_scope`]) and restored with stack discipline, so evaluations and
//! function calls may nest, and a function created in one evaluation may be called from another.
//!
//! ```
//! use eval_js::{evaluate, ops, Value};
//!
//! let result = evaluate(|scope| {
//!   let square = scope.function(&["x"], |scope, _args| {
//!     let x = scope.reference("x");
//!     Ok(ops::mul(&x, &x))
//!   });
//!   scope.declare("square", Value::Function(square));
//!   scope.call("square", &[Value::Number(4.0)])
//! })
//! .unwrap();
//! assert_eq!(result, Value::Number(16.0));
//! ```

mod console;
mod env;
mod error;
mod exec;
mod execution_context;
mod function;
mod gc;
mod native;
mod object;
pub mod ops;
mod options;
mod property;
mod realm;
mod value;

pub use crate::console::ConsoleSink;
pub use crate::console::RecordingConsole;
pub use crate::console::StdoutConsole;
pub use crate::env::AmbientLookup;
pub use crate::env::Locals;
pub use crate::env::Resolution;
pub use crate::env::Scope;
pub use crate::error::EvalError;
pub use crate::exec::evaluate;
pub use crate::exec::Evaluator;
pub use crate::execution_context::current_scope;
pub use crate::function::body;
pub use crate::function::Body;
pub use crate::function::Function;
pub use crate::function::NativeFn;
pub use crate::gc::collect_cycles;
pub use crate::native::HostClass;
pub use crate::native::HostMethod;
pub use crate::native::HostMethodFn;
pub use crate::native::Prototype;
pub use crate::object::Object;
pub use crate::object::WeakObject;
pub use crate::options::EvalOptions;
pub use crate::options::Limits;
pub use crate::property::PropertyKey;
pub use crate::value::Array;
pub use crate::value::HostObject;
pub use crate::value::Identifier;
pub use crate::value::Value;
