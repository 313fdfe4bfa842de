//! Eventual - chain member reads and calls on values that have not arrived yet
//!
//! `wrap` turns a `Deferred` into a `Surrogate`. Reading a member of the
//! surrogate, or calling it, gives another surrogate for the derived result;
//! `then`, `catch` and `finally` observe the outcome.

mod builtins;
pub mod deferred;
pub mod errors;
pub mod property;
pub mod surrogate;
pub mod test_support;
pub mod value;

pub use deferred::{Deferred, Outcome, Settler};
pub use errors::{
    find_similar, format_fault, format_header, format_path, format_suggestions,
    levenshtein_distance, Colors, ErrorConfig, Fault,
};
pub use surrogate::{wrap, Surrogate, BLESSED};
pub use value::{Function, FunctionKind, NativeFn, Object, PropertyKey, Symbol, Value};
