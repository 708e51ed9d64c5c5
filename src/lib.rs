//! A tree-walking interpreter for Lox.
//!
//! Source text goes through four stages: [`scanner`] turns it into tokens,
//! [`parser`] builds the syntax tree, [`resolver`] binds every local variable
//! reference to its declaring scope, and [`interpreter`] walks the tree.
//! [`lox::Lox`] drives all four and keeps one global scope alive between runs.

pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod printer;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

pub use error::{LoxError, RuntimeError, StaticError};
pub use lox::{Config, Lox, SharedOutput};
pub use value::RuntimeValue;
