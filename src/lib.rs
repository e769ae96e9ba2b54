//! Front end for a packet-pipeline description language: lexing, parsing,
//! scope bookkeeping, name resolution, and type construction (spec's
//! C1-C7 compiler passes). [`compile`] runs the whole pipeline over one
//! source string and hands back every pass's output bundled in a
//! [`CompilationContext`]; callers that only need a subset (a linter that
//! stops after parsing, say) can drive the individual modules directly.
//!
//! Grounded on the teacher's own crate-root layout: one `mod` per pass,
//! a driver module wiring them together, nothing re-exported that a
//! caller couldn't get more directly from the module it actually lives in.

pub mod ast;
pub mod base;
mod context;
pub mod error;
pub mod lexer;
mod p2;
mod parser;
pub mod resolve;
pub mod scope;
pub mod types;

pub use context::{compile, CompilationContext, CompileOptions};
pub use error::CompileError;
