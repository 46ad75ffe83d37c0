//! Querypoint tracing instrumentation for JavaScript syntax trees.
//!
//! [`instrument`] takes an swc [`Program`](swc_core::ecma::ast::Program),
//! opens an activation record at the top of the program and in every
//! function declaration, rewrites the identifier references flagged in a
//! [`TraceAnnotations`] table so their values are recorded, and prints the
//! result together with a Source Map v3 back to the original text.
//!
//! ```js
//! function f(a) { return a + b; }          // `b` annotated with slot `_27`
//! ```
//!
//! becomes
//!
//! ```js
//! function f(a) {
//!     return a + ((__qp_activation._27 = window.__qp.trace(b)), b);
//!     var __qp_activation = { turn: window.__qp.turn };
//!     __qp_function.push(__qp_activation), void 0;
//! }
//! ```
//!
//! Function bodies receive the record after a two-statement preamble; a
//! body shorter than that gets it appended at the end.

// -----------------------------------------------------------------------------
// Modules
// -----------------------------------------------------------------------------

pub mod activation;
pub mod annotations;
pub mod config;
pub mod error;
pub mod instrument;
mod printer;
pub mod sourcemap;
pub mod trace;
mod validate;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use activation::build_activation_statements;
pub use annotations::{TraceAnnotations, TraceSlot};
pub use config::InstrumentConfig;
pub use error::{InstrumentError, Result};
pub use instrument::{instrument, Instrumenter};
pub use sourcemap::{decode_mappings, Mapping, SourceMapBuilder, SourceMapJson};
pub use trace::trace_identifier;
pub use writer::{GeneratedOutput, PassThrough, RewriteCounts, TreeWriter, WriterHooks};
