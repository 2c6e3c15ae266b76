//! Subcommand registration, two-phase parsing, and dispatch.
//!
//! ```text
//! Dispatcher::new(common).add("alpha", schema)?.add_handler("beta", schema, handler)?
//!     .parse(prog, tokens) → Outcome::Parsed { values, selection }
//!     .run_subcommand(&values) → handler status
//! ```

mod dispatcher;
mod handler;
mod help;
mod registry;

pub use dispatcher::{Dispatcher, Outcome, Parsed, Selection};
pub use handler::{ModeHandler, NoopHandler, SharedHandler};
pub use help::{render_schema, render_usage};
pub use registry::{ModeEntry, ModeRegistry};
