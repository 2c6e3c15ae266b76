//! Git-style subcommand handling on top of clap.
//!
//! A [`Dispatcher`] holds a set of common options plus named subcommands,
//! each with its own [`OptionSchema`] and [`ModeHandler`]:
//!
//! ```text
//! prog --common-option mode --mode-option
//! ```
//!
//! Parsing runs in two passes. The common pass resolves the shared options and
//! the subcommand name; the remaining tokens are then parsed against the
//! selected subcommand's schema and merged into one [`ResultMap`].

pub mod config;
pub mod error;
pub mod grammar;
pub mod logging;
pub mod modes;
pub mod schema;
pub mod values;

pub use config::DispatcherConfig;
pub use error::{ConfigError, GrammarError, ModeError, ParseFailure, Phase};
pub use grammar::{ModeParser, Positional, Split, SplitParser};
pub use modes::{Dispatcher, ModeHandler, NoopHandler, Outcome, Parsed, Selection, SharedHandler};
pub use schema::{OptionDef, OptionSchema, ValueKind};
pub use values::{Entry, ResultMap, Source, Value};
