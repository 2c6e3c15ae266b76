//! Error types for schema parsing, subcommand dispatch, and configuration.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the option grammar engine.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The token stream did not match the schema (unknown flag, missing
    /// value, failed conversion, ...).
    #[error("{message}")]
    Rejected {
        kind: clap::error::ErrorKind,
        message: String,
    },

    /// Two definitions share a name within one pass.
    #[error("option '{name}' is declared more than once")]
    DuplicateOption { name: String },

    /// Two definitions share a short letter within one pass.
    #[error("short flag '-{short}' is used by both '{first}' and '{second}'")]
    DuplicateShort {
        short: char,
        first: String,
        second: String,
    },

    /// A positional slot refers to an option the schema does not declare.
    #[error("positional slot '{name}' does not name a declared option")]
    UnknownSlot { name: String },

    /// Switches take no value and cannot fill a positional slot.
    #[error("positional slot '{name}' is bound to a switch")]
    SwitchSlot { name: String },

    /// The trailing positional slot must collect several values.
    #[error("positional slot '{name}' takes the remaining arguments and must be a list option")]
    ScalarRest { name: String },

    /// A matched value could not be read back with its declared type.
    #[error("option '{name}' could not be read: {source}")]
    Extract {
        name: String,
        #[source]
        source: clap::parser::MatchesError,
    },
}

impl GrammarError {
    /// Wrap a clap error, keeping only its headline.
    pub(crate) fn rejected(err: clap::Error) -> Self {
        let rendered = err.to_string();
        let headline = rendered.lines().next().unwrap_or_default();
        let message = headline
            .strip_prefix("error: ")
            .unwrap_or(headline)
            .to_string();
        GrammarError::Rejected {
            kind: err.kind(),
            message,
        }
    }
}

/// Which parse pass an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Common,
    Subcommand,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Common => f.write_str("common"),
            Phase::Subcommand => f.write_str("subcommand"),
        }
    }
}

/// Errors raised while registering, parsing, or dispatching subcommands.
#[derive(Debug, Error)]
pub enum ModeError {
    /// Malformed arguments in either pass.
    #[error("invalid {phase} options: {source}")]
    Grammar {
        phase: Phase,
        #[source]
        source: GrammarError,
    },

    /// The subcommand name is missing or not registered.
    #[error("{key} \"{name}\" is not in {{ {menu} }}")]
    UnknownSubcommand {
        key: String,
        name: String,
        menu: String,
    },

    /// Dispatch without a selected subcommand, or with a stale selection.
    #[error("no handler bound to the selected subcommand")]
    MissingHandler,

    /// A handler rejected the final values.
    #[error("subcommand '{mode}' rejected its options: {source}")]
    Ingest {
        mode: String,
        #[source]
        source: anyhow::Error,
    },

    /// A subcommand schema was rejected at registration.
    #[error("subcommand '{mode}' has an invalid schema: {source}")]
    InvalidSchema {
        mode: String,
        #[source]
        source: GrammarError,
    },

    /// A subcommand name or result key was empty.
    #[error("{what} must not be empty")]
    EmptyName { what: &'static str },

    /// The control key was renamed after the first parse.
    #[error("cannot rename '{key}' once parsing has started")]
    Finalized { key: String },
}

impl ModeError {
    /// True for errors caused by the command line, false for programmer
    /// errors in how the dispatcher is set up or driven.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ModeError::Grammar { .. }
                | ModeError::UnknownSubcommand { .. }
                | ModeError::Ingest { .. }
        )
    }

    /// Short machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ModeError::Grammar { .. } => "grammar_error",
            ModeError::UnknownSubcommand { .. } => "unknown_subcommand",
            ModeError::MissingHandler => "missing_handler",
            ModeError::Ingest { .. } => "ingest_error",
            ModeError::InvalidSchema { .. } => "invalid_schema",
            ModeError::EmptyName { .. } => "empty_name",
            ModeError::Finalized { .. } => "finalized",
        }
    }
}

/// A failed parse, carrying everything needed to report it.
#[derive(Debug, Error)]
#[error("{program}: {error}\n\n{usage}")]
pub struct ParseFailure {
    pub program: String,
    #[source]
    pub error: ModeError,
    /// Usage text rendered for the failed attempt.
    pub usage: String,
}

impl ParseFailure {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}
