//! Two-phase dispatcher: common options first, then the selected subcommand.
//!
//! ```text
//! tokens → common pass (tolerant) → registry lookup → prepare
//!        → subcommand pass (strict) → merge → ingest → ResultMap
//! ```

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::config::DispatcherConfig;
use crate::error::{ConfigError, ModeError, ParseFailure, Phase};
use crate::grammar::{ModeParser, Split, SplitParser};
use crate::modes::handler::{self, ModeHandler, SharedHandler};
use crate::modes::help;
use crate::modes::registry::ModeRegistry;
use crate::schema::{OptionDef, OptionSchema, ValueKind};
use crate::values::{ResultMap, Source, Value};

const HELP_KEY: &str = "help";

/// Identifies the subcommand chosen by a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    name: String,
}

impl Selection {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Values and selection from a successful parse.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub values: ResultMap,
    pub selection: Selection,
}

impl Parsed {
    pub fn subcommand(&self) -> &str {
        self.selection.name()
    }
}

/// Non-failing result of [`Dispatcher::parse`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Options resolved and the handler has ingested them.
    Parsed(Parsed),
    /// `-h/--help` was given; holds the usage text for stdout.
    Help(String),
}

impl Outcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        0
    }

    pub fn into_parsed(self) -> Option<Parsed> {
        match self {
            Outcome::Parsed(parsed) => Some(parsed),
            Outcome::Help(_) => None,
        }
    }
}

/// Parser for `prog --common-option mode --mode-option` command lines.
#[derive(Debug)]
pub struct Dispatcher {
    common: OptionSchema,
    config: DispatcherConfig,
    registry: ModeRegistry,
    selected: Option<String>,
    finalized: bool,
}

impl Dispatcher {
    /// Dispatcher with the given common options and default settings.
    pub fn new(common: OptionSchema) -> Self {
        Self {
            common,
            config: DispatcherConfig::default(),
            registry: ModeRegistry::new(),
            selected: None,
            finalized: false,
        }
    }

    /// Dispatcher without common options.
    pub fn bare() -> Self {
        Self::new(OptionSchema::default())
    }

    pub fn with_config(common: OptionSchema, config: DispatcherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(common)
        })
    }

    /// Register a subcommand with a no-op handler.
    pub fn add(self, name: &str, schema: OptionSchema) -> Result<Self, ModeError> {
        self.add_shared(name, schema, handler::noop())
    }

    /// Register a subcommand with its handler; the caller may keep a clone
    /// of `handler` to inspect its state later.
    pub fn add_handler<H>(
        self,
        name: &str,
        schema: OptionSchema,
        handler: Arc<Mutex<H>>,
    ) -> Result<Self, ModeError>
    where
        H: ModeHandler + 'static,
    {
        self.add_shared(name, schema, handler)
    }

    /// Register a subcommand with an already type-erased handler.
    ///
    /// A later registration under the same name replaces this one.
    pub fn add_shared(
        mut self,
        name: &str,
        schema: OptionSchema,
        handler: SharedHandler,
    ) -> Result<Self, ModeError> {
        schema
            .validate()
            .map_err(|source| ModeError::InvalidSchema {
                mode: name.to_string(),
                source,
            })?;
        self.registry.register(name, schema, handler)?;
        Ok(self)
    }

    /// Rename the result key holding the selected subcommand.
    ///
    /// Only allowed before the first parse.
    pub fn set_subcommand_key(&mut self, key: impl Into<String>) -> Result<(), ModeError> {
        if self.finalized {
            return Err(ModeError::Finalized {
                key: self.config.subcommand_key.clone(),
            });
        }
        let key = key.into();
        if key.is_empty() {
            return Err(ModeError::EmptyName {
                what: "the subcommand key",
            });
        }
        self.config.subcommand_key = key;
        Ok(())
    }

    /// Select `name` when the command line names no subcommand.
    pub fn set_default_subcommand(&mut self, name: impl Into<String>) {
        self.config.default_subcommand = Some(name.into());
    }

    pub fn subcommand_key(&self) -> &str {
        &self.config.subcommand_key
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Registered subcommand names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn menu(&self, sep: &str) -> String {
        self.registry.menu(sep)
    }

    /// Subcommand chosen by the last successful parse.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Usage text, including the current selection if there is one.
    pub fn usage(&self) -> String {
        let selected = self.selected.as_deref().and_then(|n| self.registry.get(n));
        help::render_usage(&self.visible_common(), &self.registry.menu("|"), selected)
    }

    /// Parse `tokens` (without the program name).
    ///
    /// On success the selected handler has run `prepare` and `ingest`, but
    /// not `run`; see [`run_subcommand`](Self::run_subcommand).
    pub fn parse<I, T>(&mut self, program: &str, tokens: I) -> Result<Outcome, ParseFailure>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        self.finalized = true;
        self.selected = None;

        match self.resolve(tokens) {
            Ok(Outcome::Help(usage)) => {
                self.selected = None;
                Ok(Outcome::Help(usage))
            }
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                tracing::debug!(kind = error.kind(), %error, "parse failed");
                let usage = self.usage();
                self.selected = None;
                Err(ParseFailure {
                    program: program.to_string(),
                    error,
                    usage,
                })
            }
        }
    }

    /// Parse, printing help or errors and exiting the process when the
    /// command line does not resolve to a subcommand.
    pub fn parse_or_exit<I, T>(&mut self, program: &str, tokens: I) -> Parsed
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        match self.parse(program, tokens) {
            Ok(Outcome::Parsed(parsed)) => parsed,
            Ok(Outcome::Help(usage)) => {
                print!("{}", usage);
                std::process::exit(0);
            }
            Err(failure) => {
                eprint!("{}", failure);
                std::process::exit(failure.exit_code());
            }
        }
    }

    /// [`parse_or_exit`](Self::parse_or_exit) over `std::env::args()`.
    pub fn parse_env(&mut self) -> Parsed {
        let mut args = std::env::args();
        let program = args
            .next()
            .as_deref()
            .and_then(|p| Path::new(p).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prog".to_string());
        self.parse_or_exit(&program, args)
    }

    /// Run the handler selected by the last successful parse.
    pub fn run_subcommand(&self, values: &ResultMap) -> Result<i32, ModeError> {
        let name = self.selected.as_deref().ok_or(ModeError::MissingHandler)?;
        self.run_named(name, values)
    }

    /// Run the handler named by `selection`.
    pub fn dispatch(&self, selection: &Selection, values: &ResultMap) -> Result<i32, ModeError> {
        self.run_named(&selection.name, values)
    }

    fn run_named(&self, name: &str, values: &ResultMap) -> Result<i32, ModeError> {
        let entry = self.registry.get(name).ok_or(ModeError::MissingHandler)?;
        tracing::debug!(subcommand = %name, "running subcommand");
        let status = entry.handler.lock().run(values);
        Ok(status)
    }

    fn resolve(&mut self, tokens: Vec<String>) -> Result<Outcome, ModeError> {
        let key = self.config.subcommand_key.clone();

        let Split {
            mut values,
            name: requested,
            leftover,
        } = self
            .split_parser(tokens)
            .run()
            .map_err(|source| ModeError::Grammar {
                phase: Phase::Common,
                source,
            })?;
        let common_help = self.config.add_help && values.remove(HELP_KEY).is_some();

        let name = requested
            .clone()
            .or_else(|| self.config.default_subcommand.clone())
            .unwrap_or_default();
        if self.registry.contains(&name) {
            self.selected = Some(name.clone());
        }

        let help_requested = common_help
            || (self.config.add_help && self.leftover_wants_help(&leftover));
        if help_requested {
            tracing::debug!(subcommand = ?self.selected, "help requested");
            return Ok(Outcome::Help(self.usage()));
        }

        let Some(entry) = self.registry.get(&name) else {
            return Err(ModeError::UnknownSubcommand {
                key,
                name,
                menu: self.registry.menu(", "),
            });
        };
        tracing::debug!(subcommand = %name, leftover = ?leftover, "selected subcommand");

        let source = if requested.is_some() {
            Source::Explicit
        } else {
            Source::Defaulted
        };
        values.insert(key, Value::Text(name.clone()), source);

        let handler = Arc::clone(&entry.handler);
        let parser = ModeParser::new(leftover, entry.schema.clone());
        let parser = handler.lock().prepare(parser);
        let sub_values = parser.run().map_err(|source| ModeError::Grammar {
            phase: Phase::Subcommand,
            source,
        })?;
        values.extend(sub_values);

        if let Err(source) = handler.lock().ingest(&values) {
            tracing::warn!(subcommand = %name, error = %source, "handler rejected values");
            return Err(ModeError::Ingest { mode: name, source });
        }

        Ok(Outcome::Parsed(Parsed {
            values,
            selection: Selection { name },
        }))
    }

    fn common_claims_short_help(&self) -> bool {
        self.common.find_short('h').is_some()
    }

    /// Common options plus the help switch, as shown in usage text.
    ///
    /// The switch keeps `-h` only while no common option uses that letter.
    fn visible_common(&self) -> OptionSchema {
        let schema = self.common.clone();
        if !self.config.add_help {
            return schema;
        }
        let switch = OptionDef::switch(HELP_KEY).help("Show usage information");
        if self.common_claims_short_help() {
            schema.option(switch)
        } else {
            schema.option(switch.short('h'))
        }
    }

    /// Common pass: the visible common options before the subcommand name,
    /// and after it only those the named subcommand does not redefine.
    fn split_parser(&self, tokens: Vec<String>) -> SplitParser {
        self.registry.iter().fold(
            SplitParser::new(tokens, self.visible_common()),
            |parser, (name, entry)| parser.branch(name, self.common.unclaimed_by(&entry.schema)),
        )
    }

    /// `-h`/`--help` in flag position among the subcommand's tokens, unless
    /// the selected subcommand or the common options claim that flag.
    fn leftover_wants_help(&self, leftover: &[String]) -> bool {
        let schema = self
            .selected
            .as_deref()
            .and_then(|n| self.registry.get(n))
            .map(|entry| &entry.schema);
        let claims_long = schema.is_some_and(|s| s.find(HELP_KEY).is_some());
        let claims_short =
            self.common_claims_short_help() || schema.is_some_and(|s| s.find_short('h').is_some());

        let mut tokens = leftover.iter();
        while let Some(token) = tokens.next() {
            match token.as_str() {
                "--" => break,
                "--help" if !claims_long => return true,
                "-h" if !claims_short => return true,
                _ => {}
            }
            if schema.is_some_and(|s| takes_next_value(s, token)) {
                tokens.next();
            }
        }
        false
    }
}

/// True when `token` is a flag of `schema` whose value is the next token.
fn takes_next_value(schema: &OptionSchema, token: &str) -> bool {
    let def = if let Some(long) = token.strip_prefix("--") {
        schema.find(long)
    } else if let Some(short) = token.strip_prefix('-') {
        let mut letters = short.chars();
        match (letters.next(), letters.next()) {
            (Some(letter), None) => schema.find_short(letter),
            _ => None,
        }
    } else {
        None
    };
    def.is_some_and(|d| d.kind != ValueKind::Switch)
}
