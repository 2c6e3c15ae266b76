//! Option grammar engine. Runs an [`OptionSchema`] over a token list via clap.
//!
//! ```text
//! tokens + OptionSchema (+ Positional) → clap::Command → ArgMatches → ResultMap
//! ```
//!
//! Tokenizing, value conversion and positional handling are clap's job; this
//! module only translates schemas in and matches out.

use clap::parser::{MatchesError, ValueSource};
use clap::{value_parser, Arg, ArgAction, ArgMatches, ColorChoice, Command};
use std::collections::HashSet;

use crate::error::GrammarError;
use crate::schema::{OptionDef, OptionSchema, ValueKind};
use crate::values::{ResultMap, Source, Value};

/// Id of the list collecting a subcommand's own tokens in [`SplitParser`].
pub(crate) const LEFTOVER_ID: &str = "subcommand-args";

/// Binding of positional arguments to declared options.
///
/// Slots fill in order; an optional trailing slot takes everything left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positional {
    slots: Vec<String>,
    rest: Option<String>,
}

impl Positional {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the next positional argument to option `name`.
    pub fn slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(name.into());
        self
    }

    /// Bind all remaining positional arguments to list option `name`.
    pub fn rest(mut self, name: impl Into<String>) -> Self {
        self.rest = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.rest.is_none()
    }

    /// Slot names in position order, trailing slot last.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .map(String::as_str)
            .chain(self.rest.as_deref())
    }

    /// 1-based clap index of `name`, plus whether it is the trailing slot.
    fn index_of(&self, name: &str) -> Option<(usize, bool)> {
        if let Some(pos) = self.slots.iter().position(|s| s == name) {
            return Some((pos + 1, false));
        }
        match &self.rest {
            Some(rest) if rest == name => Some((self.slots.len() + 1, true)),
            _ => None,
        }
    }
}

/// A not-yet-executed parse of a token list against one schema.
#[derive(Debug, Clone)]
pub struct ModeParser {
    tokens: Vec<String>,
    schema: OptionSchema,
    positional: Positional,
    allow_unregistered: bool,
}

impl ModeParser {
    pub fn new(tokens: Vec<String>, schema: OptionSchema) -> Self {
        Self {
            tokens,
            schema,
            positional: Positional::default(),
            allow_unregistered: false,
        }
    }

    /// Attach a positional mapping, replacing any earlier one.
    pub fn positional(mut self, positional: Positional) -> Self {
        self.positional = positional;
        self
    }

    /// Let the trailing positional slot swallow unknown flags instead of
    /// rejecting them. Requires a trailing slot to have any effect.
    pub fn allow_unregistered(mut self) -> Self {
        self.allow_unregistered = true;
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Run the grammar and collect supplied and defaulted values.
    pub fn run(self) -> Result<ResultMap, GrammarError> {
        let command = self.command()?;
        tracing::trace!(
            schema = %self.schema.caption(),
            tokens = ?self.tokens,
            tolerant = self.allow_unregistered,
            positional = !self.positional.is_empty(),
            "running option grammar"
        );

        let matches = command
            .try_get_matches_from(&self.tokens)
            .map_err(GrammarError::rejected)?;

        collect(self.schema.options(), &matches, true)
    }

    fn command(&self) -> Result<Command, GrammarError> {
        self.schema.validate()?;

        let mut bound = HashSet::new();
        for name in self.positional.names() {
            if !bound.insert(name) {
                return Err(GrammarError::DuplicateOption {
                    name: name.to_string(),
                });
            }
            let def = self
                .schema
                .find(name)
                .ok_or_else(|| GrammarError::UnknownSlot {
                    name: name.to_string(),
                })?;
            if def.kind == ValueKind::Switch {
                return Err(GrammarError::SwitchSlot {
                    name: name.to_string(),
                });
            }
        }
        if let Some(rest) = &self.positional.rest {
            if self.schema.find(rest).map(|d| d.kind) != Some(ValueKind::List) {
                return Err(GrammarError::ScalarRest { name: rest.clone() });
            }
        }

        let command = base_command(command_name(&self.schema))
            .no_binary_name(true)
            .args(self.schema.options().iter().map(|def| self.arg_for(def)));

        Ok(command)
    }

    fn arg_for(&self, def: &OptionDef) -> Arg {
        let arg = Arg::new(def.name.clone());

        let arg = match self.positional.index_of(&def.name) {
            Some((index, true)) => {
                let arg = arg.index(index).num_args(1..);
                if self.allow_unregistered {
                    arg.trailing_var_arg(true).allow_hyphen_values(true)
                } else {
                    arg
                }
            }
            Some((index, false)) => arg.index(index).num_args(1),
            None => flag(arg, def),
        };

        typed(arg, def)
    }
}

/// Tolerant first pass over a `prog [shared] name [rest...]` command line.
///
/// Tokens before the subcommand name are matched against the whole shared
/// schema. After a name registered with [`branch`](Self::branch), only the
/// shared options given for that branch are read; the first token that is
/// not one of them starts the leftover list, which keeps everything after it
/// verbatim. Unregistered names are reported with their tokens untouched.
#[derive(Debug, Clone)]
pub struct SplitParser {
    tokens: Vec<String>,
    schema: OptionSchema,
    branches: Vec<(String, OptionSchema)>,
}

/// What [`SplitParser::run`] found.
#[derive(Debug, Clone, Default)]
pub struct Split {
    /// Shared options, supplied or defaulted.
    pub values: ResultMap,
    /// The first positional token, if any.
    pub name: Option<String>,
    /// Tokens left for the subcommand pass.
    pub leftover: Vec<String>,
}

impl SplitParser {
    pub fn new(tokens: Vec<String>, schema: OptionSchema) -> Self {
        Self {
            tokens,
            schema,
            branches: Vec::new(),
        }
    }

    /// Recognize `name`; `shared` lists the options still read after it.
    pub fn branch(mut self, name: impl Into<String>, shared: OptionSchema) -> Self {
        self.branches.push((name.into(), shared));
        self
    }

    pub fn run(self) -> Result<Split, GrammarError> {
        self.schema.validate()?;

        let mut command = base_command(command_name(&self.schema))
            .no_binary_name(true)
            .disable_help_subcommand(true)
            .allow_external_subcommands(true)
            .external_subcommand_value_parser(value_parser!(String))
            .args(self.schema.options().iter().map(option_arg));
        for (name, shared) in &self.branches {
            command = command.subcommand(
                base_command(name)
                    .args(shared.options().iter().map(option_arg))
                    .arg(leftover_arg()),
            );
        }
        tracing::trace!(
            schema = %self.schema.caption(),
            tokens = ?self.tokens,
            branches = self.branches.len(),
            "splitting command line"
        );

        let matches = command
            .try_get_matches_from(&self.tokens)
            .map_err(GrammarError::rejected)?;
        let mut values = collect(self.schema.options(), &matches, true)?;

        let Some((name, sub)) = matches.subcommand() else {
            return Ok(Split {
                values,
                ..Split::default()
            });
        };

        let leftover_id = match self.branches.iter().find(|(branch, _)| branch == name) {
            Some((_, shared)) => {
                values.extend(collect(shared.options(), sub, false)?);
                LEFTOVER_ID
            }
            None => "",
        };
        let leftover = sub
            .try_get_many::<String>(leftover_id)
            .map_err(|source| GrammarError::Extract {
                name: name.to_string(),
                source,
            })?
            .map(|items| items.cloned().collect())
            .unwrap_or_default();

        Ok(Split {
            values,
            name: Some(name.to_string()),
            leftover,
        })
    }
}

fn base_command(name: &str) -> Command {
    Command::new(name.to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .color(ColorChoice::Never)
}

fn command_name(schema: &OptionSchema) -> &str {
    match schema.caption() {
        "" => "options",
        caption => caption,
    }
}

fn leftover_arg() -> Arg {
    Arg::new(LEFTOVER_ID)
        .index(1)
        .num_args(1..)
        .action(ArgAction::Append)
        .value_parser(value_parser!(String))
        .trailing_var_arg(true)
        .allow_hyphen_values(true)
}

/// `--name` / `-s` option for `def`.
fn option_arg(def: &OptionDef) -> Arg {
    typed(flag(Arg::new(def.name.clone()), def), def)
}

fn flag(arg: Arg, def: &OptionDef) -> Arg {
    let arg = arg.long(def.name.clone());
    match def.short {
        Some(short) => arg.short(short),
        None => arg,
    }
}

fn typed(arg: Arg, def: &OptionDef) -> Arg {
    let arg = match def.kind {
        ValueKind::Switch => arg.action(ArgAction::SetTrue),
        ValueKind::Int => arg
            .action(ArgAction::Set)
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true),
        ValueKind::UInt => arg.action(ArgAction::Set).value_parser(value_parser!(u64)),
        ValueKind::Float => arg
            .action(ArgAction::Set)
            .value_parser(value_parser!(f64))
            .allow_negative_numbers(true),
        ValueKind::Text => arg.action(ArgAction::Set).value_parser(value_parser!(String)),
        ValueKind::List => arg
            .action(ArgAction::Append)
            .value_parser(value_parser!(String)),
    };

    let arg = if def.help.is_empty() {
        arg
    } else {
        arg.help(def.help.clone())
    };
    arg.hide(def.hidden)
}

/// Values of `options` found in `matches`; defaults fill the gaps when
/// `with_defaults` is set.
fn collect(
    options: &[OptionDef],
    matches: &ArgMatches,
    with_defaults: bool,
) -> Result<ResultMap, GrammarError> {
    let mut values = ResultMap::new();

    for def in options {
        let supplied = matches.value_source(&def.name) == Some(ValueSource::CommandLine);
        if supplied {
            if let Some(value) = read_value(matches, def)? {
                values.insert(def.name.clone(), value, Source::Explicit);
                continue;
            }
        }
        if let (true, Some(default)) = (with_defaults, &def.default) {
            values.insert(def.name.clone(), default.clone(), Source::Defaulted);
        }
    }

    Ok(values)
}

fn read_value(matches: &ArgMatches, def: &OptionDef) -> Result<Option<Value>, GrammarError> {
    let id = def.name.as_str();
    let extract = |source: MatchesError| GrammarError::Extract {
        name: def.name.clone(),
        source,
    };

    let value = match def.kind {
        ValueKind::Switch => matches
            .try_get_one::<bool>(id)
            .map_err(extract)?
            .map(|b| Value::Bool(*b)),
        ValueKind::Int => matches
            .try_get_one::<i64>(id)
            .map_err(extract)?
            .map(|i| Value::Int(*i)),
        ValueKind::UInt => matches
            .try_get_one::<u64>(id)
            .map_err(extract)?
            .map(|u| Value::UInt(*u)),
        ValueKind::Float => matches
            .try_get_one::<f64>(id)
            .map_err(extract)?
            .map(|x| Value::Float(*x)),
        ValueKind::Text => matches
            .try_get_one::<String>(id)
            .map_err(extract)?
            .map(|s| Value::Text(s.clone())),
        ValueKind::List => matches
            .try_get_many::<String>(id)
            .map_err(extract)?
            .map(|items| Value::List(items.cloned().collect())),
    };

    Ok(value)
}
