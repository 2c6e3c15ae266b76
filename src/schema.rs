//! Option schemas: declarative descriptions of the options a parse pass accepts.

use std::collections::{HashMap, HashSet};

use crate::error::GrammarError;
use crate::values::Value;

/// What an option takes on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean flag, no value (e.g., --verbose).
    Switch,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// Floating point number.
    Float,
    /// Free-form string.
    Text,
    /// Repeatable string; collects every occurrence in order.
    List,
}

impl ValueKind {
    /// Placeholder shown in usage text.
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            ValueKind::Switch => None,
            ValueKind::Int => Some("<int>"),
            ValueKind::UInt => Some("<uint>"),
            ValueKind::Float => Some("<float>"),
            ValueKind::Text => Some("<text>"),
            ValueKind::List => Some("<text>..."),
        }
    }
}

/// A single option definition.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDef {
    /// Long form without dashes; also the key in the result map.
    pub name: String,
    /// Optional short form (e.g., 'L' for -L).
    pub short: Option<char>,
    pub kind: ValueKind,
    /// Value used when the option is not supplied.
    pub default: Option<Value>,
    /// Human-readable description.
    pub help: String,
    /// Hidden options are parsed but left out of usage text.
    pub hidden: bool,
}

impl OptionDef {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            short: None,
            kind,
            default: None,
            help: String::new(),
            hidden: false,
        }
    }

    pub fn switch(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Switch)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Int)
    }

    pub fn uint(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::UInt)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Float)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Text)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::List)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// The default should match `kind`; it is stored as given.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// A captioned, ordered group of option definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSchema {
    caption: String,
    options: Vec<OptionDef>,
}

impl OptionSchema {
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            options: Vec::new(),
        }
    }

    /// Append an option definition.
    pub fn option(mut self, def: OptionDef) -> Self {
        self.options.push(def);
        self
    }

    /// Options of this schema that `other` does not also claim, by name or
    /// by short letter.
    pub fn unclaimed_by(&self, other: &OptionSchema) -> OptionSchema {
        let options = self
            .options
            .iter()
            .filter(|def| other.find(&def.name).is_none())
            .filter(|def| def.short.map_or(true, |c| other.find_short(c).is_none()))
            .cloned()
            .collect();
        OptionSchema {
            caption: self.caption.clone(),
            options,
        }
    }

    /// Reject schemas that reuse a name or a short letter.
    pub fn validate(&self) -> Result<(), GrammarError> {
        let mut names = HashSet::new();
        let mut shorts: HashMap<char, &str> = HashMap::new();
        for def in &self.options {
            if !names.insert(def.name.as_str()) {
                return Err(GrammarError::DuplicateOption {
                    name: def.name.clone(),
                });
            }
            if let Some(short) = def.short {
                if let Some(first) = shorts.insert(short, &def.name) {
                    return Err(GrammarError::DuplicateShort {
                        short,
                        first: first.to_string(),
                        second: def.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn options(&self) -> &[OptionDef] {
        &self.options
    }

    pub fn find(&self, name: &str) -> Option<&OptionDef> {
        self.options.iter().find(|d| d.name == name)
    }

    pub fn find_short(&self, short: char) -> Option<&OptionDef> {
        self.options.iter().find(|d| d.short == Some(short))
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_options_in_order() {
        let schema = OptionSchema::new("mode alpha")
            .option(OptionDef::text("stuff"))
            .option(OptionDef::int("count").short('c').default_value(3));

        let names: Vec<_> = schema.options().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["stuff", "count"]);
        assert_eq!(schema.find("count").unwrap().short, Some('c'));
        assert_eq!(schema.find("count").unwrap().default, Some(Value::Int(3)));
        assert!(schema.find("missing").is_none());
    }

    #[test]
    fn unclaimed_by_drops_shared_names_and_letters() {
        let common = OptionSchema::new("common")
            .option(OptionDef::int("level").short('L'))
            .option(OptionDef::text("host").short('h'))
            .option(OptionDef::switch("verbose").short('v'));
        let sub = OptionSchema::new("mode alpha")
            .option(OptionDef::int("level"))
            .option(OptionDef::int("height").short('h'));

        let left = common.unclaimed_by(&sub);
        let names: Vec<_> = left.options().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["verbose"]);
        assert_eq!(left.caption(), "common");
    }

    #[test]
    fn validate_rejects_reused_names_and_letters() {
        let names = OptionSchema::new("s")
            .option(OptionDef::text("a"))
            .option(OptionDef::int("a"));
        assert!(matches!(
            names.validate(),
            Err(GrammarError::DuplicateOption { name }) if name == "a"
        ));

        let shorts = OptionSchema::new("s")
            .option(OptionDef::text("host").short('h'))
            .option(OptionDef::int("height").short('h'));
        assert!(matches!(
            shorts.validate(),
            Err(GrammarError::DuplicateShort { short: 'h', first, second })
                if first == "host" && second == "height"
        ));

        assert!(OptionSchema::new("s")
            .option(OptionDef::text("host").short('h'))
            .option(OptionDef::int("port").short('p'))
            .validate()
            .is_ok());
    }

    #[test]
    fn switches_have_no_placeholder() {
        assert_eq!(ValueKind::Switch.placeholder(), None);
        assert_eq!(ValueKind::List.placeholder(), Some("<text>..."));
    }
}
