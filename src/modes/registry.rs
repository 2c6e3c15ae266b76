//! Subcommand registry mapping names to schema and handler, kept sorted.

use std::collections::BTreeMap;

use crate::error::ModeError;
use crate::modes::handler::SharedHandler;
use crate::schema::OptionSchema;

/// A registered subcommand.
pub struct ModeEntry {
    pub schema: OptionSchema,
    pub handler: SharedHandler,
}

impl std::fmt::Debug for ModeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeEntry")
            .field("schema", &self.schema.caption())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct ModeRegistry {
    entries: BTreeMap<String, ModeEntry>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing any earlier entry under the same name.
    pub fn register(
        &mut self,
        name: &str,
        schema: OptionSchema,
        handler: SharedHandler,
    ) -> Result<(), ModeError> {
        if name.is_empty() {
            return Err(ModeError::EmptyName {
                what: "subcommand names",
            });
        }

        let previous = self
            .entries
            .insert(name.to_string(), ModeEntry { schema, handler });
        if previous.is_some() {
            tracing::debug!(subcommand = %name, "replaced earlier registration");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModeEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModeEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Names joined with `sep`, e.g. `alpha|beta|gamma`.
    pub fn menu(&self, sep: &str) -> String {
        self.names().join(sep)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::handler::noop;
    use crate::schema::OptionDef;

    #[test]
    fn names_are_sorted_regardless_of_insertion_order() {
        let mut registry = ModeRegistry::new();
        for name in ["gamma", "alpha", "beta"] {
            registry
                .register(name, OptionSchema::new(name), noop())
                .unwrap();
        }

        assert_eq!(registry.names(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(registry.menu("|"), "alpha|beta|gamma");
        assert_eq!(registry.menu(", "), "alpha, beta, gamma");
    }

    #[test]
    fn reregistration_replaces_entry() {
        let mut registry = ModeRegistry::new();
        registry
            .register("alpha", OptionSchema::new("first"), noop())
            .unwrap();
        registry
            .register(
                "alpha",
                OptionSchema::new("second").option(OptionDef::switch("x")),
                noop(),
            )
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("alpha").unwrap().schema.caption(), "second");
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut registry = ModeRegistry::new();
        let err = registry
            .register("", OptionSchema::default(), noop())
            .unwrap_err();
        assert!(matches!(err, ModeError::EmptyName { .. }));
        assert!(registry.is_empty());
    }
}
