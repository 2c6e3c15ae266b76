//! Per-subcommand behavior hooks.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::grammar::ModeParser;
use crate::values::ResultMap;

/// Behavior attached to one subcommand.
///
/// Every hook has a no-op default, so implementors override only what they
/// need. Handlers outlive individual parses and must not assume single use:
/// `prepare` and `ingest` run once per parse that selects the subcommand,
/// `run` only when the caller dispatches explicitly.
pub trait ModeHandler: Send {
    /// Reconfigure the subcommand parser before it runs, typically to attach
    /// a [`Positional`](crate::Positional) mapping.
    ///
    /// The returned parser is the one executed. Do not run it here.
    fn prepare(&mut self, parser: ModeParser) -> ModeParser {
        parser
    }

    /// Inspect the final values once the merge is complete.
    ///
    /// Returning an error fails the parse; use it for cross-field checks the
    /// schema cannot express.
    fn ingest(&mut self, _values: &ResultMap) -> anyhow::Result<()> {
        Ok(())
    }

    /// Application entry point for the selected subcommand.
    fn run(&mut self, _values: &ResultMap) -> i32 {
        0
    }

    /// Extra lines appended to usage text when this subcommand is selected.
    fn append_help(&self, _out: &mut String) {}
}

/// Handler shared between the registry and its owner.
pub type SharedHandler = Arc<Mutex<dyn ModeHandler>>;

/// Handler bound by [`Dispatcher::add`](crate::Dispatcher::add).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ModeHandler for NoopHandler {}

pub(crate) fn noop() -> SharedHandler {
    Arc::new(Mutex::new(NoopHandler))
}
