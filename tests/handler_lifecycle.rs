//! Handler hooks: when they fire, what they see, and how dispatch reaches them.

use modecli::{
    Dispatcher, ModeError, ModeHandler, ModeParser, OptionDef, OptionSchema, Outcome, Positional,
    ResultMap,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn split(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

/// Counts hook calls and records the keys seen by `ingest`.
#[derive(Default)]
struct CountingHandler {
    prepared: usize,
    ingested: usize,
    ran: usize,
    seen: String,
}

impl ModeHandler for CountingHandler {
    fn prepare(&mut self, parser: ModeParser) -> ModeParser {
        self.prepared += 1;
        parser
    }

    fn ingest(&mut self, values: &ResultMap) -> anyhow::Result<()> {
        self.ingested += 1;
        self.seen = values.keys().collect::<Vec<_>>().join("|");
        Ok(())
    }

    fn run(&mut self, _values: &ResultMap) -> i32 {
        self.ran += 1;
        7
    }
}

fn beta_schema() -> OptionSchema {
    OptionSchema::new("mode beta")
        .option(OptionDef::int("b0"))
        .option(OptionDef::int("b1").default_value(17))
        .option(OptionDef::int("b2"))
}

// =============================================================================
// HOOK ORDER
// =============================================================================

#[test]
fn parse_prepares_and_ingests_but_does_not_run() {
    let handler = Arc::new(Mutex::new(CountingHandler::default()));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("beta", beta_schema(), handler.clone())
        .unwrap();

    let parsed = dispatcher
        .parse("dummy_prog", split("beta --b1 23"))
        .unwrap()
        .into_parsed()
        .unwrap();

    {
        let state = handler.lock();
        assert_eq!(state.prepared, 1);
        assert_eq!(state.ingested, 1);
        assert_eq!(state.ran, 0);
        assert_eq!(state.seen, "b1|subcommand");
    }
    assert_eq!(parsed.values.get_int("b1"), Some(23));
    assert!(!parsed.values.contains("b0"));

    let status = dispatcher.dispatch(&parsed.selection, &parsed.values).unwrap();
    assert_eq!(status, 7);
    assert_eq!(handler.lock().ran, 1);

    let status = dispatcher.run_subcommand(&parsed.values).unwrap();
    assert_eq!(status, 7);
    assert_eq!(handler.lock().ran, 2);
}

#[test]
fn handler_state_persists_across_parses() {
    let handler = Arc::new(Mutex::new(CountingHandler::default()));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("beta", beta_schema(), handler.clone())
        .unwrap()
        .add("alpha", OptionSchema::new("mode alpha"))
        .unwrap();

    for _ in 0..3 {
        dispatcher.parse("dummy_prog", split("beta")).unwrap();
    }
    dispatcher.parse("dummy_prog", split("alpha")).unwrap();

    let state = handler.lock();
    assert_eq!(state.prepared, 3);
    assert_eq!(state.ingested, 3);
    assert_eq!(state.seen, "b1|subcommand");
}

#[test]
fn help_fires_no_hooks() {
    let handler = Arc::new(Mutex::new(CountingHandler::default()));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("beta", beta_schema(), handler.clone())
        .unwrap();

    let outcome = dispatcher.parse("dummy_prog", split("beta --help")).unwrap();
    assert!(matches!(outcome, Outcome::Help(_)));

    let state = handler.lock();
    assert_eq!(state.prepared, 0);
    assert_eq!(state.ingested, 0);
}

#[test]
fn strict_failure_skips_ingest() {
    let handler = Arc::new(Mutex::new(CountingHandler::default()));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("beta", beta_schema(), handler.clone())
        .unwrap();

    assert!(dispatcher.parse("dummy_prog", split("beta --b9 1")).is_err());

    let state = handler.lock();
    assert_eq!(state.prepared, 1);
    assert_eq!(state.ingested, 0);
}

// =============================================================================
// POSITIONAL BINDING
// =============================================================================

struct InOut;

impl ModeHandler for InOut {
    fn prepare(&mut self, parser: ModeParser) -> ModeParser {
        parser.positional(Positional::new().slot("input").slot("output"))
    }
}

struct Fanout;

impl ModeHandler for Fanout {
    fn prepare(&mut self, parser: ModeParser) -> ModeParser {
        parser.positional(Positional::new().slot("source").rest("outputs"))
    }
}

#[test]
fn positional_slots_bind_in_order() {
    let schema = OptionSchema::new("mode copy")
        .option(OptionDef::text("input"))
        .option(OptionDef::text("output"));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("copy", schema, Arc::new(Mutex::new(InOut)))
        .unwrap();

    let parsed = dispatcher
        .parse("dummy_prog", split("copy in.txt out.txt"))
        .unwrap()
        .into_parsed()
        .unwrap();

    assert_eq!(parsed.values.get_str("input"), Some("in.txt"));
    assert_eq!(parsed.values.get_str("output"), Some("out.txt"));
}

#[test]
fn rest_slot_collects_remaining_tokens() {
    let schema = OptionSchema::new("mode fan")
        .option(OptionDef::text("source"))
        .option(OptionDef::list("outputs"));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("fan", schema, Arc::new(Mutex::new(Fanout)))
        .unwrap();

    let parsed = dispatcher
        .parse("dummy_prog", split("fan src o0 o1 o2"))
        .unwrap()
        .into_parsed()
        .unwrap();

    assert_eq!(parsed.values.get_str("source"), Some("src"));
    assert_eq!(
        parsed.values.get_list("outputs"),
        Some(&["o0".to_string(), "o1".to_string(), "o2".to_string()][..])
    );
}

#[test]
fn too_many_positionals_fail() {
    let schema = OptionSchema::new("mode copy")
        .option(OptionDef::text("input"))
        .option(OptionDef::text("output"));
    let mut dispatcher = Dispatcher::bare()
        .add_handler("copy", schema, Arc::new(Mutex::new(InOut)))
        .unwrap();

    let failure = dispatcher
        .parse("dummy_prog", split("copy a b c"))
        .unwrap_err();
    assert!(failure.error.is_usage_error());
}

// =============================================================================
// INGEST ERRORS AND SELECTION RESET
// =============================================================================

struct Picky;

impl ModeHandler for Picky {
    fn ingest(&mut self, values: &ResultMap) -> anyhow::Result<()> {
        match values.get_int("size") {
            Some(size) if size > 0 => Ok(()),
            _ => anyhow::bail!("size must be positive"),
        }
    }

    fn run(&mut self, _values: &ResultMap) -> i32 {
        3
    }
}

fn picky_dispatcher() -> Dispatcher {
    let schema = OptionSchema::new("mode picky").option(OptionDef::int("size").default_value(0));
    Dispatcher::bare()
        .add_handler("picky", schema, Arc::new(Mutex::new(Picky)))
        .unwrap()
}

#[test]
fn ingest_error_fails_the_parse() {
    let mut dispatcher = picky_dispatcher();

    let failure = dispatcher
        .parse("dummy_prog", split("picky --size 0"))
        .unwrap_err();

    match &failure.error {
        ModeError::Ingest { mode, source } => {
            assert_eq!(mode, "picky");
            assert!(source.to_string().contains("size must be positive"));
        }
        other => panic!("expected ingest error, got {other:?}"),
    }
    assert!(failure.error.is_usage_error());
    assert!(failure.usage.contains("mode picky:"));
}

#[test]
fn failed_parse_clears_selection_but_tokens_still_dispatch() {
    let mut dispatcher = picky_dispatcher();

    let parsed = dispatcher
        .parse("dummy_prog", split("picky --size 4"))
        .unwrap()
        .into_parsed()
        .unwrap();
    assert_eq!(dispatcher.selected(), Some("picky"));

    assert!(dispatcher.parse("dummy_prog", split("picky")).is_err());
    assert_eq!(dispatcher.selected(), None);

    let err = dispatcher.run_subcommand(&parsed.values).unwrap_err();
    assert!(matches!(err, ModeError::MissingHandler));

    let status = dispatcher.dispatch(&parsed.selection, &parsed.values).unwrap();
    assert_eq!(status, 3);
}

#[test]
fn run_before_any_parse_has_no_handler() {
    let dispatcher = picky_dispatcher();
    let err = dispatcher.run_subcommand(&ResultMap::new()).unwrap_err();
    assert!(matches!(err, ModeError::MissingHandler));
}
