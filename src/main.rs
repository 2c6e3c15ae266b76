use anyhow::Context;
use modecli::{
    logging, Dispatcher, DispatcherConfig, ModeHandler, ModeParser, OptionDef, OptionSchema,
    Parsed, Positional, ResultMap,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Copies from a source to a destination, both given positionally.
struct TwoProc;

impl ModeHandler for TwoProc {
    fn prepare(&mut self, parser: ModeParser) -> ModeParser {
        parser.positional(
            Positional::new()
                .slot("source-file")
                .slot("destination-file"),
        )
    }

    fn run(&mut self, values: &ResultMap) -> i32 {
        eprintln!("RUNNING SUBCOMMAND TWO:");
        eprintln!("  logfile: {}", values.get_str("logfile").unwrap_or_default());
        eprintln!("  loglevel: {}", values.get_int("loglevel").unwrap_or_default());
        eprintln!("  things: {}", values.get_str("things").unwrap_or_default());
        17
    }

    fn append_help(&self, out: &mut String) {
        out.push_str("  source-file - input data source\n");
        out.push_str("  destination-file - output location\n");
    }
}

/// Counts in integer steps up to the ingested counter.
#[derive(Default)]
struct ThreeProc {
    counter: u64,
}

impl ModeHandler for ThreeProc {
    fn ingest(&mut self, values: &ResultMap) -> anyhow::Result<()> {
        self.counter = values
            .get_uint("counter")
            .context("counter has a default and must be present")?;
        Ok(())
    }

    fn run(&mut self, _values: &ResultMap) -> i32 {
        eprintln!("RUNNING SUBCOMMAND THREE:");
        let steps: Vec<String> = (0..self.counter).map(|i| i.to_string()).collect();
        eprintln!("{}", steps.join(","));
        0
    }

    fn append_help(&self, out: &mut String) {
        out.push_str("Count in integer steps\n");
    }
}

fn build_dispatcher(config: DispatcherConfig) -> anyhow::Result<Dispatcher> {
    let common = OptionSchema::new("modecli demo")
        .option(
            OptionDef::text("logfile")
                .short('L')
                .default_value("/dev/null")
                .help("location of logfile"),
        )
        .option(
            OptionDef::int("loglevel")
                .default_value(1)
                .help("logging level"),
        )
        .option(OptionDef::switch("json").help("print resolved options as JSON"));

    let dispatcher = Dispatcher::with_config(common, config)?
        .add(
            "one",
            OptionSchema::new("mode one").option(OptionDef::switch("stuff").help("do stuff")),
        )?
        .add_handler(
            "two",
            OptionSchema::new("mode two")
                .option(OptionDef::text("source-file").help("input data location"))
                .option(OptionDef::text("destination-file").help("output data location"))
                .option(
                    OptionDef::text("things")
                        .default_value("junk")
                        .help("get things"),
                ),
            Arc::new(Mutex::new(TwoProc)),
        )?
        .add_handler(
            "three",
            OptionSchema::new("mode three").option(
                OptionDef::uint("counter")
                    .short('c')
                    .default_value(0u64)
                    .help("how many things to count"),
            ),
            Arc::new(Mutex::new(ThreeProc::default())),
        )?;

    Ok(dispatcher)
}

fn describe(parsed: &Parsed) -> anyhow::Result<String> {
    if parsed.values.get_bool("json").unwrap_or(false) {
        return Ok(serde_json::to_string_pretty(&parsed.values)?);
    }

    let mut lines = vec![
        format!("Selected subcommand: {}", parsed.subcommand()),
        "VARIABLES:".to_string(),
    ];
    for (key, entry) in parsed.values.iter() {
        let marker = if parsed.values.is_defaulted(key) { " (default)" } else { "" };
        lines.push(format!("  {} = {}{}", key, entry.value, marker));
    }
    Ok(lines.join("\n"))
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = DispatcherConfig::load().context("loading dispatcher config")?;
    let mut dispatcher = build_dispatcher(config)?;

    let parsed = dispatcher.parse_env();
    println!("{}", describe(&parsed)?);

    let status = dispatcher.run_subcommand(&parsed.values)?;
    std::process::exit(status);
}
