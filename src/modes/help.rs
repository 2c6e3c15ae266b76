//! Usage text for the common options, the subcommand menu, and the selected
//! subcommand.

use std::fmt::Write;

use crate::modes::registry::ModeEntry;
use crate::schema::{OptionDef, OptionSchema};

/// Render one schema: caption line, then aligned option rows.
pub fn render_schema(schema: &OptionSchema) -> String {
    let rows: Vec<(String, String)> = schema
        .options()
        .iter()
        .filter(|def| !def.hidden)
        .map(|def| (left_column(def), right_column(def)))
        .collect();

    let mut out = String::new();
    if !schema.caption().is_empty() {
        let _ = writeln!(out, "{}:", schema.caption());
    }

    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    for (left, right) in rows {
        if right.is_empty() {
            let _ = writeln!(out, "  {}", left);
        } else {
            let _ = writeln!(out, "  {:<width$}  {}", left, right, width = width);
        }
    }
    out
}

fn left_column(def: &OptionDef) -> String {
    let mut left = match def.short {
        Some(short) => format!("-{}, --{}", short, def.name),
        None => format!("    --{}", def.name),
    };
    if let Some(placeholder) = def.kind.placeholder() {
        left.push(' ');
        left.push_str(placeholder);
    }
    left
}

fn right_column(def: &OptionDef) -> String {
    match &def.default {
        Some(default) if def.help.is_empty() => format!("[default: {}]", default),
        Some(default) => format!("{} [default: {}]", def.help, default),
        None => def.help.clone(),
    }
}

/// Full usage text.
///
/// `menu` is the `|`-joined subcommand list; `selected` is the subcommand
/// identified by this parse attempt, if any.
pub fn render_usage(common: &OptionSchema, menu: &str, selected: Option<&ModeEntry>) -> String {
    let mut out = render_schema(common);
    let _ = writeln!(out, "  [{}]", menu);
    out.push_str("  <subcommand args> ...\n");
    out.push('\n');

    if let Some(entry) = selected {
        out.push_str(&render_schema(&entry.schema));
        entry.handler.lock().append_help(&mut out);
    }
    out
}
