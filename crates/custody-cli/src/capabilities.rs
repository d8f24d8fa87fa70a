//! # Capabilities Subcommand
//!
//! Prints the capability table: for each action, the roles permitted to
//! perform it.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use custody_core::{Action, Role};

/// Arguments for the `custody capabilities` subcommand.
#[derive(Args, Debug)]
pub struct CapabilitiesArgs {
    /// Emit JSON instead of a text table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Row {
    action: Action,
    roles: &'static [Role],
}

/// Execute the capabilities subcommand against stdout.
pub fn run_capabilities(args: &CapabilitiesArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_capabilities(args, &mut out)?;
    Ok(0)
}

/// Write the capability table to `out`.
pub fn write_capabilities(args: &CapabilitiesArgs, out: &mut dyn Write) -> Result<()> {
    if args.json {
        let rows: Vec<Row> = Action::ALL
            .iter()
            .map(|a| Row {
                action: *a,
                roles: a.allowed_roles(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    let width = Action::ALL
        .iter()
        .map(|a| a.as_str().len())
        .max()
        .unwrap_or(0);
    write!(out, "{:width$}", "action")?;
    for role in Role::ALL {
        write!(out, "  {role}")?;
    }
    writeln!(out)?;

    for action in Action::ALL {
        write!(out, "{:width$}", action.as_str())?;
        for role in Role::ALL {
            let mark = if action.permits(role) { "yes" } else { "-" };
            write!(out, "  {mark:<w$}", w = role.as_str().len())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(json: bool) -> String {
        let mut buf = Vec::new();
        write_capabilities(&CapabilitiesArgs { json }, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_table_has_a_row_per_action() {
        let text = render(false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), Action::ALL.len() + 1);
        assert!(lines[0].contains("head-investigator"));
        let inference = lines
            .iter()
            .find(|l| l.starts_with(Action::AddInference.as_str()))
            .unwrap();
        assert_eq!(inference.matches("yes").count(), 1);
    }

    #[test]
    fn json_matches_table() {
        let rows: serde_json::Value = serde_json::from_str(&render(true)).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), Action::ALL.len());
        for row in rows {
            let action: Action = serde_json::from_value(row["action"].clone()).unwrap();
            let roles: Vec<Role> = serde_json::from_value(row["roles"].clone()).unwrap();
            assert_eq!(roles, action.allowed_roles());
        }
    }
}
