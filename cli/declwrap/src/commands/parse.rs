//! `declwrap parse`: print the records found in one declaration source.

use std::path::Path;

use anyhow::{bail, Context, Result};
use declwrap_core::{DeclarationParser, DeclarationRecord};
use tracing::warn;

/// Parse `source` and print its records as dialect text or JSON.
pub fn run(source: &Path, format: Option<&str>, strict: bool) -> Result<()> {
    let text = std::fs::read_to_string(source)
        .with_context(|| format!("reading {}", source.display()))?;
    println!("{}", render(&text, format, strict, &source.display().to_string())?);
    Ok(())
}

pub(crate) fn render(text: &str, format: Option<&str>, strict: bool, name: &str) -> Result<String> {
    let parser = DeclarationParser::new(text).strict(strict);
    let mut records = parser.iter();
    let parsed: Vec<DeclarationRecord> = records
        .by_ref()
        .collect::<declwrap_core::Result<_>>()
        .with_context(|| format!("parsing {name}"))?;
    if records.dropped() > 0 {
        warn!(source = name, dropped = records.dropped(), "unrecognized declaration lines were dropped");
    }

    match format.unwrap_or("dialect") {
        "dialect" => Ok(parsed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")),
        "json" => serde_json::to_string_pretty(&parsed).context("serializing records"),
        other => bail!("unknown format '{other}' (expected dialect or json)"),
    }
}
