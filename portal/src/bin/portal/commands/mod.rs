pub mod department;
pub mod field;
pub mod init;
pub mod publication;
pub mod record;
pub mod report;
pub mod user;

use anyhow::{Result, bail};

use portal::{EntityTable, FormValues};

/// Parses `key=value` pairs given with `--set`
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

/// Clap value parser for the two extendable tables
pub fn parse_table(raw: &str) -> Result<EntityTable, String> {
    EntityTable::parse(raw).ok_or_else(|| format!("unknown table `{raw}` (expected patents or commercializations)"))
}

pub fn into_form(pairs: Vec<(String, String)>) -> Result<FormValues> {
    let mut form = FormValues::new();
    for (key, value) in pairs {
        if form.insert(key.clone(), value).is_some() {
            bail!("`{key}` was given more than once");
        }
    }
    Ok(form)
}
