use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;

use portal::{ReportKind, report_filename};

use crate::context::{ProjectContext, acting_user};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Reports (admin)",
    commands: &[
        "portal --as 1 report patents                     # reports/patents_report_<date>.csv",
        "portal --as 1 report publications --out pubs.csv",
        "portal --as 1 --output table report commercializations --print",
    ],
}];

#[derive(Args)]
pub struct ReportArgs {
    /// publications, patents or commercializations
    #[arg(value_parser = parse_kind)]
    kind: ReportKind,

    /// Output file (defaults to the configured report directory)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the report instead of writing a file
    #[arg(long)]
    print: bool,
}

fn parse_kind(raw: &str) -> Result<ReportKind, String> {
    ReportKind::parse(raw).ok_or_else(|| format!("unknown report `{raw}`"))
}

pub fn handle_report(
    args: ReportArgs,
    ctx: &ProjectContext,
    acting_as: Option<i64>,
    output: &OutputManager,
) -> Result<()> {
    let portal = ctx.open_portal()?;
    let actor = acting_user(&portal, acting_as)?;
    let report = portal.report(&actor, args.kind)?;

    if args.print {
        return output.display(&report);
    }

    let path = match args.out {
        Some(path) => path,
        None => ctx
            .report_dir()
            .join(report_filename(args.kind, Local::now().date_naive())),
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    report
        .write_csv(BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    output.json(&serde_json::json!({ "kind": args.kind, "path": path, "rows": report.rows.len() }))?;
    output.success(&format!("Wrote {} row(s) to {}", report.rows.len(), path.display()));
    Ok(())
}
