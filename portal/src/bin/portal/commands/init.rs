use anyhow::{Context, Result};
use clap::Args;

use portal::PortalConfig;

use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Initialize",
    commands: &[
        "portal init                                # .portal/portal.db in the current directory",
        "portal init --database /srv/portal.db      # Explicit database location",
        "portal init --database '${PORTAL_DB}'      # Resolve the path from the environment",
    ],
}];

#[derive(Args)]
pub struct InitArgs {
    /// Database path written to the config (`${VAR}` is expanded at runtime)
    #[arg(long, default_value = ".portal/portal.db")]
    database: String,

    /// Directory CSV reports are written to
    #[arg(long, default_value = "reports")]
    report_dir: String,

    /// Overwrite an existing config
    #[arg(long)]
    force: bool,
}

pub fn handle_init(args: InitArgs, output: &OutputManager) -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let existing = ProjectContext::from_root(root.clone())?;

    output.heading("Initializing portal");

    if existing.is_initialized() && !args.force {
        output.warning(&format!("{} already exists; keeping it", existing.config_path.display()));
    } else {
        let mut config = PortalConfig::default();
        config.database.path = args.database;
        config.portal.report_dir = args.report_dir;
        config.validate()?;

        std::fs::create_dir_all(&existing.portal_dir)
            .with_context(|| format!("Failed to create {}", existing.portal_dir.display()))?;
        std::fs::write(&existing.config_path, config.to_toml()?)
            .with_context(|| format!("Failed to write {}", existing.config_path.display()))?;
        output.indented(ICONS.plus, &existing.config_path.display().to_string());
    }

    let ctx = ProjectContext::from_root(root)?;
    let portal = ctx.open_portal()?;
    output.indented(ICONS.plus, &format!("base schema at {}", portal.database().path().display()));
    output.success("Portal initialized");
    output.info("Register the first administrator with 'portal user add --role admin ...'");
    Ok(())
}
