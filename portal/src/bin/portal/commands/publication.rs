use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use portal::{JsonFileSource, PublicationInput};

use crate::context::{ProjectContext, acting_user};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Manual Entry",
        commands: &[
            "portal --as 2 publication add --title 'On Widgets' --authors 'B. Chen' --year 2021",
            "portal --as 2 publication list",
            "portal --as 1 publication list --owner 2",
            "portal --as 2 publication delete 12",
        ],
    },
    ExampleGroup {
        title: "Import From a Profile",
        commands: &[
            "portal --as 2 publication import 'https://scholar.google.com/citations?user=q9Z' --source-dir ./profiles",
        ],
    },
];

#[derive(Subcommand)]
pub enum PublicationCommands {
    /// Add a publication owned by the caller
    #[command(name = "add")]
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        authors: String,

        #[arg(long, default_value = "")]
        year: String,

        #[arg(long, default_value = "")]
        citations: String,
    },

    /// Edit a publication
    #[command(name = "update")]
    Update {
        id: i64,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        authors: String,

        #[arg(long, default_value = "")]
        year: String,

        #[arg(long, default_value = "")]
        citations: String,
    },

    /// List publications of the caller, or of another user (admin)
    #[command(name = "list")]
    List {
        #[arg(long)]
        owner: Option<i64>,
    },

    /// Delete a publication
    #[command(name = "delete")]
    Delete { id: i64 },

    /// Store a profile link and add its publications, skipping known titles
    #[command(name = "import")]
    Import {
        /// Profile link containing `user=<id>`
        link: String,

        /// Directory holding `<profile id>.json` exports
        #[arg(long, default_value = ".")]
        source_dir: PathBuf,
    },
}

pub fn handle_publication_commands(
    command: PublicationCommands,
    ctx: &ProjectContext,
    acting_as: Option<i64>,
    output: &OutputManager,
) -> Result<()> {
    let portal = ctx.open_portal()?;
    let actor = acting_user(&portal, acting_as)?;

    match command {
        PublicationCommands::Add {
            title,
            authors,
            year,
            citations,
        } => {
            let input = PublicationInput {
                title,
                authors,
                year,
                citations,
            };
            let id = portal.add_publication(&actor, &input)?;
            output.success(&format!("Added publication {id}"));
        }
        PublicationCommands::Update {
            id,
            title,
            authors,
            year,
            citations,
        } => {
            let input = PublicationInput {
                title,
                authors,
                year,
                citations,
            };
            portal.update_publication(&actor, id, &input)?;
            output.success(&format!("Updated publication {id}"));
        }
        PublicationCommands::List { owner } => {
            let publications = portal.publications(&actor, owner.unwrap_or(actor.id))?;
            output.display(&publications)?;
        }
        PublicationCommands::Delete { id } => {
            portal.delete_publication(&actor, id)?;
            output.success(&format!("Deleted publication {id}"));
        }
        PublicationCommands::Import { link, source_dir } => {
            output.verbose(&format!("reading profiles from {}", source_dir.display()));
            let source = JsonFileSource::new(source_dir);
            let summary = portal
                .import_publications(&actor, &source, &link)
                .context("Import failed")?;
            output.json(&summary)?;
            output.success(&format!(
                "Fetched {} publications. Saved: {}, Skipped: {}",
                summary.fetched, summary.saved, summary.skipped
            ));
        }
    }

    Ok(())
}
