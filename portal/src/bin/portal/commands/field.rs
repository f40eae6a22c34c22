use anyhow::{Result, bail};
use clap::Subcommand;

use portal::{AddColumnOutcome, DropColumnOutcome, EntityTable, FieldSpec};

use crate::commands::parse_table;
use crate::context::{ProjectContext, acting_user};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Add Fields (admin)",
        commands: &[
            "portal --as 1 field add patents patent_office --type text --label 'Patent Office'",
            "portal --as 1 field add patents granted --type bool",
            "portal --as 1 field add commercializations stage --type select --options 'seed, series a, exit'",
        ],
    },
    ExampleGroup {
        title: "Inspect",
        commands: &[
            "portal field list patents           # Declaration order",
            "portal field list patents --form    # With input kinds",
            "portal field reconcile              # Compare metadata with stored columns",
        ],
    },
    ExampleGroup {
        title: "Drop Fields (admin)",
        commands: &["portal --as 1 field drop patents patent_office"],
    },
];

#[derive(Subcommand)]
pub enum FieldCommands {
    /// Add a typed column to patents or commercializations
    #[command(name = "add")]
    Add {
        /// patents or commercializations
        table: String,

        /// Column name: a letter, then letters, digits or underscores
        name: String,

        /// text, longtext, textarea, select, date, int, number, float, bool, checkbox
        #[arg(long = "type", short = 't')]
        field_type: String,

        /// Display label (defaults to the name)
        #[arg(long)]
        label: Option<String>,

        /// Mark the field as required on forms
        #[arg(long)]
        required: bool,

        /// Comma separated choices for select fields
        #[arg(long)]
        options: Option<String>,
    },

    /// Drop a dynamic column and its definition
    #[command(name = "drop")]
    Drop { table: String, name: String },

    /// List registered fields of a table
    #[command(name = "list")]
    List {
        #[arg(value_parser = parse_table)]
        table: EntityTable,

        /// Include the input kind forms render
        #[arg(long)]
        form: bool,
    },

    /// Report fields without columns and columns without fields
    #[command(name = "reconcile")]
    Reconcile {
        #[arg(value_parser = parse_table)]
        table: Option<EntityTable>,
    },
}

pub fn handle_field_commands(
    command: FieldCommands,
    ctx: &ProjectContext,
    acting_as: Option<i64>,
    output: &OutputManager,
) -> Result<()> {
    let portal = ctx.open_portal()?;

    match command {
        FieldCommands::Add {
            table,
            name,
            field_type,
            label,
            required,
            options,
        } => {
            let actor = acting_user(&portal, acting_as)?;
            let mut spec = FieldSpec::new(table, name, field_type).required(required);
            if let Some(label) = label {
                spec = spec.label(label);
            }
            if let Some(options) = options {
                spec = spec.options(options);
            }

            match portal.add_field(&actor, &spec)? {
                AddColumnOutcome::Added(field) => {
                    output.json(&field)?;
                    output.success(&format!(
                        "Added {}.{} ({} stored as {})",
                        field.table,
                        field.field_name,
                        field.field_type,
                        field.field_type.storage_type().declaration()
                    ));
                }
                AddColumnOutcome::Rejected(reason) => {
                    output.error(&format!("Cannot add {}.{}: {reason}", spec.table_name, spec.field_name));
                    bail!("field add rejected");
                }
                AddColumnOutcome::PartialFailure { detail } => {
                    output.error(&detail);
                    output.info("Run 'portal field reconcile' to inspect the table.");
                    bail!("field add left metadata inconsistent");
                }
            }
        }
        FieldCommands::Drop { table, name } => {
            let actor = acting_user(&portal, acting_as)?;
            match portal.drop_field(&actor, &table, &name)? {
                DropColumnOutcome::Dropped => output.success(&format!("Dropped {table}.{name}")),
                DropColumnOutcome::Rejected(reason) => {
                    output.error(&format!("Cannot drop {table}.{name}: {reason}"));
                    bail!("field drop rejected");
                }
                DropColumnOutcome::PartialFailure { detail } => {
                    output.error(&detail);
                    bail!("field drop left metadata inconsistent");
                }
            }
        }
        FieldCommands::List { table, form } => {
            let fields = portal.fields(table, form)?;
            output.display(&fields)?;
        }
        FieldCommands::Reconcile { table } => {
            let tables = match table {
                Some(table) => vec![table],
                None => EntityTable::ALL.to_vec(),
            };
            let mut consistent = true;
            let mut reports = Vec::new();
            for table in tables {
                let report = portal.reconcile(table)?;
                output.heading(table.as_str());
                if report.is_consistent() {
                    output.success("metadata matches stored columns");
                }
                for name in &report.orphaned_metadata {
                    output.indented(ICONS.minus, &format!("{name}: registered but no column"));
                }
                for name in &report.unmanaged_columns {
                    output.indented(ICONS.plus, &format!("{name}: column without a registered field"));
                }
                for name in &report.unknown_type_fields {
                    output.indented(ICONS.warning, &format!("{name}: registered with an unknown type"));
                }
                consistent &= report.is_consistent();
                reports.push(report);
            }
            output.json(&reports)?;
            if !consistent {
                output.warning("Differences found; nothing was changed.");
            }
        }
    }

    Ok(())
}
