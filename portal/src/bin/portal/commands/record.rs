use anyhow::Result;
use clap::Subcommand;

use portal::EntityTable;

use crate::commands::{into_form, parse_key_value, parse_table};
use crate::context::{ProjectContext, acting_user};
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, RecordList};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Create and Update",
        commands: &[
            "portal --as 2 record add patents --set title='Flux Capacitor' --set patent_office=USPTO",
            "portal --as 2 record update patents 4 --set title='Flux Capacitor II' --set granted=on",
        ],
    },
    ExampleGroup {
        title: "Read and Delete",
        commands: &[
            "portal --as 2 record list commercializations",
            "portal --as 2 record show patents 4",
            "portal --as 2 record delete patents 4",
        ],
    },
];

#[derive(Subcommand)]
pub enum RecordCommands {
    /// Create a record owned by the caller
    #[command(name = "add")]
    Add {
        #[arg(value_parser = parse_table)]
        table: EntityTable,

        /// Field values as key=value; unknown keys are ignored
        #[arg(long = "set", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },

    /// Replace a record's fields; omitted fields are cleared
    #[command(name = "update")]
    Update {
        #[arg(value_parser = parse_table)]
        table: EntityTable,

        id: i64,

        #[arg(long = "set", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },

    /// Show one record
    #[command(name = "show")]
    Show {
        #[arg(value_parser = parse_table)]
        table: EntityTable,

        id: i64,
    },

    /// List records visible to the caller
    #[command(name = "list")]
    List {
        #[arg(value_parser = parse_table)]
        table: EntityTable,
    },

    /// Delete a record
    #[command(name = "delete")]
    Delete {
        #[arg(value_parser = parse_table)]
        table: EntityTable,

        id: i64,
    },
}

pub fn handle_record_commands(
    command: RecordCommands,
    ctx: &ProjectContext,
    acting_as: Option<i64>,
    output: &OutputManager,
) -> Result<()> {
    let portal = ctx.open_portal()?;
    let actor = acting_user(&portal, acting_as)?;

    match command {
        RecordCommands::Add { table, values } => {
            let form = into_form(values)?;
            let id = portal.records(table).insert(&actor, &form)?;
            output.json(&serde_json::json!({ "table": table, "id": id }))?;
            output.success(&format!("Created {} {id}", table.singular()));
        }
        RecordCommands::Update { table, id, values } => {
            let form = into_form(values)?;
            portal.records(table).update(&actor, id, &form)?;
            output.success(&format!("Updated {} {id}", table.singular()));
        }
        RecordCommands::Show { table, id } => {
            let record = portal.records(table).get(&actor, id)?;
            if output.is_json() {
                output.json(&record)?;
            } else {
                output.heading(&format!("{} {id}", table.singular()));
                for (column, value) in &record.values {
                    output.key_value(column, &value.to_display_string());
                }
            }
        }
        RecordCommands::List { table } => {
            let records = portal.records(table).list(&actor)?;
            output.display(&RecordList(records))?;
        }
        RecordCommands::Delete { table, id } => {
            portal.records(table).delete(&actor, id)?;
            output.success(&format!("Deleted {} {id}", table.singular()));
        }
    }

    Ok(())
}
