use anyhow::Result;
use clap::Subcommand;

use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Departments",
    commands: &["portal department list    # Departments are created on registration"],
}];

#[derive(Subcommand)]
pub enum DepartmentCommands {
    /// List departments by name
    #[command(name = "list")]
    List,
}

pub fn handle_department_commands(command: DepartmentCommands, ctx: &ProjectContext, output: &OutputManager) -> Result<()> {
    let portal = ctx.open_portal()?;
    match command {
        DepartmentCommands::List => output.display(&portal.departments()?)?,
    }
    Ok(())
}
