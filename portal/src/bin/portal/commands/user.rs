use anyhow::{Context, Result};
use clap::Subcommand;

use portal::NewUser;

use crate::context::{ProjectContext, acting_user};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Register",
        commands: &[
            "portal user add --name 'Ada Lovelace' --email ada@example.edu --role admin",
            "portal user add --name 'Bo Chen' --email bo@example.edu --role faculty --department Physics",
        ],
    },
    ExampleGroup {
        title: "Manage (admin)",
        commands: &[
            "portal --as 1 user list",
            "portal --as 1 user list --search chen   # Name or email contains 'chen'",
            "portal --as 1 user remove 7      # Also removes the user's publications and records",
        ],
    },
];

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    #[command(name = "add")]
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// admin, user or faculty
        #[arg(long, default_value = "user")]
        role: String,

        /// Department id or name; new names are created
        #[arg(long)]
        department: Option<String>,

        /// Bibliographic profile link
        #[arg(long)]
        scholar_link: Option<String>,
    },

    /// List users with their record counts (admin)
    #[command(name = "list")]
    List {
        /// Only users whose name or email contains this text
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Delete a user and everything they own (admin)
    #[command(name = "remove")]
    Remove { id: i64 },
}

pub fn handle_user_commands(
    command: UserCommands,
    ctx: &ProjectContext,
    acting_as: Option<i64>,
    output: &OutputManager,
) -> Result<()> {
    let portal = ctx.open_portal()?;

    match command {
        UserCommands::Add {
            name,
            email,
            role,
            department,
            scholar_link,
        } => {
            let mut new = NewUser::new(name, email, role);
            new.department = department;
            new.scholar_link = scholar_link;
            let user = portal.register_user(&new).context("Registration failed")?;
            output.json(&user)?;
            output.success(&format!("Registered {} as user {} ({})", user.email, user.id, user.role));
        }
        UserCommands::List { search } => {
            let actor = acting_user(&portal, acting_as)?;
            let users = portal.users(&actor, search.as_deref())?;
            output.display(&users)?;
        }
        UserCommands::Remove { id } => {
            let actor = acting_user(&portal, acting_as)?;
            let user = portal.user(id)?;
            portal.delete_user(&actor, id)?;
            output.success(&format!("Removed user {id} ({})", user.email));
        }
    }

    Ok(())
}
