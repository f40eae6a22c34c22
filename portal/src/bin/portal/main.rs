mod commands;
mod context;
mod examples;
mod output;
mod theme;

use std::fmt::Write;

use anyhow::Result;
use clap::{ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::{Color, Colorize, control::ShouldColorize};

use commands::{
    department::{DepartmentCommands, handle_department_commands},
    field::{FieldCommands, handle_field_commands},
    init::{InitArgs, handle_init},
    publication::{PublicationCommands, handle_publication_commands},
    record::{RecordCommands, handle_record_commands},
    report::{ReportArgs, handle_report},
    user::{UserCommands, handle_user_commands},
};
use context::ProjectContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("PORTAL_DB", "Database path used when no .portal/config.toml is found"),
    ("PORTAL_USER", "Default user id for --as"),
    ("RUST_LOG", "Log filter, e.g. portal=info"),
];

#[derive(Parser)]
#[command(name = "portal")]
#[command(version)]
#[command(
    about = "Innovation portal: users, publications and runtime-extensible records",
    long_about = r#"Innovation portal CLI that provides:

• Registration of users and departments
• Publications, entered by hand or imported from a profile export
• Patents and commercializations with admin-defined typed fields
• CSV reports whose columns follow the field registry

Commands:
  init         Create .portal/config.toml and the base schema
  user         Register and manage users
  department   List departments
  field        Add, drop and inspect dynamic fields
  record       Create, update and list patents and commercializations
  publication  Manage publications
  report       Export CSV reports
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Act as this user id
    #[arg(long = "as", value_name = "USER_ID", env = "PORTAL_USER", global = true)]
    acting_as: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parses arguments; each subcommand's long help ends with its examples.
    fn parse_with_examples() -> Self {
        let matches = build_cli_command().get_matches();
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }
}

fn build_cli_command() -> Command {
    let use_color = ShouldColorize::from_env().should_colorize();
    let mut command = Cli::command()
        .after_long_help(render_environment(use_color))
        .color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });

    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let plain = std::mem::take(subcommand);
            *subcommand = plain.after_long_help(render_examples(example.groups, use_color));
        }
    }
    command
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", paint("Examples:", THEME.highlight, true, use_color));
    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            buffer.push('\n');
        }
        let _ = writeln!(buffer, "  {}", paint(group.title, THEME.primary, true, use_color));
        for command in group.commands {
            let line = format!("{} {command}", ICONS.arrow);
            let _ = writeln!(buffer, "    {}", paint(&line, THEME.secondary, false, use_color));
        }
    }
    buffer
}

fn render_environment(use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", paint("Environment Variables:", THEME.highlight, true, use_color));
    for (key, description) in ENVIRONMENT_VARIABLES {
        let _ = writeln!(
            buffer,
            "  {}  {}",
            paint(key, THEME.key, true, use_color),
            paint(description, THEME.value, false, use_color)
        );
    }
    let _ = writeln!(
        buffer,
        "\n{} Use 'portal <command> --help' to view examples for each command.",
        paint("Tip:", THEME.highlight, true, use_color)
    );
    buffer
}

fn paint(text: &str, color: Color, bold: bool, use_color: bool) -> String {
    match (use_color, bold) {
        (false, _) => text.to_string(),
        (true, false) => text.color(color).to_string(),
        (true, true) => text.color(color).bold().to_string(),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create .portal/config.toml and the base schema
    Init(InitArgs),

    /// Register and manage users
    #[command(subcommand)]
    User(UserCommands),

    /// List departments
    #[command(subcommand)]
    Department(DepartmentCommands),

    /// Add, drop and inspect dynamic fields
    #[command(subcommand)]
    Field(FieldCommands),

    /// Create, update, list and delete patents and commercializations
    #[command(subcommand)]
    Record(RecordCommands),

    /// Manage publications
    #[command(subcommand)]
    Publication(PublicationCommands),

    /// Export a CSV report (admin)
    Report(ReportArgs),
}

fn main() {
    env_logger::init();

    let cli = Cli::parse_with_examples();
    if let Err(err) = execute(cli) {
        eprintln!("{} {err:#}", ICONS.error.color(THEME.error).bold());
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let global_options = GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    let output = OutputManager::new(global_options);

    if let Commands::Init(args) = cli.command {
        return handle_init(args, &output);
    }

    let ctx = ProjectContext::find()?;
    if !ctx.is_initialized() {
        output.verbose("no .portal/config.toml found; using PORTAL_DB");
    }

    match cli.command {
        Commands::Init(_) => {}
        Commands::User(command) => handle_user_commands(command, &ctx, cli.acting_as, &output)?,
        Commands::Department(command) => handle_department_commands(command, &ctx, &output)?,
        Commands::Field(command) => handle_field_commands(command, &ctx, cli.acting_as, &output)?,
        Commands::Record(command) => handle_record_commands(command, &ctx, cli.acting_as, &output)?,
        Commands::Publication(command) => handle_publication_commands(command, &ctx, cli.acting_as, &output)?,
        Commands::Report(args) => handle_report(args, &ctx, cli.acting_as, &output)?,
    }

    Ok(())
}
