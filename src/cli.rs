use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::logging::LogFormat;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "tpm")]
#[command(bin_name = "tpm")]
#[command(version)]
#[command(about = "Plan tasks across rows of slots without letting them collide")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        global = true,
        env = "TPM_DB_PATH",
        help = "Path to the SQLite database [default: .tpm/state.sqlite]."
    )]
    pub db: Option<String>,

    #[arg(
        short = 'c',
        long,
        global = true,
        env = "TPM_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Optional TOML config file."
    )]
    pub config: PathBuf,

    #[arg(
        long,
        global = true,
        env = "TPM_LOG",
        help = "Log filter directive, e.g. `tpm=debug`."
    )]
    pub log: Option<String>,

    #[arg(
        long,
        global = true,
        env = "TPM_LOG_FORMAT",
        value_enum,
        help = "Log output format."
    )]
    pub log_format: Option<LogFormat>,

    #[arg(
        long,
        global = true,
        help = "Render results as text instead of JSON."
    )]
    pub text: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Manage project plans.")]
    Plan(PlanArgs),
    #[command(about = "Manage rows.")]
    Row(RowArgs),
    #[command(about = "Manage tasks.")]
    Task(TaskArgs),
    #[command(about = "Print shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum PlanSubcommands {
    #[command(about = "Create an empty project plan.")]
    New(PlanNewArgs),
    #[command(about = "Show a project plan with all rows and tasks.")]
    Show(IdArgs),
    #[command(about = "Apply a project plan patch (title and task moves).")]
    Patch(PatchArgs),
}

#[derive(Debug, Args)]
pub struct PlanNewArgs {
    #[arg(help = "Plan title.")]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct RowArgs {
    #[command(subcommand)]
    pub command: RowSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum RowSubcommands {
    #[command(about = "Create an empty row in a project plan.")]
    New(RowNewArgs),
    #[command(about = "Show a row with its tasks.")]
    Show(IdArgs),
    #[command(about = "List the rows of a project plan.")]
    List(RowListArgs),
    #[command(about = "Apply a row patch (title, task positions and sizes).")]
    Patch(PatchArgs),
    #[command(about = "Validate a row patch without writing anything.")]
    Check(PatchArgs),
    #[command(about = "Delete a row that has no tasks.")]
    Delete(IdArgs),
}

#[derive(Debug, Args)]
pub struct RowNewArgs {
    #[arg(help = "Project plan id.")]
    pub plan_id: i64,

    #[arg(help = "Row title.")]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct RowListArgs {
    #[arg(help = "Project plan id.")]
    pub plan_id: i64,
}

#[derive(Debug, Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum TaskSubcommands {
    #[command(about = "Create a task in a row. No occupancy check is made.")]
    New(TaskNewArgs),
    #[command(about = "Show one task.")]
    Show(IdArgs),
    #[command(about = "List the tasks of a row.")]
    List(TaskListArgs),
    #[command(about = "Apply a single-task patch, possibly moving it to another row.")]
    Patch(PatchArgs),
    #[command(about = "Delete a task from a row.")]
    Delete(TaskDeleteArgs),
}

#[derive(Debug, Args)]
pub struct TaskNewArgs {
    #[arg(help = "Row id.")]
    pub row_id: i64,

    #[arg(help = "Task title; may be empty.")]
    pub title: String,

    #[arg(short = 's', long, help = "Number of slots the task occupies.")]
    pub size: i64,

    #[arg(short = 'p', long, help = "First slot the task occupies.")]
    pub position: i64,
}

#[derive(Debug, Args)]
pub struct TaskListArgs {
    #[arg(help = "Row id.")]
    pub row_id: i64,
}

#[derive(Debug, Args)]
pub struct TaskDeleteArgs {
    #[arg(help = "Row id the task belongs to.")]
    pub row_id: i64,

    #[arg(help = "Task id.")]
    pub task_id: i64,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    #[arg(help = "Entity id.")]
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct PatchArgs {
    #[arg(help = "Id of the entity being patched.")]
    pub id: i64,

    #[command(flatten)]
    pub body: PatchBody,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PatchBody {
    #[arg(long, help = "Patch body as inline JSON.")]
    pub json: Option<String>,

    #[arg(long, help = "Read the JSON patch body from a file (`-` for stdin).")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate completions for.")]
    pub shell: Shell,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
