mod app;
mod cli;
mod completions;
mod config;
mod consistency;
mod db;
mod dispatch;
mod domain;
mod hydrate;
mod logging;
mod orchestrate;
mod store;
mod structural;
mod ui;

use app::{App, AppError};
use cli::{PlanSubcommands, RowSubcommands, TaskSubcommands};
use domain::entity::{NewRow, NewTask};
use domain::patch::{ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(err.exit_code());
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

/// JSON by default; `--text` switches to the terminal rendering.
fn emit<T: serde::Serialize + ?Sized>(value: &T, text: bool, render: impl FnOnce(&T)) {
    if text {
        render(value);
    } else {
        print_json(&value);
    }
}

fn run() -> Result<(), AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        completions::run_completions_command(args.shell);
        return Ok(());
    }

    let file = config::ConfigFile::load(&cli.config)?;
    let settings = config::Settings::resolve(
        file,
        config::Overrides {
            db_path: cli.db.clone(),
            log_filter: cli.log.clone(),
            log_format: cli.log_format,
        },
    );
    logging::init(&settings.log_filter, settings.log_format);
    tracing::debug!(db = %settings.db_path, config = %cli.config.display(), "opening plan store");

    let mut app = App::open(&settings.db_path)?;
    let text = cli.text;
    match cli.command {
        Commands::Plan(args) => run_plan_command(&mut app, args.command, text),
        Commands::Row(args) => run_row_command(&mut app, args.command, text),
        Commands::Task(args) => run_task_command(&mut app, args.command, text),
        Commands::Completions(_) => Ok(()),
    }
}

fn run_plan_command(app: &mut App, command: PlanSubcommands, text: bool) -> Result<(), AppError> {
    let plan = match command {
        PlanSubcommands::New(args) => app.create_project_plan(&args.title)?,
        PlanSubcommands::Show(args) => app.get_project_plan(args.id)?,
        PlanSubcommands::Patch(args) => {
            let patch: ProjectPlanPatchTemplate = dispatch::parse_patch(&args.body)?;
            app.patch_project_plan(args.id, &patch)?
        }
    };
    emit(&plan, text, ui::print_plan);
    Ok(())
}

fn run_row_command(app: &mut App, command: RowSubcommands, text: bool) -> Result<(), AppError> {
    let row = match command {
        RowSubcommands::New(args) => app.create_row(&NewRow {
            id: None,
            project_plan_id: args.plan_id,
            title: args.title,
            task_list: None,
        })?,
        RowSubcommands::Show(args) => app.get_row(args.id)?,
        RowSubcommands::List(args) => {
            let rows = app.list_rows(args.plan_id)?;
            emit(rows.as_slice(), text, ui::print_rows);
            return Ok(());
        }
        RowSubcommands::Patch(args) => {
            let patch: RowPatchTemplate = dispatch::parse_patch(&args.body)?;
            app.patch_row(args.id, &patch)?
        }
        RowSubcommands::Check(args) => {
            let patch: RowPatchTemplate = dispatch::parse_patch(&args.body)?;
            let report = app.check_row_patch(args.id, &patch)?;
            emit(&report, text, ui::print_check);
            return Ok(());
        }
        RowSubcommands::Delete(args) => app.delete_row(args.id)?,
    };
    emit(&row, text, ui::print_row);
    Ok(())
}

fn run_task_command(app: &mut App, command: TaskSubcommands, text: bool) -> Result<(), AppError> {
    let task = match command {
        TaskSubcommands::New(args) => app.create_task(&NewTask {
            id: None,
            row_id: Some(args.row_id),
            title: Some(args.title),
            size: Some(args.size),
            position: Some(args.position),
        })?,
        TaskSubcommands::Show(args) => app.get_task(args.id)?,
        TaskSubcommands::List(args) => {
            let tasks = app.list_tasks(args.row_id)?;
            emit(tasks.as_slice(), text, ui::print_tasks);
            return Ok(());
        }
        TaskSubcommands::Patch(args) => {
            let patch: TaskPatchTemplate = dispatch::parse_patch(&args.body)?;
            app.patch_task(args.id, &patch)?
        }
        TaskSubcommands::Delete(args) => app.delete_task(args.row_id, args.task_id)?,
    };
    emit(&task, text, ui::print_task);
    Ok(())
}
