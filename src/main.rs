mod app;
mod domain;
mod error;
mod logging;
mod output;
mod persistence;

use anyhow::{Context, Result};
use app::{AppState, ImportOutcome};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use domain::Theme;
use persistence::{get_data_dir, init_local_data_dir, log_dir, LocalStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taskfolio")]
#[command(about = "A personal task organizer: users, folders, lists and tasks", long_about = None)]
struct Cli {
    /// Data directory. Defaults to the nearest .taskfolio, then ~/.taskfolio
    #[arg(long, global = true, env = "TASKFOLIO_DIR")]
    data_dir: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .taskfolio directory in the current directory
    Init,
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),
    /// Manage folders of the current user
    #[command(subcommand)]
    Folder(FolderCommand),
    /// Manage lists of a folder
    #[command(subcommand)]
    List(ListCommand),
    /// Manage tasks of a list
    #[command(subcommand)]
    Task(TaskCommand),
    /// Show the current user's folders, lists and tasks as a tree
    Tree,
    /// Export users to a JSON file
    Export {
        /// User to export. Defaults to the current user
        #[arg(short, long, conflicts_with = "all")]
        user: Option<String>,
        /// Export every user
        #[arg(short, long)]
        all: bool,
        /// Output directory. Defaults to the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import users from a JSON file (an array replaces all users, an object adds one)
    Import { file: PathBuf },
    /// Show or change the theme (light, dark, toggle)
    Theme { mode: Option<String> },
    /// Show the current user, selection and theme
    Status,
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a user
    Add {
        name: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// List users
    Ls,
    /// Make a user current
    Switch { id: String },
}

#[derive(Subcommand)]
enum FolderCommand {
    /// Create a folder
    Add {
        name: String,
        #[arg(long)]
        emoji: Option<String>,
    },
    /// List folders
    Ls,
    /// Rename a folder or change its emoji
    Rename {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        emoji: Option<String>,
    },
    /// Delete a folder with all its lists and tasks
    Rm { id: String },
    /// Select a folder
    Select { id: String },
}

#[derive(Subcommand)]
enum ListCommand {
    /// Create a list in the given or selected folder
    Add {
        name: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// List the lists of the given or selected folder
    Ls {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Rename a list
    Rename { id: String, name: String },
    /// Delete a list with its tasks
    Rm {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Select a list
    Select {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create a task in the given or selected list
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Due date: YYYY-MM-DD (local midnight) or RFC 3339
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        list: Option<String>,
    },
    /// Show tasks grouped by due date
    Ls {
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        list: Option<String>,
    },
    /// Edit a task; omitted fields keep their value
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Toggle completion
    Toggle { id: String },
    /// Delete a task
    Rm {
        id: String,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        list: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Init) = cli.command {
        return init_local();
    }

    let data_dir = get_data_dir(cli.data_dir.as_deref())?;
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(logging::default_log_level());
    if let Err(e) = logging::init_logging(level, &log_dir(&data_dir)) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let local = LocalStore::open(&data_dir)?;
    let mut app = AppState::load(local);

    let result = run(&mut app, cli.command.unwrap_or(Commands::Status));

    // Persist whatever succeeded, even when the command itself failed
    if let Err(e) = app.save() {
        eprintln!("Error saving state: {:#}", e);
    }
    result
}

fn init_local() -> Result<()> {
    let current_dir = std::env::current_dir().context("Could not determine current directory")?;
    let data_dir = init_local_data_dir(&current_dir)?;
    println!("Initialized taskfolio directory: {}", data_dir.display());
    println!();
    println!("taskfolio will now use this local directory for storage.");
    Ok(())
}

fn run(app: &mut AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Init => init_local(),
        Commands::User(cmd) => run_user(app, cmd),
        Commands::Folder(cmd) => run_folder(app, cmd),
        Commands::List(cmd) => run_list(app, cmd),
        Commands::Task(cmd) => run_task(app, cmd),
        Commands::Tree => {
            let user = app.store.current_user().ok_or(error::StoreError::NoCurrentUser)?;
            print!("{}", output::render_tree(user));
            Ok(())
        }
        Commands::Export { user, all, output: out_dir } => {
            let user_id = if all {
                None
            } else {
                let id = user
                    .or_else(|| app.store.current_user_id().map(str::to_string))
                    .ok_or(error::StoreError::NoCurrentUser)?;
                Some(id)
            };
            let dir = match out_dir {
                Some(dir) => dir,
                None => std::env::current_dir().context("Could not determine current directory")?,
            };
            let path = app.export_to_dir(&dir, user_id.as_deref())?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        Commands::Import { file } => {
            match app.import_file(&file)? {
                ImportOutcome::Replaced { count } => println!("Replaced all users with {} imported", count),
                ImportOutcome::Appended { user_id } => println!("Imported user {}", user_id),
            }
            Ok(())
        }
        Commands::Theme { mode } => {
            match mode.as_deref() {
                None => {}
                Some("toggle") => {
                    app.toggle_theme();
                }
                Some(other) => {
                    let theme: Theme = other.parse().map_err(anyhow::Error::msg)?;
                    app.set_theme(theme);
                }
            }
            println!("Theme: {}", app.theme);
            Ok(())
        }
        Commands::Status => {
            match app.store.current_user() {
                Some(user) => {
                    let tasks: usize = user.folders.iter().map(|f| f.task_count()).sum();
                    println!("User: {} ({})", user.name, user.id);
                    println!("Folders: {}  Tasks: {}", user.folders.len(), tasks);
                    if let Some(folder_id) = app.selection.folder_id() {
                        let folder = app.store.folder(folder_id)?;
                        println!("Selected folder: {} {}", folder.emoji, folder.name);
                        if let Some(list_id) = app.selection.list_id() {
                            println!("Selected list: {}", app.store.list(folder_id, list_id)?.name);
                        }
                    }
                }
                None => println!("No current user. Create one with `taskfolio user add <name>`."),
            }
            println!("Theme: {}", app.theme);
            Ok(())
        }
    }
}

fn run_user(app: &mut AppState, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Add { name, image } => {
            let user = app.create_user(&name, image)?;
            println!("Created user {} ({})", user.name, user.id);
        }
        UserCommand::Ls => {
            print!("{}", output::render_users(app.store.users(), app.store.current_user_id()));
        }
        UserCommand::Switch { id } => {
            app.switch_user(&id)?;
            println!("Switched to {}", id);
        }
    }
    Ok(())
}

fn run_folder(app: &mut AppState, cmd: FolderCommand) -> Result<()> {
    match cmd {
        FolderCommand::Add { name, emoji } => {
            let folder = app.create_folder(&name, emoji)?;
            println!("Created folder {} {} ({})", folder.emoji, folder.name, folder.id);
        }
        FolderCommand::Ls => {
            print!("{}", output::render_folders(app.store.folders()?, &app.selection));
        }
        FolderCommand::Rename { id, name, emoji } => {
            let current = app.store.folder(&id)?;
            let name = name.unwrap_or_else(|| current.name.clone());
            let emoji = emoji.or_else(|| Some(current.emoji.clone()));
            app.rename_folder(&id, &name, emoji)?;
            println!("Updated folder {}", id);
        }
        FolderCommand::Rm { id } => {
            let folder = app.delete_folder(&id)?;
            println!("Deleted folder {} with {} lists", folder.name, folder.lists.len());
        }
        FolderCommand::Select { id } => {
            app.select_folder(&id)?;
            println!("Selected folder {}", id);
        }
    }
    Ok(())
}

fn run_list(app: &mut AppState, cmd: ListCommand) -> Result<()> {
    match cmd {
        ListCommand::Add { name, folder } => {
            let list = app.create_list(folder.as_deref(), &name)?;
            println!("Created list {} ({})", list.name, list.id);
        }
        ListCommand::Ls { folder } => {
            print!("{}", output::render_lists(app.lists(folder.as_deref())?, &app.selection));
        }
        ListCommand::Rename { id, name } => {
            app.rename_list(&id, &name)?;
            println!("Renamed list {}", id);
        }
        ListCommand::Rm { id, folder } => {
            let list = app.delete_list(folder.as_deref(), &id)?;
            println!("Deleted list {} with {} tasks", list.name, list.tasks.len());
        }
        ListCommand::Select { id, folder } => {
            app.select_list(folder.as_deref(), &id)?;
            println!("Selected list {}", id);
        }
    }
    Ok(())
}

fn run_task(app: &mut AppState, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Add {
            name,
            description,
            due,
            folder,
            list,
        } => {
            let due = due.as_deref().map(parse_due_arg).transpose()?;
            let task = app.create_task(folder.as_deref(), list.as_deref(), &name, &description, due)?;
            println!("Created task {} ({})", task.name, task.id);
        }
        TaskCommand::Ls { folder, list } => {
            let groups = app.grouped_tasks(folder.as_deref(), list.as_deref(), &Local::now())?;
            print!("{}", output::render_grouped_tasks(&groups));
        }
        TaskCommand::Edit {
            id,
            name,
            description,
            due,
            clear_due,
        } => {
            let current = app.store.find_task(&id)?;
            let name = name.unwrap_or_else(|| current.name.clone());
            let description = description.unwrap_or_else(|| current.description.clone());
            let due = match due {
                Some(text) => Some(parse_due_arg(&text)?),
                None if clear_due => None,
                None => current.due_date,
            };
            app.update_task(&id, &name, &description, due)?;
            println!("Updated task {}", id);
        }
        TaskCommand::Toggle { id } => {
            let completed = app.toggle_task(&id)?;
            println!("Task {} is now {}", id, if completed { "done" } else { "open" });
        }
        TaskCommand::Rm { id, folder, list } => {
            let task = app.delete_task(folder.as_deref(), list.as_deref(), &id)?;
            println!("Deleted task {}", task.name);
        }
    }
    Ok(())
}

/// Parse a due date argument: `YYYY-MM-DD` means local midnight, anything else must be RFC 3339
fn parse_due_arg(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("Invalid time of day")?;
        let local = Local
            .from_local_datetime(&midnight)
            .earliest()
            .with_context(|| format!("{} has no local midnight", date))?;
        return Ok(local.with_timezone(&Utc));
    }

    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid due date `{}`. Use YYYY-MM-DD or RFC 3339", text))
}
