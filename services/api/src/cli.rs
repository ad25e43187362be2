use crate::console;
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tower_staffing::error::AppError;
use tower_staffing::workflows::roster::Category;

#[derive(Parser, Debug)]
#[command(
    name = "tower-staffing",
    about = "Keep a tower's residents in the shops they are best at",
    version
)]
struct Cli {
    /// Roster snapshot file (overrides ROSTER_SNAPSHOT_PATH)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Add, edit, remove, or list residents
    Resident {
        #[command(subcommand)]
        command: ResidentCommand,
    },
    /// Add, edit, remove, or list shops
    Shop {
        #[command(subcommand)]
        command: ShopCommand,
    },
    /// Reassign residents to shops
    Optimize(OptimizeArgs),
    /// Merge scanned or exported residents into the roster
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    /// Print the current staffing report
    Report,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ResidentCommand {
    /// Add a resident; unspecified skills default to 5
    Add(ResidentAddArgs),
    /// Change skills or the dream job of a resident
    Update(ResidentUpdateArgs),
    /// Remove a resident and free their slot
    Remove {
        /// Resident id or name
        target: String,
    },
    /// List residents with their skills
    List,
}

#[derive(Args, Debug)]
pub(crate) struct ResidentAddArgs {
    pub(crate) name: String,
    /// Skill rating as CATEGORY=VALUE, repeatable (e.g. --skill Food=7)
    #[arg(long = "skill", value_parser = crate::infra::parse_skill)]
    pub(crate) skills: Vec<(Category, u8)>,
    /// Name of the shop this resident dreams of working in
    #[arg(long)]
    pub(crate) dream_job: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ResidentUpdateArgs {
    /// Resident id or name
    pub(crate) target: String,
    /// Skill rating as CATEGORY=VALUE, repeatable
    #[arg(long = "skill", value_parser = crate::infra::parse_skill)]
    pub(crate) skills: Vec<(Category, u8)>,
    /// New dream job; pass an empty string to clear it
    #[arg(long)]
    pub(crate) dream_job: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ShopCommand {
    /// Add a shop
    Add(ShopAddArgs),
    /// Change the category or capacity of a shop
    Update(ShopUpdateArgs),
    /// Remove a shop and unassign its workers
    Remove {
        /// Shop id or name
        target: String,
    },
    /// List shops with their current workers
    List,
}

#[derive(Args, Debug)]
pub(crate) struct ShopAddArgs {
    pub(crate) name: String,
    #[arg(long, value_parser = crate::infra::parse_category)]
    pub(crate) category: Category,
    #[arg(long, default_value_t = 3)]
    pub(crate) capacity: u32,
}

#[derive(Args, Debug)]
pub(crate) struct ShopUpdateArgs {
    /// Shop id or name
    pub(crate) target: String,
    #[arg(long, value_parser = crate::infra::parse_category)]
    pub(crate) category: Option<Category>,
    #[arg(long)]
    pub(crate) capacity: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct OptimizeArgs {
    /// Keep residents in their current shop where they still fit
    #[arg(long)]
    pub(crate) lock_existing: bool,
    /// Write the resulting assignments to a CSV file
    #[arg(long)]
    pub(crate) export_csv: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ImportCommand {
    /// Import a JSON array of residents (fenced or loosely quoted JSON is accepted)
    Json(ImportFileArgs),
    /// Import a CSV export with a name column and one column per category
    Csv(ImportFileArgs),
    /// Scan a screenshot of the resident list with the vision model
    Image(ImportFileArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ImportFileArgs {
    pub(crate) path: PathBuf,
    /// Show what would change without saving
    #[arg(long)]
    pub(crate) dry_run: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let snapshot = cli.snapshot;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, snapshot).await,
        Command::Resident { command } => console::run_resident(command, snapshot),
        Command::Shop { command } => console::run_shop(command, snapshot),
        Command::Optimize(args) => console::run_optimize(args, snapshot),
        Command::Import { command } => console::run_import(command, snapshot).await,
        Command::Report => console::run_report(snapshot),
    }
}
