//! reportview - browse, customize and export reports from the command line
//!
//! Usage: reportview [--config FILE] <command>

mod commands;
mod demo_db;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use rv_core::{AppSettings, AppState, Logic, PreferenceMirror};
use rv_data::{DataSourceAdapter, SampleSource, SqliteMirror, SqliteStore};
use rv_views::ExportFormat;

#[derive(Parser)]
#[command(name = "reportview")]
#[command(about = "Browse, customize and export reports")]
struct Cli {
    /// Settings file (JSON); defaults apply when it does not exist
    #[arg(long, global = true, default_value = "reportview.json")]
    config: PathBuf,

    /// Preference file, overriding the settings
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// SQLite database serving table-mapped reports
    #[arg(long, global = true)]
    remote: Option<PathBuf>,

    /// SQLite database receiving a copy of preference writes
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List report categories and their reports
    List,

    /// Show the columns a report displays
    Schema {
        report_id: String,
    },

    /// Show one page of a report
    Run {
        report_id: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Export one page of a report
    Export {
        report_id: String,
        #[arg(long, value_enum, default_value = "csv")]
        format: FormatArg,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show or change the selected columns of a report
    Customize {
        report_id: String,
        /// Comma-separated column keys, `table.column` for mapped reports
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
    },

    /// Create a report from remote table columns
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        /// `table:col1,col2` or `table:*`; repeat for more tables
        #[arg(long = "table", required = true)]
        tables: Vec<String>,
    },

    /// Delete a custom report and its preferences
    Delete {
        report_id: String,
    },

    /// Show or change the saved filters of a report
    Filter {
        report_id: String,
        #[arg(long, value_enum)]
        logic: Option<LogicArg>,
        /// `field:condition:value`; repeat for more items
        #[arg(long = "item")]
        items: Vec<String>,
        /// Remove every saved filter item
        #[arg(long)]
        clear: bool,
    },

    /// Create a demo HR database (employees, departments)
    SeedDemo {
        path: PathBuf,
        #[arg(long, default_value = "50")]
        count: usize,
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Paging, sorting and quick filter options shared by `run` and `export`
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    #[arg(long, default_value = "1")]
    pub page: usize,
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Sort key; ascending unless --desc is given
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long, requires = "sort")]
    pub desc: bool,
    #[arg(long)]
    pub start: Option<NaiveDate>,
    #[arg(long)]
    pub end: Option<NaiveDate>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Excel,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Excel => ExportFormat::Excel,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogicArg {
    And,
    Or,
}

impl From<LogicArg> for Logic {
    fn from(arg: LogicArg) -> Self {
        match arg {
            LogicArg::And => Logic::And,
            LogicArg::Or => Logic::Or,
        }
    }
}

/// Services a command runs against
pub struct Context {
    pub state: AppState,
    pub adapter: Arc<DataSourceAdapter>,
}

impl Context {
    fn open(cli: &Cli) -> Result<Self> {
        let mut settings = AppSettings::load(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?;
        if let Some(path) = &cli.storage {
            settings.storage_path = Some(path.clone());
        }
        if settings.storage_path.is_none() {
            settings.storage_path = Some(PathBuf::from("reportview-prefs.json"));
        }
        if let Some(path) = &cli.remote {
            settings.remote_database = Some(path.clone());
        }
        if let Some(path) = &cli.mirror {
            settings.mirror_database = Some(path.clone());
        }

        let mirror: Option<Arc<dyn PreferenceMirror>> = match &settings.mirror_database {
            Some(path) => Some(Arc::new(SqliteMirror::open(path)?)),
            None => None,
        };
        let remote = settings
            .remote_database
            .as_ref()
            .map(SqliteStore::open)
            .transpose()?;

        let state = AppState::open(settings, mirror)?;
        let sample = Arc::new(SampleSource::from_settings(&state.settings.sample));
        let mut adapter = DataSourceAdapter::new(state.catalog.clone(), sample);
        if let Some(store) = remote {
            info!(path = %store.path().display(), "remote store attached");
            adapter = adapter.with_remote(Arc::new(store));
        }

        Ok(Self {
            state,
            adapter: Arc::new(adapter),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Command::SeedDemo { path, count, seed } = &cli.command {
        demo_db::create_demo_database(path, *count, *seed)?;
        println!("Demo database written to {}", path.display());
        return Ok(());
    }

    let ctx = Context::open(&cli)?;

    match cli.command {
        Command::List => commands::list(&ctx),
        Command::Schema { report_id } => commands::schema(&ctx, &report_id),
        Command::Run { report_id, page } => commands::run(&ctx, &report_id, &page).await,
        Command::Export {
            report_id,
            format,
            page,
        } => commands::export(&ctx, &report_id, format.into(), &page).await,
        Command::Customize { report_id, columns } => {
            commands::customize(&ctx, &report_id, columns).await
        }
        Command::Create {
            name,
            description,
            category,
            tables,
        } => commands::create(&ctx, name, description, category, &tables).await,
        Command::Delete { report_id } => commands::delete(&ctx, &report_id),
        Command::Filter {
            report_id,
            logic,
            items,
            clear,
        } => commands::filter(&ctx, &report_id, logic.map(Logic::from), &items, clear),
        Command::SeedDemo { .. } => Ok(()),
    }
}
