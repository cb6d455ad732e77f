use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use save_core::{
    load_inspector_config_from_env, sanitize_directory, IngestScope, SaveInspector,
    SettingsUpdate,
};
use save_proto::SettingName;
use tracing::info;

mod commands;
mod report;

#[derive(Parser, Debug)]
#[command(author, version, about = "Timberborn save inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process the newest save (or every save) in a directory and record its snapshot.
    Load {
        directory: String,
        /// Process every save in the directory, oldest first.
        #[arg(long)]
        all: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
        /// Include every tracked grid in the JSON output.
        #[arg(long, requires = "json")]
        grids: bool,
    },
    /// Inspect or change the weather-duration settings of the newest save.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Print the clean-water timeline stored for a directory.
    History {
        directory: String,
        #[arg(long)]
        json: bool,
        /// Print the full stored snapshots, grids included.
        #[arg(long, requires = "json")]
        grids: bool,
    },
    /// Import a legacy historical_data.json into the history store.
    Migrate { directory: String },
    /// List the members of a save archive with content digests.
    Members { file: PathBuf },
    /// Re-process a directory whenever its saves change.
    Watch {
        directory: String,
        #[arg(long)]
        all: bool,
        /// Refresh interval in seconds when nothing changes.
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show { directory: String },
    Set {
        directory: String,
        #[command(flatten)]
        values: SettingValues,
    },
}

/// New values, accepted as text and coerced to whole days.
#[derive(Args, Debug, Default)]
struct SettingValues {
    #[arg(long)]
    temperate_min: Option<String>,
    #[arg(long)]
    temperate_max: Option<String>,
    #[arg(long)]
    drought_min: Option<String>,
    #[arg(long)]
    drought_max: Option<String>,
    #[arg(long)]
    badtide_min: Option<String>,
    #[arg(long)]
    badtide_max: Option<String>,
}

impl SettingValues {
    fn into_update(self) -> SettingsUpdate {
        let mut update = SettingsUpdate::new();
        let pairs = [
            (SettingName::TemperateMin, self.temperate_min),
            (SettingName::TemperateMax, self.temperate_max),
            (SettingName::DroughtMin, self.drought_min),
            (SettingName::DroughtMax, self.drought_max),
            (SettingName::BadtideMin, self.badtide_min),
            (SettingName::BadtideMax, self.badtide_max),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                update.set(name, value);
            }
        }
        update
    }
}

fn scope(all: bool) -> IngestScope {
    if all {
        IngestScope::All
    } else {
        IngestScope::Latest
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (config, source) = load_inspector_config_from_env();
    if let Some(path) = source {
        info!(path = %path.display(), "Using inspector config");
    }
    let inspector = SaveInspector::new(config);

    match cli.command {
        Command::Load {
            directory,
            all,
            json,
            grids,
        } => {
            let output = commands::Output::new(json, grids);
            commands::load(&inspector, &sanitize_directory(&directory), scope(all), output)
        }
        Command::Settings(SettingsCommand::Show { directory }) => {
            commands::show_settings(&inspector, &sanitize_directory(&directory))
        }
        Command::Settings(SettingsCommand::Set { directory, values }) => commands::set_settings(
            &inspector,
            &sanitize_directory(&directory),
            &values.into_update(),
        ),
        Command::History {
            directory,
            json,
            grids,
        } => commands::history(
            &inspector,
            &sanitize_directory(&directory),
            commands::Output::new(json, grids),
        ),
        Command::Migrate { directory } => {
            commands::migrate(&inspector, &sanitize_directory(&directory))
        }
        Command::Members { file } => commands::members(&inspector, &file),
        Command::Watch {
            directory,
            all,
            interval,
        } => commands::watch(
            &inspector,
            &sanitize_directory(&directory),
            scope(all),
            interval.map(Duration::from_secs),
        ),
    }
}
