use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use snafu::ResultExt;
use tracing_subscriber::EnvFilter;

mod app;
mod command;
mod error;
mod settings;
mod view;

use app::DashboardApp;
use error::{AppResult, SettingsSnafu};
use settings::Settings;

#[derive(Parser)]
#[command(name = "cointel")]
#[command(about = "Fieldtech Co-Intelligence terminal dashboard", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/cointel/settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Files to upload before the prompt opens
    #[arg(long, num_args = 1..)]
    upload: Vec<PathBuf>,

    /// Write the rendered transcript to this HTML file on exit
    #[arg(long)]
    export_html: Option<PathBuf>,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config_path = cli.config.unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load(&config_path);

    if cli.init_config {
        return settings.save(&config_path).context(SettingsSnafu {
            stage: "init-settings-file",
        });
    }

    tracing::info!(
        upload_url = %settings.upload_url,
        chat_url = %settings.chat_url,
        "starting dashboard"
    );
    let mut app = DashboardApp::new(&settings, std::io::stdout());
    app.upload(cli.upload);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = app.run(stdin).await;
    tracing::info!(
        turns = app.session().transcript().len(),
        documents = app.session().accepted_files().len(),
        "dashboard closed"
    );

    if let Some(path) = cli.export_html {
        app.export_html(&path).await?;
    }
    outcome
}
