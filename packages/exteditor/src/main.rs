use anyhow::{Context, Result};
use clap::Parser;
use edit_session::{Host, SessionRegistry, TempStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod logging;
mod paths;

use crate::config::{FileConfig, default_config_path, load_config};
use crate::paths::TempEnv;

#[derive(Parser)]
#[command(name = "exteditor-host")]
#[command(about = "Edit browser text fields in an external editor over native messaging")]
struct Cli {
    /// Config file (defaults to <config dir>/exteditor/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    debug: bool,

    /// Arguments the browser passes to native-messaging hosts
    /// (manifest path, extension id or origin). Logged, never interpreted.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    launcher_args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let file_config: FileConfig = load_config(config_path.as_deref())
        .extract()
        .context("failed to load configuration")?;

    logging::init(&file_config.log, cli.debug)?;
    info!(launcher_args = ?cli.launcher_args, "starting external editor host");

    let app_root = paths::app_root(&file_config.temp, &TempEnv::current());
    let store = TempStore::open(&app_root, Arc::new(SessionRegistry::new()))
        .with_context(|| format!("failed to prepare temp directory under {}", app_root.display()))?;
    let store = Arc::new(store);
    info!(dir = %store.dir().display(), "session files go here");

    let host = Host::new(store.clone(), file_config.protocol.host_config());
    let report = host
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await;
    drop(host);

    // Every session has finished, so this is the last handle.
    match Arc::try_unwrap(store) {
        Ok(store) => {
            if let Err(e) = store.close() {
                warn!("failed to remove temp directory: {}", e);
            }
        }
        Err(_) => warn!("temp store still shared at exit; leaving it to drop"),
    }

    info!(exit_code = report.exit_code(), "exiting");
    std::process::exit(report.exit_code());
}
