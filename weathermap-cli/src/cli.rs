use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode};
use tracing::{info, warn};
use weathermap_core::{
    CallbackServer, Config, Nominatim, PatchOptions, StdoutSink, WeatherLookup, browser, map,
    patch, provider_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathermap", version, about = "Click a map, get the weather")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and callback port.
    Configure,

    /// Open the map and print weather for every clicked point until Quit.
    Run(RunArgs),

    /// Patch an existing map document in place.
    Patch {
        /// Path of the generated map document.
        file: PathBuf,

        /// Port the injected buttons post to; defaults to the configured port.
        #[arg(long)]
        port: Option<u16>,

        /// Stylesheet href to link; defaults to the configured stylesheet.
        #[arg(long)]
        stylesheet: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Port for the local callback server.
    #[arg(long)]
    port: Option<u16>,

    /// Where to write the map document.
    #[arg(long)]
    map_file: Option<PathBuf>,

    /// Where to save the clicked coordinates on exit.
    #[arg(long)]
    coords_file: Option<PathBuf>,

    /// Do not launch a browser; post to the server some other way.
    #[arg(long)]
    no_browser: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(map_file) = &self.map_file {
            config.map_file = map_file.clone();
        }
        if let Some(coords_file) = &self.coords_file {
            config.coords_file = coords_file.clone();
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Run(args) => run_session(args).await,
            Command::Patch { file, port, stylesheet } => {
                let config = Config::load()?;
                let defaults = config.patch_options();
                let options = PatchOptions {
                    port: port.unwrap_or(defaults.port),
                    stylesheet: stylesheet.unwrap_or(defaults.stylesheet),
                };
                patch::patch_file(&file, &options)
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let port = CustomType::<u16>::new("Callback server port:")
        .with_default(config.port)
        .with_error_message("Please enter a port number (0-65535)")
        .prompt()
        .context("Failed to read port")?;

    config.set_api_key(api_key.trim().to_string());
    config.port = port;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn run_session(args: RunArgs) -> Result<()> {
    let mut config = Config::load()?;
    args.apply(&mut config);

    let provider = provider_from_config(&config)?;
    let geocoder = Nominatim::from_config(&config)?;

    let map_path = config.map_path()?;
    map::write_map(&map_path, config.startup_center(), config.startup_zoom)?;
    patch::patch_file(&map_path, &config.patch_options())?;

    if args.no_browser {
        info!(path = %map_path.display(), "browser launch skipped");
    } else if let Err(err) = browser::open(&map_path) {
        warn!("Browser failed to open/find the map: {err:#}");
    }

    let lookup = WeatherLookup::new(Box::new(geocoder), provider);
    let server =
        CallbackServer::bind(("localhost", config.port), lookup, Arc::new(StdoutSink)).await?;
    let log = server.run().await?;

    let coords_path = config.coords_path()?;
    log.save(&coords_path)?;
    info!(clicks = log.len(), path = %coords_path.display(), "coordinates saved");

    Ok(())
}
