//! CLI module for Attrfilter
//!
//! Provides commands driving an attribute filter handler:
//! - `elements`: page through elements with search and sort order
//! - `filter`: stage a selection, commit it and print the resulting filter
//! - `info`: display form metadata and element counts
//! - `config`: print the resolved configuration

use crate::settings::{loader::load_config, AppConfig};
use anyhow::{bail, Result};
use attrfilter_backend::AnalyticalBackend;
use attrfilter_core::{AttributeFilterHandler, AttributeFilterHandlerConfig, LoadableStatus};
use attrfilter_model::{AttributeFilter, ObjRef};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

pub mod elements;
pub mod filter;
pub mod info;

/// Attribute filter handler demo
#[derive(Parser, Debug)]
#[command(name = "attrfilter")]
#[command(about = "Drive an attribute filter handler over a fixture backend")]
#[command(version)]
pub struct Cli {
    /// Override the display form from the configuration
    #[arg(long, global = true)]
    pub display_form: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List elements of the display form
    Elements {
        /// Case-insensitive title search
        #[arg(short, long)]
        search: Option<String>,
        /// Number of elements to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Page size; the configured default when omitted
        #[arg(short, long)]
        limit: Option<u32>,
        /// Sort titles in descending order
        #[arg(long)]
        desc: bool,
    },
    /// Stage and commit a selection, then print the filter
    Filter {
        /// Keys selected by the initial filter
        #[arg(long = "initial")]
        initial: Vec<String>,
        /// Start from a negative filter (the initial keys are excluded)
        #[arg(long)]
        negative: bool,
        /// Keys are element titles instead of uris
        #[arg(long)]
        by_value: bool,
        /// Keys to select in the working selection
        #[arg(long = "select")]
        select: Vec<String>,
        /// Invert the working selection before committing
        #[arg(long)]
        invert: bool,
        /// Use the single-select handler
        #[arg(long)]
        single: bool,
    },
    /// Show display form metadata and element counts
    Info,
    /// Print the resolved configuration
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config()?;
    if let Some(display_form) = cli.display_form {
        config.display_form = display_form;
    }

    match cli.command {
        Some(Commands::Elements {
            search,
            offset,
            limit,
            desc,
        }) => elements::run(&config, search, offset, limit, desc).await,
        Some(Commands::Filter {
            initial,
            negative,
            by_value,
            select,
            invert,
            single,
        }) => {
            let args = filter::FilterArgs {
                initial,
                negative,
                by_value,
                select,
                invert,
                single,
            };
            filter::run(&config, args).await
        }
        Some(Commands::Info) => info::run(&config).await,
        Some(Commands::Config) => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Backend and display form resolved from the configuration.
pub(crate) fn open(config: &AppConfig) -> Result<(Arc<dyn AnalyticalBackend>, ObjRef)> {
    let display_form = config.display_form_ref()?;
    let backend = config.open_backend()?;
    info!(
        workspace = %config.workspace,
        fixture = %config.fixture.display(),
        display_form = %display_form,
        "Opened fixture backend"
    );
    Ok((Arc::new(backend), display_form))
}

/// Handler config for `filter` with the configured settings.
pub(crate) fn handler_config(
    config: &AppConfig,
    backend: Arc<dyn AnalyticalBackend>,
    filter: AttributeFilter,
) -> AttributeFilterHandlerConfig {
    AttributeFilterHandlerConfig::new(backend, config.workspace.clone(), filter)
        .with_settings(config.handler.clone())
}

/// Wait for the init loads and fail on the first error they reported.
pub(crate) async fn ensure_initialized<H: AttributeFilterHandler>(handler: &H) -> Result<()> {
    handler.wait_for_init().await;
    if handler.get_init_status() == LoadableStatus::Error {
        if let Some(err) = handler.get_current_error() {
            bail!("Filter initialization failed: {}", err);
        }
        bail!("Filter initialization failed");
    }
    Ok(())
}
