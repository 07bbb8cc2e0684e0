//! CLI command: `attrfilter info`

use super::{ensure_initialized, handler_config, open};
use crate::settings::AppConfig;
use anyhow::Result;
use attrfilter_core::{AttributeFilterHandler, MultiSelectAttributeFilterHandler};
use attrfilter_model::{AttributeFilter, ElementKeyKind};

/// Run the info subcommand.
pub async fn run(config: &AppConfig) -> Result<()> {
    let (backend, display_form) = open(config)?;
    let filter = AttributeFilter::select_all(display_form, ElementKeyKind::Uri);
    let handler = MultiSelectAttributeFilterHandler::new(handler_config(config, backend, filter))?;
    ensure_initialized(&handler).await?;

    let info = handler.get_display_form_info();
    let Some(metadata) = info.result() else {
        anyhow::bail!("Display form metadata is not available ({})", info.status());
    };

    println!();
    println!("  Display form   {}", metadata.title);
    println!("  Identifier     {}", metadata.id);
    println!("  Uri            {}", metadata.uri);
    println!("  Attribute      {}", metadata.attribute);
    println!("  Workspace      {}", config.workspace);
    match handler.get_total_count() {
        Some(count) => println!("  Elements       {}", count),
        None => println!("  Elements       unknown"),
    }
    println!();
    Ok(())
}
