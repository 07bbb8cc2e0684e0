//! CLI command: `attrfilter elements`
//!
//! Pages through the elements of the configured display form.

use super::{ensure_initialized, handler_config, open};
use crate::settings::AppConfig;
use anyhow::{Context, Result};
use attrfilter_core::{AttributeFilterHandler, LoadableStatus, MultiSelectAttributeFilterHandler};
use attrfilter_model::{AttributeFilter, ElementKeyKind, SortDirection};

/// Run the elements subcommand.
pub async fn run(
    config: &AppConfig,
    search: Option<String>,
    offset: u32,
    limit: Option<u32>,
    desc: bool,
) -> Result<()> {
    let (backend, display_form) = open(config)?;
    let filter = AttributeFilter::select_all(display_form, ElementKeyKind::Uri);
    let handler = MultiSelectAttributeFilterHandler::new(handler_config(config, backend, filter))?;
    ensure_initialized(&handler).await?;

    if let Some(search) = &search {
        handler.set_search(search);
    }
    if desc {
        handler.set_order(SortDirection::Desc);
    }
    let limit = limit.unwrap_or(config.handler.default_page_size);
    handler
        .load_elements_range(offset, limit, None)?
        .await
        .context("Elements load task failed")?;

    if handler.get_loading_status() == LoadableStatus::Error {
        if let Some(err) = handler.get_current_error() {
            anyhow::bail!("Failed to load elements: {}", err);
        }
    }

    let title = handler
        .get_display_form_info()
        .result()
        .map(|df| df.title.clone())
        .unwrap_or_default();
    let items = handler.get_all_items();

    println!();
    println!("  {}", title);
    println!("  {}", "-".repeat(60));
    if items.is_empty() {
        println!("  (no elements)");
    }
    for (index, element) in items.iter().enumerate() {
        println!(
            "  {:>4}  {:<24} {}",
            offset as usize + index + 1,
            element.title.as_deref().unwrap_or("(empty value)"),
            element.uri
        );
    }
    println!("  {}", "-".repeat(60));
    println!(
        "  Showing {} of {} matching, {} in total",
        items.len(),
        format_count(handler.get_count_with_current_settings()),
        format_count(handler.get_total_count())
    );
    if !handler.get_search().is_empty() {
        println!("  Search: \"{}\"", handler.get_search());
    }
    println!();
    Ok(())
}

fn format_count(count: Option<u64>) -> String {
    count.map_or_else(|| "?".to_string(), |c| c.to_string())
}
