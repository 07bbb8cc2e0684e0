//! CLI command: `attrfilter filter`
//!
//! Builds a handler from an initial filter, stages a selection, commits it
//! and prints the effective filter as JSON.

use super::{ensure_initialized, handler_config, open};
use crate::settings::AppConfig;
use anyhow::Result;
use attrfilter_core::{
    AttributeElementSelection, AttributeFilterHandler, MultiSelectAttributeFilterHandler,
    SingleSelectAttributeFilterHandler,
};
use attrfilter_model::{
    AttributeElement, AttributeElements, AttributeFilter, ElementKeyKind, ObjRef,
};
use tracing::info;

/// Arguments of the filter subcommand.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub initial: Vec<String>,
    pub negative: bool,
    pub by_value: bool,
    pub select: Vec<String>,
    pub invert: bool,
    pub single: bool,
}

impl FilterArgs {
    fn initial_filter(&self, display_form: ObjRef) -> AttributeFilter {
        let kind = if self.by_value {
            ElementKeyKind::Value
        } else {
            ElementKeyKind::Uri
        };
        let elements = AttributeElements::from_keys(kind, self.initial.clone());
        if self.negative {
            AttributeFilter::negative(display_form, elements)
        } else {
            AttributeFilter::positive(display_form, elements)
        }
    }
}

/// Run the filter subcommand.
pub async fn run(config: &AppConfig, args: FilterArgs) -> Result<()> {
    let (backend, display_form) = open(config)?;
    let filter = args.initial_filter(display_form);
    let setup = handler_config(config, backend, filter);

    let (committed, selected) = if args.single {
        let handler = SingleSelectAttributeFilterHandler::new(setup)?;
        ensure_initialized(&handler).await?;
        if let Some(key) = args.select.first() {
            handler.change_selection(Some(key.clone()), None);
        }
        handler.commit_selection(None);
        let selected: Vec<_> = handler.get_selected_item().into_iter().map(Some).collect();
        (handler.get_filter(), selected)
    } else {
        let handler = MultiSelectAttributeFilterHandler::new(setup)?;
        ensure_initialized(&handler).await?;
        if !args.select.is_empty() {
            let current = handler.get_working_selection();
            handler.change_selection(
                AttributeElementSelection::new(args.select.clone(), current.is_inverted),
                None,
            );
        }
        if args.invert {
            handler.invert_selection(None);
        }
        if handler.is_working_selection_changed() {
            info!("Committing changed selection");
        }
        handler.commit_selection(None);
        (handler.get_filter(), handler.get_selected_items().elements)
    };

    print_selection(&committed, &selected);
    println!("{}", serde_json::to_string_pretty(&committed)?);
    Ok(())
}

fn print_selection(filter: &AttributeFilter, selected: &[Option<AttributeElement>]) {
    let mode = if filter.is_select_all() {
        "all"
    } else if filter.is_negative() {
        "all except"
    } else {
        "only"
    };
    println!();
    println!("  Selection: {}", mode);
    for (key, element) in filter.elements().keys().iter().zip(selected) {
        let title = element
            .as_ref()
            .map(|el| el.title.as_deref().unwrap_or("(empty value)"))
            .unwrap_or("(not loaded)");
        println!("    {:<24} {}", title, key);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_filter_from_args() {
        let args = FilterArgs {
            initial: vec!["Prague".into(), "Brno".into()],
            negative: true,
            by_value: true,
            ..FilterArgs::default()
        };
        let filter = args.initial_filter(ObjRef::identifier("label.city.name"));
        assert!(filter.is_negative());
        assert_eq!(
            filter.elements(),
            &AttributeElements::Values(vec!["Prague".into(), "Brno".into()])
        );

        let filter = FilterArgs::default().initial_filter(ObjRef::identifier("label.city.name"));
        assert!(filter.is_positive());
        assert!(filter.elements().is_by_ref());
        assert!(filter.elements().is_empty());
    }
}
