//! Command handlers

use anyhow::{anyhow, bail, Context as _, Result};
use rv_core::catalog::builder::group_by_table;
use rv_core::{Condition, Direction, FilterItem, Logic, NewReport, QuickFilter, TableSelection};
use rv_data::adapter::columns_for;
use rv_data::{FilterEditor, ReportView, SchemaDetector, TableRead};
use rv_views::export::{file_stem, ExportError};
use rv_views::tables::pager_line;
use rv_views::{export_rows, render_page, ExportFormat, TableConfig};
use tracing::warn;

use crate::{Context, PageArgs};

/// Rows sampled per table when detecting column types
const DETECT_SAMPLE: usize = 100;

pub fn list(ctx: &Context) -> Result<()> {
    for category in ctx.state.catalog.list_categories() {
        println!("{}", category.title);
        for report in &category.reports {
            if report.description.is_empty() {
                println!("  {:<28} {}", report.id, report.title);
            } else {
                println!("  {:<28} {} - {}", report.id, report.title, report.description);
            }
        }
    }
    Ok(())
}

pub fn schema(ctx: &Context, report_id: &str) -> Result<()> {
    let catalog = &ctx.state.catalog;
    let report = catalog
        .get_report(report_id)
        .ok_or_else(|| anyhow!("Report not found: {}", report_id))?;

    println!("{} ({})", report.title, report.id);
    if let Some(mapping) = ctx.state.preferences.get_table_mapping(report_id) {
        println!("Tables: {}", mapping.to_list());
    }

    let selected = ctx.state.preferences.get_fields(report_id);
    for field in catalog.resolved_schema(report_id, &selected) {
        let mut line = format!("  {:<24} {:<20} {:?}", field.field, field.label, field.field_type);
        if !field.format.is_empty() {
            line.push_str(&format!("  [{}]", field.format));
        }
        if field.required {
            line.push_str("  required");
        }
        println!("{}", line);
    }
    Ok(())
}

/// Open a view with the paging options applied and load the requested page
async fn load_page(ctx: &Context, report_id: &str, args: &PageArgs) -> Result<ReportView> {
    if ctx.state.catalog.get_report(report_id).is_none() {
        bail!("Report not found: {}", report_id);
    }

    let mut view = ReportView::open(report_id, ctx.adapter.clone(), &ctx.state.settings.view);
    if let Some(size) = args.page_size {
        view.set_page_size(size);
    }
    if let Some(key) = &args.sort {
        // A new key starts ascending, the current one flips
        view.toggle_sort(key);
        if view.sort().direction == Direction::Desc {
            view.toggle_sort(key);
        }
        if args.desc {
            view.toggle_sort(key);
        }
    }
    view.set_quick_filter(QuickFilter {
        start_date: args.start,
        end_date: args.end,
        location: args.location.clone(),
        status: args.status.clone(),
        search: args.search.clone(),
    });

    view.refresh().await;
    if args.page > 1 && view.error().is_none() {
        view.set_page(args.page);
        view.refresh().await;
    }

    if let Some(error) = view.error() {
        bail!("{}", error);
    }
    Ok(view)
}

pub async fn run(ctx: &Context, report_id: &str, args: &PageArgs) -> Result<()> {
    let view = load_page(ctx, report_id, args).await?;

    if view.rows().is_empty() {
        println!("No data");
        return Ok(());
    }

    let first_row = (view.page() - 1) * view.page_size() + 1;
    let table = render_page(&view.columns(), view.rows(), first_row, &TableConfig::default())?;
    println!("{}", table);
    println!("{}", pager_line(view.page(), view.page_count(), view.total()));
    Ok(())
}

pub async fn export(ctx: &Context, report_id: &str, format: ExportFormat, args: &PageArgs) -> Result<()> {
    let view = load_page(ctx, report_id, args).await?;
    let dir = &ctx.state.settings.export.output_dir;

    match export_rows(format, view.rows(), &file_stem(report_id), dir) {
        Ok(path) => {
            println!("Exported {} rows to {}", view.rows().len(), path.display());
            Ok(())
        }
        Err(ExportError::NothingToExport) => {
            println!("Nothing to export");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn customize(ctx: &Context, report_id: &str, columns: Option<Vec<String>>) -> Result<()> {
    if ctx.state.catalog.get_report(report_id).is_none() {
        bail!("Report not found: {}", report_id);
    }
    let preferences = &ctx.state.preferences;

    if let Some(columns) = columns {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let grouped = group_by_table(&columns);
        if grouped.is_empty() {
            preferences.set_fields(report_id, &columns)?;
        } else {
            let tables: Vec<&str> = grouped.keys().map(String::as_str).collect();
            preferences.set_fields_with_tables(report_id, &columns, Some(&tables.join(",")))?;
        }
        println!("Saved {} columns for {}", columns.len(), report_id);
        return Ok(());
    }

    let selected = preferences.get_fields(report_id);
    if selected.is_empty() {
        println!("No columns selected; the default columns are shown");
    }

    let store = match ctx.adapter.remote() {
        Some(store) => store,
        None => {
            for key in &selected {
                println!("  [x] {}", key);
            }
            return Ok(());
        }
    };

    let grouped = group_by_table(&selected);
    for table in store.tables().await? {
        let available = store.columns(&table).await?;
        let picked = grouped.get(&table).cloned().unwrap_or_default();
        println!("{}", table);

        let detected = if picked.is_empty() {
            Vec::new()
        } else {
            let mut request = TableRead::new(table.as_str());
            request.columns = columns_for(&table, &selected);
            request.limit = Some(DETECT_SAMPLE);
            match store.read(request).await {
                Ok(result) => {
                    let keys: Vec<String> = picked.iter().map(|c| format!("{}.{}", table, c)).collect();
                    SchemaDetector::new().detect(&keys, &result.rows)
                }
                Err(e) => {
                    warn!(table = %table, error = %e, "type detection skipped");
                    Vec::new()
                }
            }
        };

        for column in &available {
            let mark = if picked.contains(column) { "x" } else { " " };
            let kind = detected
                .iter()
                .find(|d| d.field.column_name() == column)
                .map(|d| format!("  {:?}", d.field.field_type))
                .unwrap_or_default();
            println!("  [{}] {}{}", mark, column, kind);
        }
    }
    Ok(())
}

/// Parse `table:col1,col2` (or `table:*`) against the store's columns
fn table_selection(arg: &str, available: Vec<String>) -> Result<TableSelection> {
    let (table, columns) = arg
        .split_once(':')
        .ok_or_else(|| anyhow!("expected table:columns, got '{}'", arg))?;
    let mut selection = TableSelection::new(table.trim(), available);

    for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if column == "*" {
            selection.select_all();
        } else if selection.columns.iter().any(|c| c == column) {
            if !selection.selected_columns.iter().any(|c| c == column) {
                selection.toggle(column);
            }
        } else {
            bail!("table '{}' has no column '{}'", selection.table_name, column);
        }
    }
    Ok(selection)
}

pub async fn create(
    ctx: &Context,
    name: String,
    description: String,
    category: String,
    table_args: &[String],
) -> Result<()> {
    let store = ctx
        .adapter
        .remote()
        .context("creating a report needs a remote database (--remote)")?;

    let mut tables = Vec::with_capacity(table_args.len());
    for arg in table_args {
        let table = arg.split_once(':').map(|(t, _)| t.trim()).unwrap_or(arg);
        let available = store.columns(table).await?;
        if available.is_empty() {
            bail!("no such table: {}", table);
        }
        tables.push(table_selection(arg, available)?);
    }

    let report = ctx.state.catalog.create_report(NewReport {
        name,
        description,
        category,
        tables,
    })?;
    println!("Created report {} ({})", report.title, report.id);
    Ok(())
}

pub fn delete(ctx: &Context, report_id: &str) -> Result<()> {
    if ctx.state.catalog.delete_report(report_id)? {
        println!("Deleted {}", report_id);
    } else {
        println!("No custom report named {}", report_id);
    }
    Ok(())
}

/// Parse `field:condition:value`; the value may itself contain `:`
fn parse_item(arg: &str) -> Result<FilterItem> {
    let mut parts = arg.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(condition), Some(value)) if !field.is_empty() => {
            let condition: Condition = condition.parse()?;
            Ok(FilterItem::new(field, condition, value))
        }
        _ => bail!("expected field:condition:value, got '{}'", arg),
    }
}

pub fn filter(
    ctx: &Context,
    report_id: &str,
    logic: Option<Logic>,
    items: &[String],
    clear: bool,
) -> Result<()> {
    let mut editor = FilterEditor::open(report_id, ctx.state.preferences.clone());

    if !clear && items.is_empty() && logic.is_none() {
        let fields: Vec<&str> = editor.field_options().iter().map(|o| o.value.as_str()).collect();
        println!("Fields: {}", if fields.is_empty() { "(none)".to_string() } else { fields.join(", ") });
        println!("Logic: {:?}", editor.logic());
        for item in editor.items().iter().filter(|i| i.is_active()) {
            println!("  {} {} {}", item.field, item.condition.label(), item.value);
        }
        return Ok(());
    }

    if clear || !items.is_empty() {
        while editor.remove_item(0).is_some() {}
    }
    for arg in items {
        let parsed = parse_item(arg)?;
        if !editor.field_options().iter().any(|o| o.value == parsed.field) {
            bail!("'{}' is not a selected column of {}", parsed.field, report_id);
        }
        editor.add_item();
        let last = editor.items().len() - 1;
        editor.update_item(last, |item| *item = parsed);
    }
    if let Some(logic) = logic {
        editor.set_logic(logic);
    }

    let saved = editor.apply()?;
    println!("Saved {} filter items for {}", saved.active_items().count(), report_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        let item = parse_item("hireDate:gt:2020-01-01").unwrap();
        assert_eq!(item, FilterItem::new("hireDate", Condition::Gt, "2020-01-01"));

        let item = parse_item("clockIn:eq:9:00 AM").unwrap();
        assert_eq!(item.value, "9:00 AM");

        assert!(parse_item("years:between:1").is_err());
        assert!(parse_item("years").is_err());
    }

    #[test]
    fn test_table_selection() {
        let available = vec!["id".to_string(), "first_name".to_string(), "salary".to_string()];

        let selection = table_selection("employees:salary,first_name", available.clone()).unwrap();
        assert_eq!(selection.selected_columns, vec!["salary", "first_name"]);

        let selection = table_selection("employees:*", available.clone()).unwrap();
        assert_eq!(selection.selected_columns.len(), 3);

        assert!(table_selection("employees:bonus", available.clone()).is_err());
        assert!(table_selection("employees", available).is_err());
    }
}
