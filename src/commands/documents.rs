//! Document inspection and removal commands.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use pstore_core::config::StoreConfig;
use pstore_core::error::StoreError;
use pstore_core::traits::StorageBackend;
use pstore_core::types::{Criteria, PageRequest, PagerList, SelectQuery, SortField, StoredDocument};
use pstore_database::UnitOfWork;

/// Widest data column shown in table output
const DATA_PREVIEW_WIDTH: usize = 72;

/// Arguments for the count command
#[derive(Debug, Args)]
pub struct CountArgs {
    /// Collection name
    pub collection: String,
    /// Criteria as JSON, e.g. '{"field":{"field":"age","op":"gte","value":18}}'
    #[arg(long)]
    pub filter: Option<String>,
}

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Collection name
    pub collection: String,
    /// Criteria as JSON
    #[arg(long)]
    pub filter: Option<String>,
    /// Sort key as field[:asc|desc]; repeat for secondary keys
    #[arg(long)]
    pub sort: Vec<SortField>,
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: u64,
    /// Page size (defaults to paging.default_page_size)
    #[arg(long)]
    pub page_size: Option<u64>,
}

/// Arguments for the show command
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Collection name
    pub collection: String,
    /// Document id
    pub id: String,
}

/// Arguments for the remove command
#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Collection name
    pub collection: String,
    /// Document ids
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// Skip confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Document display row for table output
#[derive(Debug, Serialize, Tabled)]
struct DocumentRow {
    /// Document id
    id: String,
    /// Document body, shortened
    data: String,
}

impl From<&StoredDocument> for DocumentRow {
    fn from(doc: &StoredDocument) -> Self {
        Self {
            id: doc.key.clone(),
            data: output::truncate(&doc.data.to_string(), DATA_PREVIEW_WIDTH),
        }
    }
}

#[derive(Debug, Serialize)]
struct CountReport<'a> {
    collection: &'a str,
    count: u64,
}

/// Parse and check a criteria JSON argument. No filter matches everything.
fn parse_filter(filter: Option<&str>) -> Result<Criteria, StoreError> {
    let criteria = match filter {
        Some(raw) => serde_json::from_str::<Criteria>(raw)
            .map_err(|e| StoreError::validation(format!("Invalid filter: {e}")))?,
        None => Criteria::All,
    };
    criteria.validate()?;
    Ok(criteria)
}

/// Count matching documents
pub async fn count(
    args: &CountArgs,
    config: &StoreConfig,
    format: OutputFormat,
) -> Result<(), StoreError> {
    let criteria = parse_filter(args.filter.as_deref())?;
    let backend = super::backend(config).await?;
    let count = backend.count(&args.collection, &criteria).await?;

    match format {
        OutputFormat::Json => output::print_json(&CountReport {
            collection: &args.collection,
            count,
        }),
        OutputFormat::Table => println!("{count}"),
    }
    Ok(())
}

/// Print one page of documents plus totals
pub async fn list(
    args: &ListArgs,
    config: &StoreConfig,
    format: OutputFormat,
) -> Result<(), StoreError> {
    let criteria = parse_filter(args.filter.as_deref())?;
    let page = PageRequest::new(
        args.page,
        args.page_size.unwrap_or(config.paging.default_page_size),
    );
    page.validate(&config.paging)?;

    let select = SelectQuery {
        criteria,
        sort: args.sort.clone(),
        offset: page.offset(),
        limit: Some(page.limit()),
    };

    let backend = super::backend(config).await?;
    let docs = backend.fetch(&args.collection, &select).await?;
    let total = backend.count(&args.collection, &select.criteria).await?;
    let result = PagerList::new(docs, &page, total);

    match format {
        OutputFormat::Json => output::print_json(&result),
        OutputFormat::Table => {
            let rows: Vec<DocumentRow> = result.items.iter().map(DocumentRow::from).collect();
            output::print_list(&rows, format);
            println!(
                "Page {}/{} ({} documents)",
                result.page, result.total_pages, result.total_items
            );
        }
    }
    Ok(())
}

/// Print a single document
pub async fn show(
    args: &ShowArgs,
    config: &StoreConfig,
    format: OutputFormat,
) -> Result<(), StoreError> {
    let backend = super::backend(config).await?;
    let doc = backend
        .fetch_by_keys(&args.collection, std::slice::from_ref(&args.id))
        .await?
        .pop()
        .ok_or_else(|| StoreError::not_found(format!("{} {} not found", args.collection, args.id)))?;

    match format {
        OutputFormat::Json => output::print_json(&doc),
        OutputFormat::Table => {
            output::print_kv("Collection", &args.collection);
            output::print_kv("Id", &doc.key);
            output::print_json(&doc.data);
        }
    }
    Ok(())
}

/// Remove documents by id in a single commit
pub async fn remove(args: &RemoveArgs, config: &StoreConfig) -> Result<(), StoreError> {
    let backend = super::backend(config).await?;
    let uow = UnitOfWork::with_paging(Arc::new(backend), config.paging);
    let staged = uow.remove_documents(&args.collection, &args.ids).await?;

    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Remove {staged} document(s) from '{}'?",
                args.collection
            ))
            .default(false)
            .interact()
            .map_err(|e| StoreError::internal(format!("Input error: {e}")))?;

        if !confirm {
            uow.discard()?;
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = uow.commit().await?;
    output::print_success(&format!(
        "Removed {removed} document(s) from '{}'.",
        args.collection
    ));
    Ok(())
}
