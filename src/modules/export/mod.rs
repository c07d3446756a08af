//! JSON Export
//!
//! Renders the decoded catalog as JSON for `list --json`.

use anyhow::Result;
use serde::Serialize;

use crate::domain::market::Record;

/// Exportable record (addresses and amounts as strings)
#[derive(Serialize)]
struct ExportableRecord {
    index: u64,
    owner: String,
    title: String,
    author: String,
    image: String,
    /// Smallest-unit price, unmodified
    price: String,
    sold: u64,
    read: bool,
}

impl ExportableRecord {
    fn new(index: u64, record: &Record) -> Self {
        Self {
            index,
            owner: format!("{:?}", record.owner),
            title: record.title.clone(),
            author: record.author.clone(),
            image: record.image_url.clone(),
            price: record.price.to_string(),
            sold: record.sold,
            read: record.read,
        }
    }
}

/// Render loaded records as pretty-printed JSON
pub fn render_json<'a>(records: impl Iterator<Item = (u64, &'a Record)>) -> Result<String> {
    let exportable: Vec<ExportableRecord> = records
        .map(|(index, record)| ExportableRecord::new(index, record))
        .collect();
    Ok(serde_json::to_string_pretty(&exportable)?)
}
