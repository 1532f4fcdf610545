//! PDF generation through a Google Docs template.
//!
//! The template document carries `{{PLACEHOLDER}}` markers. Exporting copies
//! the template, replaces every marker, exports the copy as PDF and finally
//! removes the copy again. With [`PriceTableLayout::Grid`] the price table
//! becomes a native Docs table instead of a text block.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{DocsConfig, PriceTableLayout};
use crate::model::quotation::Quotation;
use crate::util::price_table::PriceTable;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF generation is not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{step} request failed with status {status}: {body}")]
    Upstream { step: &'static str, status: u16, body: String },
    #[error("Unexpected document layout: {0}")]
    Layout(String),
}

const PRICE_TABLE: &str = "{{PRICE_TABLE}}";

/// Name of the downloaded file, `Quotation-<id>-<clientName>.pdf`.
pub fn pdf_file_name(quote_id: &str, client_name: &str) -> String {
    format!("Quotation-{}-{}.pdf", quote_id, client_name)
}

/// Values spliced into the template, keyed by placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotationDocument {
    pub quote_id: String,
    pub client_name: String,
    pub quote_number: String,
    pub currency: String,
    pub valid_until: String,
    pub status: String,
    pub date: String,
    pub price_table: String,
    /// Row-major cells of the same table, for the grid layout.
    pub price_cells: Vec<String>,
    pub price_columns: usize,
}

impl QuotationDocument {
    pub fn from_quotation(quotation: &Quotation, date: &str) -> Self {
        let table = PriceTable::from_parts(&quotation.parts);
        QuotationDocument {
            quote_id: quotation.quote_id.clone(),
            client_name: quotation.client_name.clone(),
            quote_number: quotation.quote_number.clone(),
            currency: quotation.currency.to_string(),
            valid_until: quotation.valid_until.clone(),
            status: quotation.status.to_string(),
            date: date.to_string(),
            price_table: table.to_text(),
            price_cells: table.cells(),
            price_columns: table.column_count(),
        }
    }

    pub fn placeholders(&self) -> [(&'static str, &str); 8] {
        [
            ("{{QUOTE_ID}}", self.quote_id.as_str()),
            ("{{CLIENT_NAME}}", self.client_name.as_str()),
            ("{{QUOTE_NUMBER}}", self.quote_number.as_str()),
            ("{{CURRENCY}}", self.currency.as_str()),
            ("{{VALID_UNTIL}}", self.valid_until.as_str()),
            ("{{STATUS}}", self.status.as_str()),
            ("{{DATE}}", self.date.as_str()),
            (PRICE_TABLE, self.price_table.as_str()),
        ]
    }

    pub fn file_name(&self) -> String {
        pdf_file_name(&self.quote_id, &self.client_name)
    }

    /// One `replaceAllText` request per placeholder. The grid layout leaves
    /// `{{PRICE_TABLE}}` in place for [`Self::table_insertion_requests`].
    pub fn replace_text_requests(&self, layout: PriceTableLayout) -> Vec<Value> {
        self.placeholders()
            .iter()
            .filter(|(placeholder, _)| layout == PriceTableLayout::Text || *placeholder != PRICE_TABLE)
            .map(|(placeholder, value)| {
                json!({
                    "replaceAllText": {
                        "containsText": { "text": placeholder, "matchCase": true },
                        "replaceText": value,
                    }
                })
            })
            .collect()
    }

    /// Replaces the placeholder text at `range` with an empty table sized to the price grid.
    pub fn table_insertion_requests(&self, (start, end): (u64, u64)) -> Vec<Value> {
        let columns = self.price_columns.max(1);
        let rows = self.price_cells.len().div_ceil(columns);
        vec![
            json!({ "deleteContentRange": { "range": { "startIndex": start, "endIndex": end } } }),
            json!({ "insertTable": { "rows": rows, "columns": columns, "location": { "index": start } } }),
        ]
    }

    /// One `insertText` per cell, highest index first so earlier indices stay valid.
    pub fn cell_text_requests(&self, cell_indices: &[u64]) -> Result<Vec<Value>, DocumentError> {
        if cell_indices.len() != self.price_cells.len() {
            return Err(DocumentError::Layout(format!(
                "expected {} table cells, found {}",
                self.price_cells.len(),
                cell_indices.len()
            )));
        }

        let mut cells: Vec<(u64, &str)> = cell_indices
            .iter()
            .copied()
            .zip(self.price_cells.iter().map(String::as_str))
            .filter(|(_, text)| !text.is_empty())
            .collect();
        cells.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(cells
            .into_iter()
            .map(|(index, text)| json!({ "insertText": { "text": text, "location": { "index": index } } }))
            .collect())
    }
}

/// Turns a quotation document into PDF bytes.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    async fn export_pdf(&self, document: &QuotationDocument) -> Result<Bytes, DocumentError>;
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// The parts of a Docs `documents.get` response needed to locate text and table cells.
#[derive(Debug, Default, Deserialize)]
struct DocsDocument {
    #[serde(default)]
    body: DocsBody,
}

#[derive(Debug, Default, Deserialize)]
struct DocsBody {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuralElement {
    #[serde(default)]
    start_index: u64,
    paragraph: Option<Paragraph>,
    table: Option<DocsTable>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphElement {
    #[serde(default)]
    start_index: u64,
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocsTable {
    #[serde(default)]
    table_rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableRow {
    #[serde(default)]
    table_cells: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

/// Docs indices count UTF-16 code units.
fn utf16_len(text: &str) -> u64 {
    text.encode_utf16().count() as u64
}

impl DocsDocument {
    /// Index range of the first occurrence of `marker` in a body paragraph.
    fn find_text(&self, marker: &str) -> Option<(u64, u64)> {
        self.body
            .content
            .iter()
            .filter_map(|element| element.paragraph.as_ref())
            .flat_map(|paragraph| paragraph.elements.iter())
            .find_map(|element| {
                let run = element.text_run.as_ref()?;
                let offset = run.content.find(marker)?;
                let start = element.start_index + utf16_len(&run.content[..offset]);
                Some((start, start + utf16_len(marker)))
            })
    }

    /// Paragraph start of every cell in the first table at or after `index`, row-major.
    fn table_cell_indices(&self, index: u64) -> Option<Vec<u64>> {
        let table = self
            .body
            .content
            .iter()
            .filter(|element| element.start_index >= index)
            .find_map(|element| element.table.as_ref())?;
        Some(
            table
                .table_rows
                .iter()
                .flat_map(|row| row.table_cells.iter())
                .filter_map(|cell| cell.content.first().map(|element| element.start_index))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct GoogleDocsExporter {
    config: DocsConfig,
    http: Client,
}

impl GoogleDocsExporter {
    pub fn new(config: DocsConfig) -> Result<Self, DocumentError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, http })
    }

    async fn check(response: reqwest::Response, step: &'static str) -> Result<reqwest::Response, DocumentError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(DocumentError::Upstream { step, status, body })
    }

    async fn copy_template(&self, name: &str) -> Result<String, DocumentError> {
        let url = format!("{}/files/{}/copy", self.config.drive_api_url, self.config.template_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let copy: DriveFile = Self::check(response, "copy").await?.json().await?;
        debug!(document_id = %copy.id, "Template copied");
        Ok(copy.id)
    }

    async fn fetch_document(&self, document_id: &str) -> Result<DocsDocument, DocumentError> {
        let url = format!("{}/documents/{}", self.config.docs_api_url, document_id);
        let response = self.http.get(&url).bearer_auth(&self.config.access_token).send().await?;
        Ok(Self::check(response, "get").await?.json().await?)
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<Value>) -> Result<(), DocumentError> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = format!("{}/documents/{}:batchUpdate", self.config.docs_api_url, document_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        Self::check(response, "batchUpdate").await?;
        Ok(())
    }

    async fn fill_placeholders(&self, document_id: &str, document: &QuotationDocument) -> Result<(), DocumentError> {
        let layout = self.config.price_table_layout;
        self.batch_update(document_id, document.replace_text_requests(layout)).await?;
        match layout {
            PriceTableLayout::Text => Ok(()),
            PriceTableLayout::Grid => self.insert_price_grid(document_id, document).await,
        }
    }

    /// Swaps `{{PRICE_TABLE}}` for a native table, then writes the cells into it.
    async fn insert_price_grid(&self, document_id: &str, document: &QuotationDocument) -> Result<(), DocumentError> {
        let Some(range) = self.fetch_document(document_id).await?.find_text(PRICE_TABLE) else {
            warn!(document_id, "Template has no {} placeholder, skipping price table", PRICE_TABLE);
            return Ok(());
        };
        self.batch_update(document_id, document.table_insertion_requests(range)).await?;

        let cell_indices = self
            .fetch_document(document_id)
            .await?
            .table_cell_indices(range.0)
            .ok_or_else(|| DocumentError::Layout("inserted price table not found".to_string()))?;
        self.batch_update(document_id, document.cell_text_requests(&cell_indices)?).await?;
        debug!(document_id, cells = cell_indices.len(), "Price table inserted");
        Ok(())
    }

    async fn export(&self, document_id: &str) -> Result<Bytes, DocumentError> {
        let url = format!("{}/files/{}/export", self.config.drive_api_url, document_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .query(&[("mimeType", "application/pdf")])
            .send()
            .await?;
        Ok(Self::check(response, "export").await?.bytes().await?)
    }

    async fn delete_copy(&self, document_id: &str) {
        let url = format!("{}/files/{}", self.config.drive_api_url, document_id);
        let result = self
            .http
            .delete(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => debug!(document_id, "Temporary copy deleted"),
            Ok(response) => warn!(document_id, status = %response.status(), "Failed to delete temporary copy"),
            Err(e) => warn!(document_id, "Failed to delete temporary copy: {}", e),
        }
    }
}

#[async_trait]
impl DocumentExporter for GoogleDocsExporter {
    #[instrument(skip(self, document), fields(quote_id = %document.quote_id))]
    async fn export_pdf(&self, document: &QuotationDocument) -> Result<Bytes, DocumentError> {
        let document_id = self.copy_template(&document.file_name()).await?;

        let exported = match self.fill_placeholders(&document_id, document).await {
            Ok(()) => self.export(&document_id).await,
            Err(e) => Err(e),
        };
        self.delete_copy(&document_id).await;

        let pdf = exported?;
        info!("Exported quotation PDF ({} bytes)", pdf.len());
        Ok(pdf)
    }
}
