//! wallabag API access: the operations the exporter needs, the blocking client, and
//! the pagination walker that collects every entry for a tag.

mod client;
mod error;

pub use client::{Credentials, WallabagClient, WallabagClientBuilder};
pub use error::ApiError;

use crate::model::{EntriesPage, Entry};

/// Tag wallabag users put on entries meant for the e-reader.
pub const DEFAULT_TAG: &str = "toreader";

/// Server-side export format. The keyword is also used as the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Epub,
    Mobi,
    Pdf,
    Txt,
    Csv,
    Json,
    Xml,
}

impl ExportFormat {
    /// Keyword in the export URL (`/api/entries/{id}/export.{keyword}`).
    pub fn keyword(self) -> &'static str {
        match self {
            ExportFormat::Epub => "epub",
            ExportFormat::Mobi => "mobi",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
        }
    }

    pub fn extension(self) -> &'static str {
        self.keyword()
    }
}

/// Filter and paging for one "list entries" call. `None` leaves the parameter out
/// so the server default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub tags: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl EntryQuery {
    /// First page of entries carrying `tag`, server-chosen page size.
    pub fn tagged(tag: &str) -> Self {
        Self {
            tags: Some(tag.to_string()),
            ..Self::default()
        }
    }
}

/// Remote operations used by the exporter. Implemented by [WallabagClient].
pub trait WallabagApi {
    fn list_entries(&mut self, query: &EntryQuery) -> Result<EntriesPage, ApiError>;

    fn export_entry(&mut self, id: u64, format: ExportFormat) -> Result<Vec<u8>, ApiError>;
}

/// Collect every entry tagged `tag`, in server order.
///
/// The first request leaves page and page size unset. When the reported total is
/// larger than what came back, the remaining pages are fetched with the page size
/// the server echoed. Any failed request aborts the walk.
pub fn fetch_all_entries<A: WallabagApi + ?Sized>(
    api: &mut A,
    tag: &str,
) -> Result<Vec<Entry>, ApiError> {
    let first = api.list_entries(&EntryQuery::tagged(tag)).map_err(|e| {
        tracing::error!("first entries request failed: {}", e);
        e
    })?;
    let next_page = first.page + 1;
    let per_page = first.limit;
    let pages = first.pages;
    let total = first.total;
    let mut entries = first.into_items();

    if total > entries.len() {
        tracing::debug!(total, pages, per_page, "listing is paginated");
        for page in next_page..=pages {
            let query = EntryQuery {
                tags: Some(tag.to_string()),
                page: Some(page),
                per_page: Some(per_page),
            };
            let result = api.list_entries(&query).map_err(|e| {
                tracing::error!("entries request for page {} failed: {}", page, e);
                e
            })?;
            entries.extend(result.into_items());
        }
    }
    Ok(entries)
}
