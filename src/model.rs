//! Data model for the wallabag entries API.
//!
//! Only the fields the exporter needs are decoded; everything else in the
//! HAL response is ignored.

use serde::{Deserialize, Serialize};

/// One saved article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: u64,
    /// Display title. wallabag sends `null` for entries it could not fetch.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Entry {
    /// Title, or an empty string when the server sent none.
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// One page of the entries listing plus its pagination metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct EntriesPage {
    /// 1-based index of this page.
    pub page: u32,
    /// Page size the server used.
    pub limit: u32,
    /// Total page count for the query.
    pub pages: u32,
    /// Total entry count for the query, across all pages.
    pub total: usize,
    #[serde(rename = "_embedded", default)]
    pub embedded: Embedded,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub items: Vec<Entry>,
}

impl EntriesPage {
    pub fn items(&self) -> &[Entry] {
        &self.embedded.items
    }

    pub fn into_items(self) -> Vec<Entry> {
        self.embedded.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn entries_page_decodes_hal_shape() -> Result<(), Box<dyn Error>> {
        let json = r#"{
            "page": 2,
            "limit": 30,
            "pages": 3,
            "total": 75,
            "_links": {"self": {"href": "https://bag.example/api/entries?page=2"}},
            "_embedded": {
                "items": [
                    {"id": 17, "title": "Report: Q1 Results", "url": "https://example.com/q1", "is_archived": 0},
                    {"id": 18, "title": null, "url": "https://example.com/broken"}
                ]
            }
        }"#;
        let page: EntriesPage = serde_json::from_str(json)?;
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 30);
        assert_eq!(page.pages, 3);
        assert_eq!(page.total, 75);
        assert_eq!(page.items().len(), 2);
        assert_eq!(page.items()[0].id, 17);
        assert_eq!(page.items()[0].title_or_empty(), "Report: Q1 Results");
        assert_eq!(page.items()[1].title, None);
        assert_eq!(page.items()[1].title_or_empty(), "");
        Ok(())
    }

    #[test]
    fn entries_page_without_embedded_is_empty() -> Result<(), Box<dyn Error>> {
        let page: EntriesPage =
            serde_json::from_str(r#"{"page": 1, "limit": 30, "pages": 0, "total": 0}"#)?;
        assert!(page.items().is_empty());
        assert!(page.into_items().is_empty());
        Ok(())
    }
}
