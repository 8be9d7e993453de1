//! Storage contract for documents and page images.
//!
//! Document ingestion (rasterizing PDFs, producing summaries) happens
//! outside this crate; the agent only reads. [`Storage`] is the seam:
//! implement it over a database, an object store, or anything that can
//! answer the three lookups. [`InMemoryStorage`] is the batteries-included
//! implementation used by the tests and by callers that already hold their
//! documents in memory.

use crate::error::{Error, Result};
use crate::types::{Document, DocumentInfo, ImageSource};
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only document store the agent queries during a pipeline run.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The catalog shown to the planner: id, name, summary per document.
    async fn list_documents(&self) -> Result<Vec<DocumentInfo>>;

    /// Fetch a document with its pages.
    ///
    /// # Errors
    ///
    /// `Error::DocumentNotFound` when the id is unknown.
    async fn get_document(&self, id: &str) -> Result<Document>;

    /// Fetch the image handle for one page of one document.
    ///
    /// # Errors
    ///
    /// `Error::DocumentNotFound` when the id is unknown,
    /// `Error::InvalidInput` when the page number is out of range.
    async fn get_page_image(&self, doc_id: &str, page_number: u32) -> Result<ImageSource>;
}

/// In-memory document store.
///
/// Documents are registered up front and read-only afterwards, matching the
/// ownership rules of the pipeline (storage owns documents, the agent holds
/// read-only references).
///
/// # Example
///
/// ```
/// use docsight::{Document, ImageSource, InMemoryStorage, Page, Storage};
///
/// # tokio_test::block_on(async {
/// let storage = InMemoryStorage::new(vec![
///     Document::new("d1", "Q3 Report")
///         .with_summary("Q3 financials")
///         .with_pages(vec![Page::new(1, ImageSource::path("q3-p1.jpg"))]),
/// ]);
///
/// let catalog = storage.list_documents().await.unwrap();
/// assert_eq!(catalog.len(), 1);
/// assert_eq!(catalog[0].id, "d1");
/// # });
/// ```
pub struct InMemoryStorage {
    documents: HashMap<String, Document>,
    order: Vec<String>,
}

impl InMemoryStorage {
    /// Create a store over the given documents. Catalog order follows the
    /// input order.
    pub fn new(documents: Vec<Document>) -> Self {
        let order: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        let documents = documents.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self { documents, order }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn list_documents(&self) -> Result<Vec<DocumentInfo>> {
        Ok(self
            .order
            .iter()
            .filter_map(|id| self.documents.get(id))
            .map(Document::info)
            .collect())
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }

    async fn get_page_image(&self, doc_id: &str, page_number: u32) -> Result<ImageSource> {
        let doc = self
            .documents
            .get(doc_id)
            .ok_or_else(|| Error::not_found(doc_id))?;
        doc.pages
            .iter()
            .find(|p| p.page_number == page_number)
            .map(|p| p.image.clone())
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "document {} has no page {}",
                    doc_id, page_number
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Page;

    fn storage() -> InMemoryStorage {
        InMemoryStorage::new(vec![
            Document::new("d1", "Q3 Report")
                .with_summary("Q3 financials")
                .with_pages(vec![
                    Page::new(1, ImageSource::path("d1-p1.jpg")),
                    Page::new(2, ImageSource::path("d1-p2.jpg")),
                ]),
            Document::new("d2", "Handbook").with_pages(vec![Page::new(
                1,
                ImageSource::path("d2-p1.jpg"),
            )]),
        ])
    }

    #[tokio::test]
    async fn test_catalog_preserves_registration_order() {
        let catalog = storage().list_documents().await.unwrap();
        let ids: Vec<&str> = catalog.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert_eq!(catalog[0].summary.as_deref(), Some("Q3 financials"));
        assert_eq!(catalog[1].summary, None);
    }

    #[tokio::test]
    async fn test_get_document() {
        let doc = storage().get_document("d1").await.unwrap();
        assert_eq!(doc.pages.len(), 2);

        let err = storage().get_document("nope").await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_page_image() {
        let image = storage().get_page_image("d1", 2).await.unwrap();
        assert_eq!(image, ImageSource::path("d1-p2.jpg"));

        let err = storage().get_page_image("d1", 9).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = storage().get_page_image("ghost", 1).await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }
}
