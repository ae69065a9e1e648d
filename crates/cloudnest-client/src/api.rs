//! The backend REST surface as a trait.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use cloudnest_core::error::{AppError, ErrorKind};
use cloudnest_core::result::AppResult;
use cloudnest_core::types::{ItemId, PageRequest, PageResponse};
use cloudnest_entity::Item;

/// Upper bound on pages fetched by [`FileApi::list_all`].
const MAX_PAGES: u32 = 1_000;

/// Parameters of the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only children of this folder; `None` lists the root.
    pub parent_id: Option<ItemId>,
    /// Server-side name search.
    pub search: Option<String>,
    /// A single item by id.
    pub id: Option<ItemId>,
    /// Items owned by a user (admin listings).
    pub user_id: Option<String>,
    /// Which page to fetch.
    pub page: PageRequest,
}

impl ListQuery {
    /// Children of a folder, or root-level items.
    pub fn children_of(parent_id: Option<ItemId>) -> Self {
        Self {
            parent_id,
            ..Self::default()
        }
    }

    /// Server-side search across the hierarchy.
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            search: Some(query.into()),
            ..Self::default()
        }
    }

    /// A single item.
    pub fn by_id(id: ItemId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Replace the page request.
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Where a move sends its items.
///
/// The backend tells "move to root" apart from "parent unspecified" only
/// by an explicit empty `new_parent_id`, so root is its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveDestination {
    /// The top level.
    Root,
    /// A folder.
    Folder(ItemId),
}

impl MoveDestination {
    /// Canonicalize an optional parent, mapping root sentinels to [`Self::Root`].
    pub fn from_parent(parent_id: Option<ItemId>, sentinels: &[String]) -> Self {
        match parent_id {
            Some(id) if !id.is_root_sentinel(sentinels) => Self::Folder(id),
            _ => Self::Root,
        }
    }

    /// The value sent as `new_parent_id`.
    pub fn wire_value(&self) -> &str {
        match self {
            Self::Root => "",
            Self::Folder(id) => id.as_str(),
        }
    }

    /// The destination as a parent id (`None` = root).
    pub fn parent_id(&self) -> Option<&ItemId> {
        match self {
            Self::Root => None,
            Self::Folder(id) => Some(id),
        }
    }
}

/// A file ready to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent to the backend.
    pub name: String,
    /// MIME type used for validation and the multipart part.
    pub mime_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl UploadFile {
    /// Build an upload from memory.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::validation(format!("Not a file path: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Cannot read {}", path.display()),
                e,
            )
        })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, mime_type, bytes))
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Operations the file backend exposes.
///
/// Every call carries the stored bearer token. Implementations map an HTML
/// response to [`ErrorKind::Authentication`] rather than a parse failure.
#[async_trait]
pub trait FileApi: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch one page of the flat listing.
    async fn list_items(&self, query: &ListQuery) -> AppResult<PageResponse<Item>>;

    /// Fetch the folder listing used for trees and breadcrumbs.
    async fn folder_tree(&self) -> AppResult<Vec<Item>>;

    /// Create a folder.
    async fn create_folder(&self, name: &str, parent_id: Option<&ItemId>) -> AppResult<Item>;

    /// Upload one file. Returns the created items.
    async fn upload_file(&self, file: &UploadFile, parent_id: Option<&ItemId>) -> AppResult<Vec<Item>>;

    /// Move an item.
    async fn move_item(&self, id: &ItemId, destination: &MoveDestination) -> AppResult<()>;

    /// Rename an item.
    async fn rename(&self, id: &ItemId, name: &str) -> AppResult<()>;

    /// Move an item to the trash.
    async fn trash(&self, id: &ItemId) -> AppResult<()>;

    /// Restore an item from the trash.
    async fn restore(&self, id: &ItemId) -> AppResult<()>;

    /// Trash several items.
    async fn bulk_trash(&self, ids: &[ItemId]) -> AppResult<()>;

    /// Restore several items.
    async fn bulk_restore(&self, ids: &[ItemId]) -> AppResult<()>;

    /// Permanently delete several items.
    async fn bulk_delete(&self, ids: &[ItemId]) -> AppResult<()>;

    /// Star or unstar an item.
    async fn set_starred(&self, id: &ItemId, starred: bool) -> AppResult<()>;

    /// Resolve a download URL.
    async fn download_url(&self, id: &ItemId) -> AppResult<String>;

    /// Fetch every page of a listing.
    async fn list_all(&self, query: &ListQuery) -> AppResult<Vec<Item>> {
        let mut page = query.page;
        let mut items = Vec::new();
        loop {
            let response = self.list_items(&query.clone().with_page(page)).await?;
            let has_next = response.has_next();
            items.extend(response.items);
            if !has_next {
                break;
            }
            if page.page >= MAX_PAGES {
                warn!(pages = page.page, "Listing exceeds page limit, truncating");
                break;
            }
            page = page.next();
        }
        Ok(items)
    }

    /// Fetch a single item by id.
    async fn get_item(&self, id: &ItemId) -> AppResult<Item> {
        let response = self.list_items(&ListQuery::by_id(id.clone())).await?;
        response
            .items
            .into_iter()
            .find(|item| &item.id == id)
            .ok_or_else(|| AppError::not_found(format!("Item {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_destination_canonical_form() {
        let sentinels = vec!["".to_string(), "0".to_string()];
        assert_eq!(MoveDestination::from_parent(None, &sentinels), MoveDestination::Root);
        assert_eq!(
            MoveDestination::from_parent(Some(ItemId::from("0")), &sentinels),
            MoveDestination::Root
        );
        assert_eq!(MoveDestination::Root.wire_value(), "");

        let dest = MoveDestination::from_parent(Some(ItemId::from("7")), &sentinels);
        assert_eq!(dest.wire_value(), "7");
        assert_eq!(dest.parent_id(), Some(&ItemId::from("7")));
    }

    #[tokio::test]
    async fn test_upload_file_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.size(), 5);
    }
}
