//! Response shapes the backend is known to send.
//!
//! Listings come back either wrapped in a paginator object or as a bare
//! array; single records come back wrapped in `data` or bare.

use serde::Deserialize;

use cloudnest_core::types::{PageRequest, PageResponse};
use cloudnest_entity::Item;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope {
    Paged {
        data: Vec<Item>,
        #[serde(default)]
        current_page: Option<u32>,
        #[serde(default)]
        last_page: Option<u32>,
    },
    Bare(Vec<Item>),
}

impl ListEnvelope {
    pub(crate) fn into_page(self, requested: PageRequest) -> PageResponse<Item> {
        match self {
            Self::Paged {
                data,
                current_page,
                last_page,
            } => {
                let current_page = current_page.unwrap_or(requested.page);
                PageResponse {
                    items: data,
                    current_page,
                    last_page: last_page.unwrap_or(current_page).max(current_page),
                }
            }
            Self::Bare(items) => PageResponse::single(items),
        }
    }

    pub(crate) fn into_items(self) -> Vec<Item> {
        match self {
            Self::Paged { data, .. } => data,
            Self::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope {
    Wrapped { data: Item },
    Bare(Item),
}

impl ItemEnvelope {
    pub(crate) fn into_item(self) -> Item {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// Upload responses: one item or several, wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UploadEnvelope {
    Many { data: Vec<Item> },
    One { data: Item },
    BareMany(Vec<Item>),
    BareOne(Item),
}

impl UploadEnvelope {
    pub(crate) fn into_items(self) -> Vec<Item> {
        match self {
            Self::Many { data } | Self::BareMany(data) => data,
            Self::One { data } | Self::BareOne(data) => vec![data],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DownloadEnvelope {
    Wrapped { data: DownloadLink },
    Bare(DownloadLink),
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadLink {
    #[serde(alias = "download_url")]
    pub(crate) url: String,
}

impl DownloadEnvelope {
    pub(crate) fn into_url(self) -> String {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data.url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_and_bare_listings() {
        let paged: ListEnvelope = serde_json::from_str(
            r#"{"data":[{"id":1,"name":"A","type":"folder"}],"current_page":1,"last_page":3}"#,
        )
        .unwrap();
        let page = paged.into_page(PageRequest::default());
        assert_eq!(page.items.len(), 1);
        assert!(page.has_next());

        let bare: ListEnvelope =
            serde_json::from_str(r#"[{"id":1,"name":"A","type":"folder"}]"#).unwrap();
        let page = bare.into_page(PageRequest::new(4, 10));
        assert_eq!(page.current_page, 1);
        assert!(!page.has_next());
    }

    #[test]
    fn test_upload_single_or_many() {
        let one: UploadEnvelope =
            serde_json::from_str(r#"{"data":{"id":9,"name":"a.txt","type":"file"}}"#).unwrap();
        assert_eq!(one.into_items().len(), 1);

        let many: UploadEnvelope = serde_json::from_str(
            r#"{"data":[{"id":9,"name":"a.txt","type":"file"},{"id":10,"name":"b.txt","type":"file"}]}"#,
        )
        .unwrap();
        assert_eq!(many.into_items().len(), 2);
    }

    #[test]
    fn test_download_link_aliases() {
        let link: DownloadEnvelope =
            serde_json::from_str(r#"{"data":{"download_url":"https://x/y"}}"#).unwrap();
        assert_eq!(link.into_url(), "https://x/y");
    }
}
