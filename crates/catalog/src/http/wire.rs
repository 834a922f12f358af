//! Audiobookshelf JSON shapes.
//!
//! Only the fields shelfsync reads are declared; everything else in the
//! server's responses is ignored. Several fields are `null` or missing
//! depending on the endpoint and whether the item is minified, so nearly
//! everything is optional and normalised in the conversion to the domain
//! models.

use crate::models::{ContentFile, Library, MediaType, RemoteItem, SeriesMembership};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct LibrariesResponse {
    pub(crate) libraries: Vec<WireLibrary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLibrary {
    id: String,
    name: String,
    media_type: String,
}
impl From<WireLibrary> for Library {
    fn from(wire: WireLibrary) -> Self {
        Library::new(wire.id, wire.name, MediaType::from(wire.media_type.as_str()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsResponse {
    pub(crate) results: Vec<WireItem>,
    pub(crate) total: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireItem {
    id: String,
    #[serde(default)]
    rel_path: String,
    #[serde(default)]
    media: WireMedia,
    user_media_progress: Option<WireProgress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMedia {
    #[serde(default)]
    metadata: WireMetadata,
    ebook_file: Option<WireEbookFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    title: Option<String>,
    subtitle: Option<String>,
    author_name: Option<String>,
    description: Option<String>,
    authors: Option<Vec<WireAuthor>>,
    series: Option<Vec<WireSeries>>,
}

#[derive(Debug, Deserialize)]
struct WireAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireSeries {
    id: String,
    name: String,
    sequence: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEbookFile {
    ino: String,
    metadata: WireFileMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileMetadata {
    rel_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProgress {
    #[serde(default)]
    is_finished: bool,
}

impl From<WireItem> for RemoteItem {
    fn from(wire: WireItem) -> Self {
        let WireMetadata {
            title,
            subtitle,
            author_name,
            description,
            authors,
            series,
        } = wire.media.metadata;
        // Minified and expanded items carry `authorName`; the plain form only
        // has the author objects.
        let author_name = author_name.or_else(|| {
            let names: Vec<String> = authors.unwrap_or_default().into_iter().map(|a| a.name).collect();
            (!names.is_empty()).then(|| names.join(", "))
        });
        RemoteItem {
            id: wire.id,
            rel_path: wire.rel_path,
            title,
            subtitle,
            author_name,
            description,
            series: series
                .unwrap_or_default()
                .into_iter()
                .map(|s| SeriesMembership { id: s.id, name: s.name, sequence: s.sequence })
                .collect(),
            finished: wire.user_media_progress.is_some_and(|p| p.is_finished),
            content: wire.media.ebook_file.map(|f| ContentFile::new(f.ino, f.metadata.rel_path)),
        }
    }
}
