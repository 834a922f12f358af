//! Catalog domain models.
//!
//! These are the shapes the rest of shelfsync works with. Wire formats are
//! decoded separately (see the HTTP client) and converted once into these.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Kind of media a library holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaType {
    Book,
    Podcast,
    Other(String),
}
impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "book" => Self::Book,
            "podcast" => Self::Podcast,
            _ => Self::Other(value.to_string()),
        }
    }
}
impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Book => write!(f, "book"),
            Self::Podcast => write!(f, "podcast"),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

/// A library on the catalog server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
}
impl Library {
    pub fn new(id: impl Into<String>, name: impl Into<String>, media_type: MediaType) -> Self {
        Self { id: id.into(), name: name.into(), media_type }
    }
}

/// An item's membership of a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesMembership {
    /// Catalog series ID
    pub id: String,
    /// Series name
    pub name: String,
    /// Position in the series as entered by the librarian (e.g. `"2.5"`).
    pub sequence: Option<String>,
}
impl SeriesMembership {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sequence: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sequence: sequence.map(str::to_string),
        }
    }

    /// The sequence as a number, if it parses as a finite one.
    pub fn sequence_number(&self) -> Option<f64> {
        self.sequence.as_deref().and_then(|s| s.trim().parse::<f64>().ok()).filter(|n| n.is_finite())
    }
}

/// The primary (ebook) content file of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFile {
    /// Opaque file handle used to download the file.
    pub ino: String,
    /// File name relative to the item directory.
    pub filename: String,
}
impl ContentFile {
    pub fn new(ino: impl Into<String>, filename: impl Into<String>) -> Self {
        Self { ino: ino.into(), filename: filename.into() }
    }
}

/// An item as listed by the catalog.
///
/// Listing endpoints may omit progress and the content file; the detailed
/// form from [`fetch_item_detail`](crate::CatalogClient::fetch_item_detail)
/// fills them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Opaque identity, unique within a library.
    pub id: String,
    /// Placement of the item relative to the library root (e.g.
    /// `"Author/Series/01 - Title"`).
    pub rel_path: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author_name: Option<String>,
    pub description: Option<String>,
    /// Series memberships in catalog order; only the first one is mirrored.
    pub series: Vec<SeriesMembership>,
    /// Whether the authenticated user finished the item.
    pub finished: bool,
    pub content: Option<ContentFile>,
}
impl RemoteItem {
    pub fn new(id: impl Into<String>, rel_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rel_path: rel_path.into(),
            title: None,
            subtitle: None,
            author_name: None,
            description: None,
            series: Vec::new(),
            finished: false,
            content: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_name = Some(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_series(mut self, series: SeriesMembership) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_finished(mut self, finished: bool) -> Self {
        self.finished = finished;
        self
    }

    pub fn with_content(mut self, content: ContentFile) -> Self {
        self.content = Some(content);
        self
    }

    pub fn primary_series(&self) -> Option<&SeriesMembership> {
        self.series.first()
    }
}
impl Display for RemoteItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.title, &self.author_name) {
            (Some(title), Some(author)) => write!(f, "{title} by {author} ({})", self.id),
            (Some(title), None) => write!(f, "{title} ({})", self.id),
            _ => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("2"), Some(2.0))]
    #[case(Some("2.5"), Some(2.5))]
    #[case(Some(" 3 "), Some(3.0))]
    #[case(Some("Book Three"), None)]
    #[case(Some("NaN"), None)]
    #[case(None, None)]
    fn test_sequence_number(#[case] sequence: Option<&str>, #[case] expected: Option<f64>) {
        let series = SeriesMembership::new("ser_1", "Discworld", sequence);
        assert_eq!(series.sequence_number(), expected);
    }

    #[rstest]
    #[case("book", MediaType::Book)]
    #[case("Book", MediaType::Book)]
    #[case("podcast", MediaType::Podcast)]
    #[case("music", MediaType::Other("music".to_string()))]
    fn test_media_type(#[case] input: &str, #[case] expected: MediaType) {
        assert_eq!(MediaType::from(input), expected);
    }

    #[test]
    fn test_display() {
        let item = RemoteItem::new("li_1", "Pratchett/Mort").with_title("Mort").with_author("Terry Pratchett");
        assert_eq!(item.to_string(), "Mort by Terry Pratchett (li_1)");
        assert_eq!(RemoteItem::new("li_2", "x").to_string(), "li_2");
    }
}
