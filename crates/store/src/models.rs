//! Reader database records.

use crate::error::{Error, ErrorKind};

/// Reading state of a book as tracked by the reader.
///
/// Progress only ever moves forward: `Unread -> InProgress -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadStatus {
    Unread,
    InProgress,
    Finished,
}
impl ReadStatus {
    /// Value stored in the `ReadStatus` column.
    pub fn code(self) -> i64 {
        match self {
            Self::Unread => 0,
            Self::InProgress => 1,
            Self::Finished => 2,
        }
    }
}
impl TryFrom<i64> for ReadStatus {
    type Error = Error;
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Unread),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::Finished),
            _ => exn::bail!(ErrorKind::InvalidData("ReadStatus")),
        }
    }
}

/// The descriptive columns shelfsync mirrors from the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMetadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub attribution: Option<String>,
    pub description: Option<String>,
    pub series: Option<String>,
    /// Series position exactly as the catalog spells it.
    pub series_number: Option<String>,
    /// Series position parsed as a number, used by the reader for sorting.
    pub series_number_float: Option<f64>,
    pub series_id: Option<String>,
}

/// A book row in the reader's `content` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub content_id: String,
    pub metadata: RecordMetadata,
    pub read_status: ReadStatus,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ContentRow {
    content_id: String,
    title: Option<String>,
    subtitle: Option<String>,
    attribution: Option<String>,
    description: Option<String>,
    series: Option<String>,
    series_number: Option<String>,
    series_number_float: Option<f64>,
    series_id: Option<String>,
    read_status: Option<i64>,
}
impl TryFrom<ContentRow> for CatalogRecord {
    type Error = Error;
    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            content_id: row.content_id,
            metadata: RecordMetadata {
                title: row.title,
                subtitle: row.subtitle,
                attribution: row.attribution,
                description: row.description,
                series: row.series,
                series_number: row.series_number,
                series_number_float: row.series_number_float,
                series_id: row.series_id,
            },
            // The firmware defaults the column to 0; treat a NULL the same way.
            read_status: ReadStatus::try_from(row.read_status.unwrap_or(0))?,
        })
    }
}
