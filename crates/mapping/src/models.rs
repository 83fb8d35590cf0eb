use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::Serialize;
use time::UtcDateTime;
use uuid::Uuid;

/// Whether a mapping is in use or has been torn down.
///
/// Mappings are never hard-deleted: tearing one down records when it
/// happened and hides it from every lookup that asks for active mappings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "at", rename_all = "lowercase")]
pub enum MappingState {
    Active,
    Deleted(UtcDateTime),
}

/// The association between a source dataset and a destination project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub id: Uuid,
    pub source_dataset_id: String,
    pub destination_project_id: String,
    pub destination_project_name: Option<String>,
    pub created_at: UtcDateTime,
    /// When the last successful reconciliation pass finished.
    pub last_synchronized_at: Option<UtcDateTime>,
    pub state: MappingState,
}
impl Mapping {
    pub fn is_active(&self) -> bool {
        self.state == MappingState::Active
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct MappingRow {
    id: String,
    source_dataset_id: String,
    destination_project_id: String,
    destination_project_name: Option<String>,
    created_at: i64,
    last_synchronized_at: Option<i64>,
    deleted_at: Option<i64>,
}

fn timestamp(seconds: i64, field: &'static str) -> Result<UtcDateTime, Error> {
    UtcDateTime::from_unix_timestamp(seconds).or_raise(|| ErrorKind::InvalidData(field))
}

impl TryFrom<MappingRow> for Mapping {
    type Error = Error;
    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&row.id).or_raise(|| ErrorKind::InvalidData("mapping id"))?,
            source_dataset_id: row.source_dataset_id,
            destination_project_id: row.destination_project_id,
            destination_project_name: row.destination_project_name,
            created_at: timestamp(row.created_at, "creation date")?,
            last_synchronized_at: row
                .last_synchronized_at
                .map(|ts| timestamp(ts, "last synchronization date"))
                .transpose()?,
            state: match row.deleted_at {
                None => MappingState::Active,
                Some(ts) => MappingState::Deleted(timestamp(ts, "deletion date")?),
            },
        })
    }
}
