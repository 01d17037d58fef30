//! SyncError entity model
//!
//! One row per failed source record (or one per whole-job failure reason),
//! owned exclusively by a sync job and removed with it on cascade.

use std::fmt;

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// SyncError entity representing a single per-record failure
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_errors")]
pub struct Model {
    /// Unique identifier for the sync error (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning sync job
    pub sync_job_id: Uuid,

    /// Kind of record that failed; `"job"` for a whole-job failure reason
    pub entity_type: String,

    /// Identifier of the failing record in the source system
    pub external_id: String,

    /// Classification of the failure
    pub error_type: SyncErrorType,

    /// Human-readable description of the failure
    pub error_message: String,

    /// Optional serialized offending record for diagnostics
    #[sea_orm(column_type = "JsonBinary")]
    pub raw_data: Option<JsonValue>,

    /// Whether an operator or retrier has dealt with this failure
    pub resolved: bool,

    pub resolved_at: Option<DateTimeWithTimeZone>,

    pub resolved_by: Option<String>,

    /// How the failure was dealt with; set only once resolved
    pub resolution: Option<ErrorResolution>,

    /// Timestamp when the sync error was recorded
    pub created_at: DateTimeWithTimeZone,
}

/// Classification of a per-record sync failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SyncErrorType {
    #[sea_orm(string_value = "validation")]
    #[serde(rename = "validation")]
    Validation,

    #[sea_orm(string_value = "conflict")]
    #[serde(rename = "conflict")]
    Conflict,

    #[sea_orm(string_value = "missing_ref")]
    #[serde(rename = "missing_ref")]
    MissingRef,

    #[sea_orm(string_value = "permission")]
    #[serde(rename = "permission")]
    Permission,

    #[sea_orm(string_value = "unknown")]
    #[serde(rename = "unknown")]
    Unknown,
}

impl SyncErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::MissingRef => "missing_ref",
            Self::Permission => "permission",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SyncErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a recorded failure was dealt with
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ErrorResolution {
    #[sea_orm(string_value = "skipped")]
    #[serde(rename = "skipped")]
    Skipped,

    #[sea_orm(string_value = "manual_fix")]
    #[serde(rename = "manual_fix")]
    ManualFix,

    #[sea_orm(string_value = "auto_retry")]
    #[serde(rename = "auto_retry")]
    AutoRetry,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sync_job::Entity",
        from = "Column::SyncJobId",
        to = "super::sync_job::Column::Id"
    )]
    SyncJob,
}

impl Related<super::sync_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
