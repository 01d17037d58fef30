//! SyncJob entity model
//!
//! This module contains the SeaORM entity model for the sync_jobs table,
//! which tracks one roster synchronization attempt per row, from creation
//! through its terminal status.

use std::fmt;

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelBehavior, FromJsonQueryResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SyncJob entity representing one bulk roster-import attempt
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_jobs")]
pub struct Model {
    /// Unique identifier for the sync job (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// District / tenant identifier this job belongs to
    pub owner_id: String,

    /// Origin system the roster data is pulled from
    pub source: SyncSource,

    /// Normalized (sorted, deduplicated) set of record kinds being synced
    #[sea_orm(column_type = "JsonBinary")]
    pub entity_types: EntityTypeSet,

    /// Current lifecycle status of the job
    pub status: SyncJobStatus,

    /// Globally unique key suppressing duplicate concurrent creates
    #[sea_orm(unique)]
    pub idempotency_key: String,

    /// Total records the source reports for this sync
    pub total_records: i32,

    /// Records the worker has processed so far
    pub processed_records: i32,

    /// Records created in the platform
    pub created_records: i32,

    /// Records updated in the platform
    pub updated_records: i32,

    /// Records that failed; kept in step with sync_errors rows
    pub error_records: i32,

    /// Timestamp when the job entered `running`
    pub started_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the job reached a terminal status
    pub completed_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the sync job was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the sync job was last updated
    pub updated_at: DateTimeWithTimeZone,
}

/// Upstream system a sync job pulls roster data from
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SyncSource {
    #[sea_orm(string_value = "sis")]
    #[serde(rename = "sis")]
    Sis,

    #[sea_orm(string_value = "vendor_api")]
    #[serde(rename = "vendor_api")]
    VendorApi,

    #[sea_orm(string_value = "csv_import")]
    #[serde(rename = "csv_import")]
    CsvImport,

    #[sea_orm(string_value = "other_api")]
    #[serde(rename = "other_api")]
    OtherApi,

    #[sea_orm(string_value = "manual")]
    #[serde(rename = "manual")]
    Manual,
}

impl SyncSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sis => "sis",
            Self::VendorApi => "vendor_api",
            Self::CsvImport => "csv_import",
            Self::OtherApi => "other_api",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of roster record being synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SyncEntityType {
    #[serde(rename = "users")]
    Users,

    #[serde(rename = "schools")]
    Schools,

    #[serde(rename = "classes")]
    Classes,

    #[serde(rename = "enrollments")]
    Enrollments,

    #[serde(rename = "courses")]
    Courses,

    #[serde(rename = "academic_sessions")]
    AcademicSessions,

    #[serde(rename = "demographics")]
    Demographics,
}

impl SyncEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Schools => "schools",
            Self::Classes => "classes",
            Self::Enrollments => "enrollments",
            Self::Courses => "courses",
            Self::AcademicSessions => "academic_sessions",
            Self::Demographics => "demographics",
        }
    }
}

impl fmt::Display for SyncEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity-type set persisted as a JSON array.
///
/// Always stored normalized: sorted by name and deduplicated, so that key
/// derivation and equality checks are order-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct EntityTypeSet(pub Vec<SyncEntityType>);

impl EntityTypeSet {
    /// Builds a normalized set from caller-supplied entity types.
    pub fn normalized(entity_types: &[SyncEntityType]) -> Self {
        let mut types = entity_types.to_vec();
        types.sort_unstable_by_key(|t| t.as_str());
        types.dedup();
        Self(types)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncEntityType> {
        self.0.iter()
    }
}

/// Lifecycle status of a sync job
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SyncJobStatus {
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pending,

    #[sea_orm(string_value = "running")]
    #[serde(rename = "running")]
    Running,

    #[sea_orm(string_value = "completed")]
    #[serde(rename = "completed")]
    Completed,

    #[sea_orm(string_value = "failed")]
    #[serde(rename = "failed")]
    Failed,

    #[sea_orm(string_value = "cancelled")]
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl SyncJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// A terminal status has no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: SyncJobStatus) -> bool {
        use SyncJobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl fmt::Display for SyncJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sync_error::Entity")]
    SyncError,
}

impl Related<super::sync_error::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncError.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
