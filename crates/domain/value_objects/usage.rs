use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::resource_kinds::ResourceKind;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    LimitReached,
}

/// Outcome of a usage-guard check.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum UsageDecision {
    Allow,
    Deny {
        reason: DenyReason,
        limit: i64,
        current: i64,
    },
}

impl UsageDecision {
    pub fn limit_reached(limit: i64, current: i64) -> Self {
        UsageDecision::Deny {
            reason: DenyReason::LimitReached,
            limit,
            current,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, UsageDecision::Allow)
    }
}

/// Result of the storage-side count-and-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedInsert {
    Inserted(Uuid),
    LimitReached { current: i64 },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreatedResourceDto {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub name: String,
}
