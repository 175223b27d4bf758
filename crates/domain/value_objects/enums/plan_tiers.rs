use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PlanTierId {
    Free,
    Pro,
    CreatorPlus,
}

impl PlanTierId {
    /// Every tier, cheapest first.
    pub const ALL: [PlanTierId; 3] = [PlanTierId::Free, PlanTierId::Pro, PlanTierId::CreatorPlus];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTierId::Free => "free",
            PlanTierId::Pro => "pro",
            PlanTierId::CreatorPlus => "creator_plus",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "free" => Some(PlanTierId::Free),
            "pro" => Some(PlanTierId::Pro),
            "creator_plus" => Some(PlanTierId::CreatorPlus),
            _ => None,
        }
    }
}

impl Display for PlanTierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
