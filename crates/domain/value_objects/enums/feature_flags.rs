use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    Crm,
    Analytics,
    Email,
    Ai,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 4] = [
        FeatureFlag::Crm,
        FeatureFlag::Analytics,
        FeatureFlag::Email,
        FeatureFlag::Ai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::Crm => "crm",
            FeatureFlag::Analytics => "analytics",
            FeatureFlag::Email => "email",
            FeatureFlag::Ai => "ai",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "crm" => Some(FeatureFlag::Crm),
            "analytics" => Some(FeatureFlag::Analytics),
            "email" => Some(FeatureFlag::Email),
            "ai" => Some(FeatureFlag::Ai),
            _ => None,
        }
    }
}

impl Display for FeatureFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
