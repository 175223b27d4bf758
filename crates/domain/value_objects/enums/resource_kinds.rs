use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::feature_flags::FeatureFlag;

/// Dashboard resources whose creation is capped per plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Ideas,
    Pillars,
    Brands,
    EmailAccounts,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Ideas,
        ResourceKind::Pillars,
        ResourceKind::Brands,
        ResourceKind::EmailAccounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ideas => "ideas",
            ResourceKind::Pillars => "pillars",
            ResourceKind::Brands => "brands",
            ResourceKind::EmailAccounts => "email_accounts",
        }
    }

    /// Feature a plan must include before this resource can be created at all.
    pub fn required_feature(&self) -> Option<FeatureFlag> {
        match self {
            ResourceKind::EmailAccounts => Some(FeatureFlag::Email),
            _ => None,
        }
    }

    /// Accepts both the snake_case name and the dashed form used in URLs.
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "ideas" => Some(ResourceKind::Ideas),
            "pillars" => Some(ResourceKind::Pillars),
            "brands" => Some(ResourceKind::Brands),
            "email_accounts" | "email-accounts" => Some(ResourceKind::EmailAccounts),
            _ => None,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
