use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::enums::resource_kinds::ResourceKind;

/// Sentinel limit meaning "no cap".
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid limit {value} for {resource}: expected -1 (unlimited) or a non-negative count")]
pub struct InvalidLimit {
    pub resource: ResourceKind,
    pub value: i64,
}

/// Per-plan caps on counted resources. Every value is either `UNLIMITED` or `>= 0`;
/// the constructor is the only way in, so the invariant holds for every instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawResourceLimits")]
pub struct ResourceLimits {
    ideas: i64,
    pillars: i64,
    brands: i64,
    email_accounts: i64,
}

#[derive(Deserialize)]
struct RawResourceLimits {
    ideas: i64,
    pillars: i64,
    brands: i64,
    email_accounts: i64,
}

impl TryFrom<RawResourceLimits> for ResourceLimits {
    type Error = InvalidLimit;

    fn try_from(raw: RawResourceLimits) -> Result<Self, Self::Error> {
        ResourceLimits::new(raw.ideas, raw.pillars, raw.brands, raw.email_accounts)
    }
}

impl ResourceLimits {
    pub fn new(
        ideas: i64,
        pillars: i64,
        brands: i64,
        email_accounts: i64,
    ) -> Result<Self, InvalidLimit> {
        let limits = Self {
            ideas,
            pillars,
            brands,
            email_accounts,
        };

        for resource in ResourceKind::ALL {
            let value = limits.limit_for(resource);
            if value < UNLIMITED {
                return Err(InvalidLimit { resource, value });
            }
        }

        Ok(limits)
    }

    pub fn unlimited() -> Self {
        Self {
            ideas: UNLIMITED,
            pillars: UNLIMITED,
            brands: UNLIMITED,
            email_accounts: UNLIMITED,
        }
    }

    pub fn limit_for(&self, resource: ResourceKind) -> i64 {
        match resource {
            ResourceKind::Ideas => self.ideas,
            ResourceKind::Pillars => self.pillars,
            ResourceKind::Brands => self.brands,
            ResourceKind::EmailAccounts => self.email_accounts,
        }
    }

    pub fn is_unlimited(&self, resource: ResourceKind) -> bool {
        self.limit_for(resource) == UNLIMITED
    }
}
