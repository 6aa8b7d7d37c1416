//! Plan catalog mapping plan/cadence pairs to provider price ids.

use serde::{Deserialize, Serialize};

use super::subscription::Recurrency;

/// Offered plan tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Pro,
}

impl PlanType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(Self::Basic),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }

    /// Human-readable plan name used in notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Pro => "Pro",
        }
    }
}

/// One catalog row.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub plan: PlanType,
    pub recurrency: Recurrency,
    pub price_id: String,
}

/// Maps (plan, cadence) pairs to provider price ids and back.
///
/// Built from configuration at startup; entries with no configured price id
/// are simply absent.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    entries: Vec<PlanEntry>,
}

impl PlanCatalog {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Price id for a plan/cadence pair, when configured.
    pub fn price_id(&self, plan: PlanType, recurrency: Recurrency) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.plan == plan && e.recurrency == recurrency)
            .map(|e| e.price_id.as_str())
    }

    /// Reverse lookup from a provider price id.
    pub fn plan_for_price(&self, price_id: &str) -> Option<(PlanType, Recurrency)> {
        self.entries
            .iter()
            .find(|e| e.price_id == price_id)
            .map(|e| (e.plan, e.recurrency))
    }

    /// Plan display name for a price id, or the raw id when unknown.
    /// Used in the ops summary mail, which must never fail on a lookup miss.
    pub fn plan_label(&self, price_id: &str) -> String {
        match self.plan_for_price(price_id) {
            Some((plan, recurrency)) => {
                format!("{} ({}ly)", plan.display_name(), recurrency.as_str())
            }
            None => price_id.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_catalog() -> PlanCatalog {
    PlanCatalog::new(vec![
        PlanEntry {
            plan: PlanType::Basic,
            recurrency: Recurrency::Month,
            price_id: "price_basic_m".to_string(),
        },
        PlanEntry {
            plan: PlanType::Basic,
            recurrency: Recurrency::Year,
            price_id: "price_basic_y".to_string(),
        },
        PlanEntry {
            plan: PlanType::Pro,
            recurrency: Recurrency::Month,
            price_id: "price_pro_m".to_string(),
        },
        PlanEntry {
            plan: PlanType::Pro,
            recurrency: Recurrency::Year,
            price_id: "price_pro_y".to_string(),
        },
    ])
}
