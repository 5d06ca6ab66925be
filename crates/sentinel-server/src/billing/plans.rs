//! Plan catalog lookups.
//!
//! A plan is referenced by its canonical `id`. Callers may also name it by
//! `key` or by display `name` (case-insensitive); [`PlanResolver::resolve`]
//! maps all three to the canonical entry.

use tracing::warn;

use crate::storage::{SentinelDatabase, SubscriptionPlan};

/// Catalog used when the database has none (or cannot be read).
pub fn fallback_plans() -> Vec<SubscriptionPlan> {
    [
        ("basic", "Basic", 10, 0.99, 0.099),
        ("standard", "Standard", 110, 9.9, 0.09),
        ("pro", "Pro", 230, 19.99, 0.087),
        ("business", "Business", 1500, 29.0, 0.019),
    ]
    .into_iter()
    .map(|(key, name, tokens, monthly, scan)| SubscriptionPlan {
        id: key.to_string(),
        key: key.to_string(),
        name: name.to_string(),
        monthly_tokens: tokens,
        monthly_price_usd: monthly,
        scan_price_usd: scan,
    })
    .collect()
}

#[derive(Debug, Clone, Default)]
pub struct PlanResolver {
    plans: Vec<SubscriptionPlan>,
}

impl PlanResolver {
    pub const fn new(plans: Vec<SubscriptionPlan>) -> Self {
        Self { plans }
    }

    /// Load the catalog, falling back to the built-in plans when the table is
    /// empty or unreadable.
    pub async fn load(db: &SentinelDatabase) -> Self {
        match db.list_plans().await {
            Ok(plans) if !plans.is_empty() => Self::new(plans),
            Ok(_) => Self::new(fallback_plans()),
            Err(e) => {
                warn!(error = %e, "Failed to load plan catalog, using built-in plans");
                Self::new(fallback_plans())
            }
        }
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.plans
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&SubscriptionPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&SubscriptionPlan> {
        self.plans.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Canonical id first, then key alias, then name alias.
    pub fn resolve(&self, ident: &str) -> Option<&SubscriptionPlan> {
        self.by_id(ident)
            .or_else(|| self.plans.iter().find(|p| p.key == ident))
            .or_else(|| self.by_name(ident))
    }
}
