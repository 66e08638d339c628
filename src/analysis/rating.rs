//! Keyword-based health rating over the parsed food items.
//!
//! This is a display heuristic, not nutrition science: item names are matched
//! against small healthy/unhealthy keyword lists and the per-item scores are
//! averaged onto a 1-5 star scale.

use crate::models::FoodItem;

const HEALTHY_KEYWORDS: &[&str] = &[
    "salad", "vegetable", "fruit", "lean", "grilled", "steamed", "boiled", "fresh", "organic",
];

const UNHEALTHY_KEYWORDS: &[&str] = &[
    "fried", "deep fried", "processed", "sugary", "sweet", "dessert", "cake", "cookie", "candy",
    "soda",
];

const LABELS: [&str; 5] = ["Very Poor", "Poor", "Fair", "Good", "Excellent"];

/// A 1-5 star rating with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRating {
    pub tier: u8,
    pub label: &'static str,
    /// Set when the rating is a placeholder rather than derived from items.
    pub note: Option<&'static str>,
}

impl HealthRating {
    pub fn stars(&self) -> String {
        "⭐".repeat(self.tier as usize)
    }
}

/// Per-item contribution: healthy keywords win over unhealthy when both hit.
fn item_score(item: &FoodItem) -> i32 {
    let name = item.name.to_lowercase();
    if HEALTHY_KEYWORDS.iter().any(|k| name.contains(k)) {
        2
    } else if UNHEALTHY_KEYWORDS.iter().any(|k| name.contains(k)) {
        -1
    } else {
        1
    }
}

/// Rate a list of parsed food items.
///
/// An empty list deterministically yields the top tier with a "no items"
/// note; callers should treat that as a placeholder, not a real rating.
pub fn rate_items(items: &[FoodItem]) -> HealthRating {
    if items.is_empty() {
        return HealthRating {
            tier: 5,
            label: LABELS[4],
            note: Some("No items detected"),
        };
    }

    let score: i32 = items.iter().map(item_score).sum();

    // Average contribution is in [-1, 2]; shift onto the 1-5 scale.
    let normalized = (score as f64 / items.len() as f64) * 2.5 + 2.5;
    let tier = (normalized.round() as i64).clamp(1, 5) as u8;

    HealthRating {
        tier,
        label: LABELS[(tier - 1) as usize],
        note: None,
    }
}
