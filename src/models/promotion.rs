use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::promotion_entity::{self, MULTIPLIER_SCALE};
use crate::entities::WeekdaySet;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromotionResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// e.g. 2.0 for double points
    pub multiplier: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Weekdays (0 = Sunday) the promotion applies on; absent means every day
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable_days: Option<Vec<u8>>,
}

impl From<promotion_entity::Model> for PromotionResponse {
    fn from(m: promotion_entity::Model) -> Self {
        Self {
            id: m.id,
            multiplier: m.multiplier(),
            applicable_days: m.weekdays().map(|d| d.days()),
            name: m.name,
            description: m.description,
            start_date: m.start_date,
            end_date: m.end_date,
            is_active: m.is_active,
        }
    }
}

/// Multiplier to apply to base points right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMultiplier {
    pub multiplier_bp: i32,
    pub promotion_id: Option<i64>,
    pub promotion_name: Option<String>,
}

impl BestMultiplier {
    pub fn none() -> Self {
        Self {
            multiplier_bp: MULTIPLIER_SCALE as i32,
            promotion_id: None,
            promotion_name: None,
        }
    }

    pub fn from_promotion(p: &promotion_entity::Model) -> Self {
        Self {
            multiplier_bp: p.multiplier_bp,
            promotion_id: Some(p.id),
            promotion_name: Some(p.name.clone()),
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier_bp as f64 / MULTIPLIER_SCALE as f64
    }

    /// floor(base_points * multiplier), or None when the product does not fit.
    pub fn apply(&self, base_points: i64) -> Option<i64> {
        base_points
            .checked_mul(self.multiplier_bp as i64)
            .map(|scaled| scaled / MULTIPLIER_SCALE)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub name: String,
    pub description: Option<String>,
    /// Must be >= 1.0
    pub multiplier: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
    #[schema(value_type = Option<Vec<u8>>)]
    pub applicable_days: Option<WeekdaySet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_promotion_is_identity() {
        let none = BestMultiplier::none();
        assert_eq!(none.multiplier(), 1.0);
        assert_eq!(none.apply(9), Some(9));
        assert!(none.promotion_name.is_none());
    }

    #[test]
    fn apply_floors_fractional_points() {
        let one_and_half = BestMultiplier {
            multiplier_bp: 15_000,
            promotion_id: Some(1),
            promotion_name: Some("Lunch Rush".into()),
        };
        assert_eq!(one_and_half.apply(10), Some(15));
        assert_eq!(one_and_half.apply(9), Some(13));

        let odd = BestMultiplier {
            multiplier_bp: 11_500,
            ..one_and_half
        };
        // 20 * 1.15 = 23 exactly, no float drift
        assert_eq!(odd.apply(20), Some(23));
    }

    #[test]
    fn apply_reports_overflow() {
        let double = BestMultiplier {
            multiplier_bp: 20_000,
            promotion_id: None,
            promotion_name: None,
        };
        assert_eq!(double.apply(i64::MAX / 100), None);
    }
}
