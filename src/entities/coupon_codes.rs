use crate::error::CouponRejection;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "fixed")]
    Fixed,
    #[sea_orm(string_value = "percentage")]
    Percentage,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Fixed => write!(f, "fixed"),
            DiscountType::Percentage => write!(f, "percentage"),
        }
    }
}

/// Discount token usable at checkout.
/// Two paths reach this table: coupons minted by reward redemption (restaurant_id NULL,
/// platform wide) and coupons typed into the order form (optionally restaurant scoped).
/// - discount_value: cents for fixed, whole percent for percentage
/// - max_uses: NULL means unlimited; is_active flips to false once current_uses reaches it
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupon_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub coupon_code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_value: i64,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub restaurant_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// The single usability predicate shared by every checkout path.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if !self.is_active {
            // Switched off by its last use rather than by an operator.
            if self.is_exhausted() {
                return Err(CouponRejection::CouponExhausted);
            }
            return Err(CouponRejection::CouponInactive);
        }
        if self.start_date.is_some_and(|start| start > now) {
            return Err(CouponRejection::CouponNotStarted);
        }
        if self.end_date.is_some_and(|end| end < now) {
            return Err(CouponRejection::CouponExpired);
        }
        if self.is_exhausted() {
            return Err(CouponRejection::CouponExhausted);
        }
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.current_uses >= max)
    }

    pub fn is_valid_for_restaurant(&self, restaurant_id: i64) -> bool {
        self.restaurant_id.is_none_or(|id| id == restaurant_id)
    }

    /// Discount in cents for an order total in cents, never above the total.
    pub fn discount_for(&self, order_total: i64) -> i64 {
        let raw = match self.discount_type {
            DiscountType::Fixed => self.discount_value,
            DiscountType::Percentage => order_total * self.discount_value.clamp(0, 100) / 100,
        };
        raw.clamp(0, order_total.max(0))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
