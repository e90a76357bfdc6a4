use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{DiscountType, coupon_code_entity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponCodeResponse {
    pub id: i64,
    pub coupon_code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Cents for fixed, percent for percentage
    pub discount_value: i64,
    /// Cents
    pub min_order_value: i64,
    /// None means unlimited
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<coupon_code_entity::Model> for CouponCodeResponse {
    fn from(m: coupon_code_entity::Model) -> Self {
        Self {
            id: m.id,
            coupon_code: m.coupon_code,
            description: m.description,
            discount_type: m.discount_type,
            discount_value: m.discount_value,
            min_order_value: m.min_order_value,
            max_uses: m.max_uses,
            current_uses: m.current_uses,
            is_active: m.is_active,
            start_date: m.start_date,
            end_date: m.end_date,
            created_at: m.created_at,
        }
    }
}

/// Checkout-time price check for a coupon typed into the order form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CouponQuoteRequest {
    pub code: String,
    pub restaurant_id: i64,
    /// Order total in currency units
    pub order_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponQuoteResponse {
    pub coupon: CouponCodeResponse,
    /// Cents
    pub order_total: i64,
    /// Cents
    pub discount_amount: i64,
    /// Cents
    pub final_total: i64,
}
