pub mod coupon_codes;
pub mod menu_items;
pub mod orders;
pub mod point_transactions;
pub mod promotions;
pub mod reward_redemptions;
pub mod rewards;
pub mod user_points;

pub use coupon_codes as coupon_code_entity;
pub use menu_items as menu_item_entity;
pub use orders as order_entity;
pub use point_transactions as point_transaction_entity;
pub use promotions as promotion_entity;
pub use reward_redemptions as reward_redemption_entity;
pub use rewards as reward_entity;
pub use user_points as user_points_entity;

pub use coupon_codes::DiscountType;
pub use point_transactions::PointTransactionType;
pub use promotions::WeekdaySet;
pub use reward_redemptions::RewardSnapshot;
pub use rewards::RewardType;
