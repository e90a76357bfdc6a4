pub mod coupon_service;
pub mod dashboard_service;
pub mod earning_service;
pub mod points_service;
pub mod promotion_service;
pub mod redemption_service;
pub mod reward_service;

pub use coupon_service::CouponService;
pub use dashboard_service::DashboardService;
pub use earning_service::EarningService;
pub use points_service::PointsService;
pub use promotion_service::PromotionService;
pub use redemption_service::RedemptionService;
pub use reward_service::RewardService;
