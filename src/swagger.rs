use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{DiscountType, PointTransactionType, RewardSnapshot, RewardType};
use crate::error::CouponRejection;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::loyalty::get_dashboard,
        handlers::loyalty::get_points,
        handlers::loyalty::get_active_promotions,
        handlers::loyalty::get_rewards,
        handlers::loyalty::redeem_reward,
        handlers::loyalty::get_redemptions,
        handlers::loyalty::get_transactions,
        handlers::loyalty::earn_points,
        handlers::loyalty::use_redemption,
        handlers::coupon_code::get_coupon_code,
        handlers::coupon_code::quote_coupon_code,
        handlers::admin::list_promotions,
        handlers::admin::create_promotion,
        handlers::admin::deactivate_promotion,
        handlers::admin::create_reward,
        handlers::admin::deactivate_reward,
        handlers::admin::adjust_points,
    ),
    components(
        schemas(
            ApiError,
            UserPointsResponse,
            PointTransactionResponse,
            PointTransactionType,
            TransactionQuery,
            EarnPointsRequest,
            PointsEarnedResponse,
            PointsAdjustmentRequest,
            PointsAdjustmentResponse,
            PromotionResponse,
            CreatePromotionRequest,
            RewardResponse,
            RewardType,
            CreateRewardRequest,
            RewardSnapshot,
            RedemptionResponse,
            RedeemRewardRequest,
            RedeemRewardResponse,
            RedemptionQuery,
            UseRedemptionRequest,
            UseRedemptionResponse,
            CouponCodeResponse,
            DiscountType,
            CouponQuoteRequest,
            CouponQuoteResponse,
            CouponRejection,
            LoyaltyDashboardResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "loyalty", description = "Points, promotions, rewards and redemptions"),
        (name = "coupon", description = "Checkout coupon lookup and pricing"),
        (name = "admin", description = "Loyalty program management"),
    ),
    info(
        title = "Loyalty Backend API",
        version = "1.0.0",
        description = "Loyalty points and reward redemption REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
