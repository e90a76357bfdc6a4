use crate::error::AppError;
use crate::middlewares::require_user;
use crate::models::*;
use crate::services::{
    DashboardService, EarningService, PointsService, PromotionService, RedemptionService,
    RewardService,
};
use crate::utils::to_cents;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/loyalty/dashboard",
    tag = "loyalty",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Balance, promotions, rewards, recent activity", body = LoyaltyDashboardResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_dashboard(
    dashboard_service: web::Data<DashboardService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match dashboard_service.dashboard(user.id, Utc::now()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/points",
    tag = "loyalty",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current balance", body = UserPointsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_points(
    points_service: web::Data<PointsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match points_service.ensure(user.id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/promotions",
    tag = "loyalty",
    responses(
        (status = 200, description = "Promotions in effect now, highest multiplier first", body = [PromotionResponse])
    )
)]
pub async fn get_active_promotions(
    promotion_service: web::Data<PromotionService>,
) -> Result<HttpResponse> {
    match promotion_service.active_promotions(Utc::now()).await {
        Ok(list) => {
            let list: Vec<PromotionResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/rewards",
    tag = "loyalty",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Redeemable rewards with affordability", body = [RewardResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_rewards(
    points_service: web::Data<PointsService>,
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    let balance = match points_service.ensure(user.id).await {
        Ok(points) => points.current_balance,
        Err(e) => return Ok(e.error_response()),
    };

    match reward_service
        .list_available(Utc::now(), Some(balance))
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/loyalty/redeem",
    tag = "loyalty",
    request_body = RedeemRewardRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reward redeemed", body = RedeemRewardResponse),
        (status = 400, description = "Missing reward id, insufficient points or no points record"),
        (status = 404, description = "Reward not found or no longer available")
    )
)]
pub async fn redeem_reward(
    redemption_service: web::Data<RedemptionService>,
    req: HttpRequest,
    request: web::Json<RedeemRewardRequest>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let Some(reward_id) = request.reward_id else {
        return Ok(AppError::ValidationError("reward_id is required".to_string()).error_response());
    };

    match redemption_service
        .redeem(user.id, reward_id, Utc::now())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/redemptions",
    tag = "loyalty",
    params(
        ("unused" = Option<bool>, Query, description = "Only redemptions not yet used by an order")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Redemptions, newest first", body = [RedemptionResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_redemptions(
    redemption_service: web::Data<RedemptionService>,
    req: HttpRequest,
    query: web::Query<RedemptionQuery>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match redemption_service.list_redemptions(user.id, &query).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/loyalty/transactions",
    tag = "loyalty",
    params(
        ("limit" = Option<u64>, Query, description = "Max rows (default 50)"),
        ("type" = Option<String>, Query, description = "earned/redeemed/expired/bonus/adjustment")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = [PointTransactionResponse]),
        (status = 400, description = "Unknown transaction type")
    )
)]
pub async fn get_transactions(
    points_service: web::Data<PointsService>,
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match points_service.list_transactions(user.id, &query).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/loyalty/earn",
    tag = "loyalty",
    request_body = EarnPointsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Points credited", body = PointsEarnedResponse),
        (status = 400, description = "Missing fields or points already awarded"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn earn_points(
    earning_service: web::Data<EarningService>,
    req: HttpRequest,
    request: web::Json<EarnPointsRequest>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let (Some(order_id), Some(order_total)) = (request.order_id, request.order_total) else {
        return Ok(
            AppError::ValidationError("order_id and order_total are required".to_string())
                .error_response(),
        );
    };
    let total_cents = match to_cents(order_total) {
        Ok(cents) => cents,
        Err(e) => return Ok(e.error_response()),
    };

    match earning_service
        .earn_points(user.id, order_id, total_cents, Utc::now())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/loyalty/use-redemption",
    tag = "loyalty",
    request_body = UseRedemptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Redemption marked used", body = UseRedemptionResponse),
        (status = 400, description = "Missing fields or coupon no longer usable"),
        (status = 404, description = "Redemption not found or already used")
    )
)]
pub async fn use_redemption(
    redemption_service: web::Data<RedemptionService>,
    req: HttpRequest,
    request: web::Json<UseRedemptionRequest>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let (Some(redemption_id), Some(order_id)) = (request.redemption_id, request.order_id) else {
        return Ok(
            AppError::ValidationError("redemption_id and order_id are required".to_string())
                .error_response(),
        );
    };

    match redemption_service
        .use_redemption(user.id, redemption_id, order_id, Utc::now())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn loyalty_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/loyalty")
            .route("/dashboard", web::get().to(get_dashboard))
            .route("/points", web::get().to(get_points))
            .route("/promotions", web::get().to(get_active_promotions))
            .route("/rewards", web::get().to(get_rewards))
            .route("/redeem", web::post().to(redeem_reward))
            .route("/redemptions", web::get().to(get_redemptions))
            .route("/transactions", web::get().to(get_transactions))
            .route("/earn", web::post().to(earn_points))
            .route("/use-redemption", web::post().to(use_redemption)),
    );
}
