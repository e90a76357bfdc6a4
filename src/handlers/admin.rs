use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{PointsService, PromotionService, RewardService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/admin/loyalty/promotions",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All promotions, latest start first", body = [PromotionResponse]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_promotions(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match promotion_service.list_all().await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/loyalty/promotions",
    tag = "admin",
    request_body = CreatePromotionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Promotion created", body = PromotionResponse),
        (status = 400, description = "Invalid multiplier, window or weekdays"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    request: web::Json<CreatePromotionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match promotion_service
        .create_promotion(request.into_inner())
        .await
    {
        Ok(promotion) => Ok(HttpResponse::Ok().json(ApiResponse::success(promotion))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/loyalty/promotions/{id}/deactivate",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Promotion id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Promotion deactivated", body = PromotionResponse),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn deactivate_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match promotion_service.deactivate(path.into_inner()).await {
        Ok(promotion) => Ok(HttpResponse::Ok().json(ApiResponse::success(promotion))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/loyalty/rewards",
    tag = "admin",
    request_body = CreateRewardRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reward created", body = RewardResponse),
        (status = 400, description = "Inconsistent reward definition"),
        (status = 404, description = "Menu item not found")
    )
)]
pub async fn create_reward(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
    request: web::Json<CreateRewardRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match reward_service.create_reward(request.into_inner()).await {
        Ok(reward) => Ok(HttpResponse::Ok().json(ApiResponse::success(reward))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/loyalty/rewards/{id}/deactivate",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Reward id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reward deactivated", body = RewardResponse),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn deactivate_reward(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match reward_service.deactivate(path.into_inner()).await {
        Ok(reward) => Ok(HttpResponse::Ok().json(ApiResponse::success(reward))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/loyalty/adjustments",
    tag = "admin",
    request_body = PointsAdjustmentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Balance adjusted", body = PointsAdjustmentResponse),
        (status = 400, description = "Invalid type, zero points or insufficient balance")
    )
)]
pub async fn adjust_points(
    points_service: web::Data<PointsService>,
    req: HttpRequest,
    request: web::Json<PointsAdjustmentRequest>,
) -> Result<HttpResponse> {
    let admin = match require_admin(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    log::info!(
        "Admin {} adjusting points of user {} by {}",
        admin.id,
        request.user_id,
        request.points
    );

    match points_service.adjust(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/loyalty")
            .route("/promotions", web::get().to(list_promotions))
            .route("/promotions", web::post().to(create_promotion))
            .route("/promotions/{id}/deactivate", web::post().to(deactivate_promotion))
            .route("/rewards", web::post().to(create_reward))
            .route("/rewards/{id}/deactivate", web::post().to(deactivate_reward))
            .route("/adjustments", web::post().to(adjust_points)),
    );
}
