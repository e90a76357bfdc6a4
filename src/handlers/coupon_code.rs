use crate::models::*;
use crate::services::CouponService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/coupon-codes/{code}",
    tag = "coupon",
    params(
        ("code" = String, Path, description = "Coupon code, case insensitive")
    ),
    responses(
        (status = 200, description = "Coupon is usable now", body = CouponCodeResponse),
        (status = 400, description = "coupon_inactive / coupon_not_started / coupon_expired / coupon_exhausted"),
        (status = 404, description = "Unknown code")
    )
)]
pub async fn get_coupon_code(
    coupon_service: web::Data<CouponService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match coupon_service.validate(&path, Utc::now()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            CouponCodeResponse::from(coupon),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupon-codes/quote",
    tag = "coupon",
    request_body = CouponQuoteRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Discount for this order", body = CouponQuoteResponse),
        (status = 400, description = "Coupon not usable or minimum order value not met"),
        (status = 404, description = "Unknown code or other restaurant")
    )
)]
pub async fn quote_coupon_code(
    coupon_service: web::Data<CouponService>,
    request: web::Json<CouponQuoteRequest>,
) -> Result<HttpResponse> {
    match coupon_service
        .quote(request.into_inner(), Utc::now())
        .await
    {
        Ok(quote) => Ok(HttpResponse::Ok().json(ApiResponse::success(quote))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_code_config(cfg: &mut web::ServiceConfig) {
    // quote is registered first so it is not captured by {code}
    cfg.service(
        web::scope("/coupon-codes")
            .route("/quote", web::post().to(quote_coupon_code))
            .route("/{code}", web::get().to(get_coupon_code)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoyaltyConfig;
    use crate::database::test_support::{insert_coupon, memory_db};
    use actix_web::{App, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn lookup_reports_rejection_tag_after_last_use() {
        let db = memory_db().await;
        insert_coupon(&db, "ONCE0001", Some(1), None).await;
        let coupons = CouponService::new(db.clone(), LoyaltyConfig::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(coupons.clone()))
                .service(web::scope("/api/v1").configure(coupon_code_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/coupon-codes/once0001")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["current_uses"], 0);
        assert_eq!(body["data"]["is_active"], true);

        coupons.consume("ONCE0001", Utc::now()).await.unwrap();

        let req = test::TestRequest::get()
            .uri("/api/v1/coupon-codes/ONCE0001")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "coupon_exhausted");

        let req = test::TestRequest::get()
            .uri("/api/v1/coupon-codes/MISSING1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn quote_returns_discounted_total() {
        let db = memory_db().await;
        insert_coupon(&db, "TENOFF00", None, None).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CouponService::new(
                    db,
                    LoyaltyConfig::default(),
                )))
                .service(web::scope("/api/v1").configure(coupon_code_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/coupon-codes/quote")
            .set_json(json!({"code": "TENOFF00", "restaurant_id": 4, "order_total": 20.0}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["discount_amount"], 200);
        assert_eq!(body["data"]["final_total"], 1800);
    }
}
