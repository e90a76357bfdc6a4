use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;

use loyalty_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    let loyalty = config.loyalty.clone();
    let points_service = PointsService::new(pool.clone(), loyalty.clone());
    let promotion_service = PromotionService::new(pool.clone(), loyalty.clone());
    let reward_service = RewardService::new(pool.clone());
    let coupon_service = CouponService::new(pool.clone(), loyalty.clone());
    let redemption_service =
        RedemptionService::new(pool.clone(), loyalty.clone(), coupon_service.clone());
    let earning_service =
        EarningService::new(pool.clone(), loyalty.clone(), promotion_service.clone());
    let dashboard_service = DashboardService::new(
        points_service.clone(),
        promotion_service.clone(),
        reward_service.clone(),
        redemption_service.clone(),
        loyalty.clone(),
    );

    log::info!(
        "Loyalty settings: divisor={} cents, atomic_redemption_use={}, utc_offset={}min",
        loyalty.points_divisor_cents,
        loyalty.atomic_redemption_use,
        loyalty.utc_offset_minutes
    );
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .app_data(web::Data::new(points_service.clone()))
            .app_data(web::Data::new(promotion_service.clone()))
            .app_data(web::Data::new(reward_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(redemption_service.clone()))
            .app_data(web::Data::new(earning_service.clone()))
            .app_data(web::Data::new(dashboard_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::loyalty_config)
                    .configure(handlers::coupon_code_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
