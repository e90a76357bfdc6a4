use crate::error::AppError;
use crate::utils::{JwtService, UserRole};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// Caller identity resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: UserRole,
}

struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    excluded_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/swagger-ui",
                "/swagger-ui/",
                "/api-docs/openapi.json",
                "/api/v1/loyalty/promotions",
            ],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/v1/coupon-codes/"],
            // Under a public prefix but still authenticated
            excluded_paths: vec!["/api/v1/coupon-codes/quote"],
        }
    }

    fn is_public(&self, method: &Method, path: &str) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|&excluded| path.starts_with(excluded))
        {
            return false;
        }
        // Public reads only.
        if method != Method::GET {
            return false;
        }
        if self.exact_paths.contains(&path) {
            return true;
        }
        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight
        if req.method() == Method::OPTIONS {
            return Box::pin(self.service.call(req));
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);

        let user = token
            .as_deref()
            .map(|t| self.jwt_service.verify_access_token(t))
            .transpose()
            .map(|claims| {
                claims.and_then(|c| {
                    c.sub.parse::<i64>().ok().map(|id| AuthUser { id, role: c.role })
                })
            });

        match user {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
                Box::pin(self.service.call(req))
            }
            // Anonymous access to public reads; a bad token is still rejected.
            Ok(None) if token.is_none() && self.public_paths.is_public(req.method(), req.path()) => {
                Box::pin(self.service.call(req))
            }
            Ok(None) if token.is_some() => {
                let error = AppError::AuthError("Invalid access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
            Ok(None) => {
                let error = AppError::AuthError("Missing access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
            Err(e) => {
                log::warn!("Rejected bearer token on {}: {}", req.path(), e);
                let error = AppError::AuthError("Invalid access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

/// Identity inserted by [`AuthMiddleware`]; `None` on anonymous public routes.
pub fn current_user(req: &HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().copied()
}

/// Same as [`current_user`] but fails for anonymous callers.
pub fn require_user(req: &HttpRequest) -> Result<AuthUser, AppError> {
    current_user(req).ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

pub fn require_admin(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let user = require_user(req)?;
    if user.role != UserRole::Admin {
        return Err(AppError::PermissionDenied);
    }
    Ok(user)
}
