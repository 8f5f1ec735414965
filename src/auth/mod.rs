//! Portal authentication: email+password login for customers and admins,
//! bearer-token extractors for handlers.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::admin::{AdminRole, AdminUser, AdminUserResponse};
use crate::customers::{Customer, CustomerResponse};
use crate::security::jwt::{self, REALM_ADMIN, REALM_CUSTOMER};
use crate::security::password::verify_password;
use crate::shared::schema::{admin_users, customers};
use crate::shared::state::AppState;
use crate::shared::utils::{api_error, db_error, ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ===== Identity extractors =====

/// Customer identity taken from a bearer token.
#[derive(Debug, Clone)]
pub struct CurrentCustomer {
    pub id: Uuid,
    pub email: String,
}

/// Admin identity taken from a bearer token, role included.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub id: Uuid,
    pub email: String,
    pub role: AdminRole,
}

impl CurrentAdmin {
    /// Gate for admin endpoints. Numeric level comparison, so `admin`
    /// clears every gate, `technician` only its own.
    pub fn require(&self, required: AdminRole) -> Result<(), ApiError> {
        if self.role.allows(required) {
            Ok(())
        } else {
            Err(api_error(
                StatusCode::FORBIDDEN,
                format!("Requires {} role", required.as_str()),
            ))
        }
    }
}

/// Customer identity when present; never rejects. The contact form uses this
/// to decide between opening a ticket and prompting for signup.
#[derive(Debug, Clone)]
pub struct MaybeCustomer(pub Option<CurrentCustomer>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn customer_from_parts(parts: &Parts, state: &AppState) -> Option<CurrentCustomer> {
    let token = bearer_token(parts)?;
    let claims = jwt::decode_token(&state.config.jwt_secret, token).ok()?;
    if claims.realm != REALM_CUSTOMER {
        return None;
    }
    let id = claims.subject_id().ok()?;
    Some(CurrentCustomer {
        id,
        email: claims.email,
    })
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentCustomer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        customer_from_parts(parts, state)
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Authentication required"))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeCustomer {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeCustomer(customer_from_parts(parts, state)))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || api_error(StatusCode::UNAUTHORIZED, "Authentication required");
        let token = bearer_token(parts).ok_or_else(unauthorized)?;
        let claims =
            jwt::decode_token(&state.config.jwt_secret, token).map_err(|_| unauthorized())?;
        if claims.realm != REALM_ADMIN {
            return Err(unauthorized());
        }
        let id = claims.subject_id().map_err(|_| unauthorized())?;
        let role = claims
            .role
            .as_deref()
            .and_then(AdminRole::from_name)
            .ok_or_else(unauthorized)?;
        Ok(CurrentAdmin {
            id,
            email: claims.email,
            role,
        })
    }
}

// ===== Handlers =====

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let customer: Customer = customers::table
        .filter(customers::email.eq(&req.email))
        .filter(customers::is_active.eq(true))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    if !verify_password(&req.password, &customer.password_hash) {
        warn!("Failed customer login for {}", req.email);
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    let token = jwt::issue_token(
        &state.config.jwt_secret,
        customer.id,
        REALM_CUSTOMER,
        &customer.email,
        None,
    )
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "token": token,
        "customer": CustomerResponse::from(customer),
    })))
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let admin: AdminUser = admin_users::table
        .filter(admin_users::email.eq(&req.email))
        .filter(admin_users::is_active.eq(true))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    if !verify_password(&req.password, &admin.password_hash) {
        warn!("Failed admin login for {}", req.email);
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    diesel::update(admin_users::table.filter(admin_users::id.eq(admin.id)))
        .set(admin_users::last_login.eq(Some(Utc::now())))
        .execute(&mut conn)
        .map_err(db_error)?;

    let token = jwt::issue_token(
        &state.config.jwt_secret,
        admin.id,
        REALM_ADMIN,
        &admin.email,
        Some(&admin.role),
    )
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "token": token,
        "admin": AdminUserResponse::from(admin),
    })))
}

pub async fn logout() -> Json<serde_json::Value> {
    // Tokens are stateless; the client discards its copy.
    Json(serde_json::json!({ "success": true }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
) -> Result<Json<CustomerResponse>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let customer: Customer = customers::table
        .filter(customers::id.eq(current.id))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Customer not found"))?;

    Ok(Json(customer.into()))
}

pub async fn admin_me(
    State(state): State<Arc<AppState>>,
    current: CurrentAdmin,
) -> Result<Json<AdminUserResponse>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let admin: AdminUser = admin_users::table
        .filter(admin_users::id.eq(current.id))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Admin not found"))?;

    Ok(Json(admin.into()))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/admin/login", post(admin_login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/admin/me", get(admin_me))
}
