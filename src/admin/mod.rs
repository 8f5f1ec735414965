//! Admin accounts and the portal role hierarchy.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::CurrentAdmin;
use crate::shared::schema::admin_users;
use crate::shared::state::AppState;
use crate::shared::utils::{api_error, db_error, ApiError};

/// Portal staff roles, ordered. Access checks compare numeric levels, so an
/// `admin` passes every gate a `technician` passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminRole {
    Technician,
    Staff,
    Admin,
}

impl AdminRole {
    pub fn level(&self) -> u8 {
        match self {
            Self::Technician => 1,
            Self::Staff => 2,
            Self::Admin => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technician => "technician",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "technician" => Some(Self::Technician),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// True iff this role meets or exceeds the required role.
    pub fn allows(&self, required: AdminRole) -> bool {
        self.level() >= required.level()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = admin_users)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AdminUser> for AdminUserResponse {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: Option<String>,
}

pub async fn list_admin_users(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    admin.require(AdminRole::Admin)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let users: Vec<AdminUser> = admin_users::table
        .order(admin_users::created_at.asc())
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn create_admin_user(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Json(req): Json<CreateAdminRequest>,
) -> Result<Json<AdminUserResponse>, ApiError> {
    admin.require(AdminRole::Admin)?;
    let Some(role) = AdminRole::from_name(&req.role) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Unknown role: {}", req.role),
        ));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let existing: i64 = admin_users::table
        .filter(admin_users::email.eq(&req.email))
        .count()
        .get_result(&mut conn)
        .map_err(db_error)?;
    if existing > 0 {
        return Err(api_error(
            StatusCode::CONFLICT,
            "An admin with that email already exists",
        ));
    }

    let password_hash = crate::security::password::hash_password(&req.password)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let now = Utc::now();
    let user = AdminUser {
        id: Uuid::new_v4(),
        email: req.email,
        password_hash,
        display_name: req.display_name,
        role: role.as_str().to_string(),
        is_active: true,
        last_login: None,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(admin_users::table)
        .values(&user)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(user.into()))
}

pub async fn set_admin_role(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    admin.require(AdminRole::Admin)?;
    let Some(role) = AdminRole::from_name(&req.role) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Unknown role: {}", req.role),
        ));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let updated = diesel::update(admin_users::table.filter(admin_users::id.eq(id)))
        .set((
            admin_users::role.eq(role.as_str()),
            admin_users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    if updated == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "Admin not found"));
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: Some(format!("Role updated to {}", role.as_str())),
    }))
}

pub async fn deactivate_admin_user(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    admin.require(AdminRole::Admin)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let updated = diesel::update(admin_users::table.filter(admin_users::id.eq(id)))
        .set((
            admin_users::is_active.eq(false),
            admin_users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    if updated == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "Admin not found"));
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: Some("Admin deactivated".to_string()),
    }))
}

pub fn configure_admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin/users",
            get(list_admin_users).post(create_admin_user),
        )
        .route("/api/admin/users/:id/role", put(set_admin_role))
        .route(
            "/api/admin/users/:id",
            axum::routing::delete(deactivate_admin_user),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy_all_pairs() {
        use AdminRole::{Admin, Staff, Technician};
        let cases = [
            (Admin, Admin, true),
            (Admin, Staff, true),
            (Admin, Technician, true),
            (Staff, Admin, false),
            (Staff, Staff, true),
            (Staff, Technician, true),
            (Technician, Admin, false),
            (Technician, Staff, false),
            (Technician, Technician, true),
        ];
        for (current, required, expected) in cases {
            assert_eq!(
                current.allows(required),
                expected,
                "{:?} vs {:?}",
                current,
                required
            );
        }
    }

    #[test]
    fn test_role_names_roundtrip() {
        for role in [AdminRole::Technician, AdminRole::Staff, AdminRole::Admin] {
            assert_eq!(AdminRole::from_name(role.as_str()), Some(role));
        }
        assert_eq!(AdminRole::from_name("superuser"), None);
    }
}
