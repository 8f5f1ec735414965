use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::{AdminRole, SuccessResponse};
use crate::auth::CurrentAdmin;
use crate::security::jwt::{self, REALM_CUSTOMER};
use crate::security::password::hash_password;
use crate::shared::schema::customers;
use crate::shared::state::AppState;
use crate::shared::utils::{api_error, db_error, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            email: c.email,
            full_name: c.full_name,
            phone: c.phone,
            address: c.address,
            is_active: c.is_active,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() || req.full_name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Email, password and name are required",
        ));
    }

    let mut conn = state.conn.get().map_err(db_error)?;

    let existing: i64 = customers::table
        .filter(customers::email.eq(&req.email))
        .count()
        .get_result(&mut conn)
        .map_err(db_error)?;
    if existing > 0 {
        return Err(api_error(
            StatusCode::CONFLICT,
            "An account with that email already exists",
        ));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4(),
        email: req.email,
        password_hash,
        full_name: req.full_name,
        phone: req.phone,
        address: req.address,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(customers::table)
        .values(&customer)
        .execute(&mut conn)
        .map_err(db_error)?;

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

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CustomerResponse>>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = customers::table.into_boxed();
    if let Some(search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            customers::full_name
                .ilike(pattern.clone())
                .or(customers::email.ilike(pattern)),
        );
    }

    let rows: Vec<Customer> = q
        .order(customers::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let customer: Customer = customers::table
        .filter(customers::id.eq(id))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Customer not found"))?;

    Ok(Json(customer.into()))
}

pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let now = Utc::now();
    if let Some(full_name) = req.full_name {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::full_name.eq(full_name))
            .execute(&mut conn)
            .map_err(db_error)?;
    }
    if let Some(phone) = req.phone {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::phone.eq(Some(phone)))
            .execute(&mut conn)
            .map_err(db_error)?;
    }
    if let Some(address) = req.address {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::address.eq(Some(address)))
            .execute(&mut conn)
            .map_err(db_error)?;
    }
    diesel::update(customers::table.filter(customers::id.eq(id)))
        .set(customers::updated_at.eq(now))
        .execute(&mut conn)
        .map_err(db_error)?;

    let customer: Customer = customers::table
        .filter(customers::id.eq(id))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Customer not found"))?;

    Ok(Json(customer.into()))
}

pub async fn deactivate_customer(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    admin.require(AdminRole::Admin)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let updated = diesel::update(customers::table.filter(customers::id.eq(id)))
        .set((
            customers::is_active.eq(false),
            customers::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    if updated == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "Customer not found"));
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: Some("Customer deactivated".to_string()),
    }))
}

pub fn configure_customers_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/customers/register", post(register))
        .route("/api/admin/customers", get(list_customers))
        .route(
            "/api/admin/customers/:id",
            get(get_customer)
                .put(update_customer)
                .delete(deactivate_customer),
        )
}
