use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::AdminRole;
use crate::auth::{CurrentAdmin, CurrentCustomer};
use crate::shared::schema::{appointment_cancellation_requests, appointments};
use crate::shared::state::AppState;
use crate::shared::utils::{api_error, db_error, ApiError};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const REVIEW_PENDING: &str = "pending";
pub const REVIEW_APPROVED: &str = "approved";
pub const REVIEW_REJECTED: &str = "rejected";

/// Terminal review status for a cancellation request.
pub fn review_status(approve: bool) -> &'static str {
    if approve {
        REVIEW_APPROVED
    } else {
        REVIEW_REJECTED
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = appointments)]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service: String,
    pub notes: Option<String>,
    pub requested_for: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = appointment_cancellation_requests)]
pub struct CancellationRequest {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub customer_id: Uuid,
    pub reason: Option<String>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub service: String,
    pub notes: Option<String>,
    pub requested_for: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CancellationRequestBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn load_appointment(conn: &mut PgConnection, id: Uuid) -> Result<Appointment, ApiError> {
    appointments::table
        .filter(appointments::id.eq(id))
        .first(conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Appointment not found"))
}

// ===== Customer handlers =====

pub async fn request_appointment(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    if req.service.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Service is required"));
    }
    let mut conn = state.conn.get().map_err(db_error)?;

    let now = Utc::now();
    let appointment = Appointment {
        id: Uuid::new_v4(),
        customer_id: current.id,
        service: req.service,
        notes: req.notes,
        requested_for: req.requested_for,
        status: STATUS_PENDING.to_string(),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(appointments::table)
        .values(&appointment)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(appointment))
}

pub async fn list_my_appointments(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<Appointment> = appointments::table
        .filter(appointments::customer_id.eq(current.id))
        .order(appointments::requested_for.desc())
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(rows))
}

pub async fn request_cancellation(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Path(id): Path<Uuid>,
    Json(req): Json<CancellationRequestBody>,
) -> Result<Json<CancellationRequest>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let appointment = load_appointment(&mut conn, id)?;
    if appointment.customer_id != current.id {
        return Err(api_error(StatusCode::NOT_FOUND, "Appointment not found"));
    }
    if appointment.status == STATUS_CANCELLED {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Appointment is already cancelled",
        ));
    }

    let request = CancellationRequest {
        id: Uuid::new_v4(),
        appointment_id: id,
        customer_id: current.id,
        reason: req.reason,
        status: REVIEW_PENDING.to_string(),
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now(),
    };

    diesel::insert_into(appointment_cancellation_requests::table)
        .values(&request)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(request))
}

// ===== Admin handlers =====

pub async fn admin_list_appointments(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = appointments::table.into_boxed();
    if let Some(status) = query.status {
        q = q.filter(appointments::status.eq(status));
    }

    let rows: Vec<Appointment> = q
        .order(appointments::requested_for.asc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(rows))
}

pub async fn admin_confirm_appointment(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let appointment = load_appointment(&mut conn, id)?;
    if appointment.status != STATUS_PENDING {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Only pending appointments can be confirmed",
        ));
    }

    diesel::update(appointments::table.filter(appointments::id.eq(id)))
        .set((
            appointments::status.eq(STATUS_CONFIRMED),
            appointments::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(load_appointment(&mut conn, id)?))
}

pub async fn admin_complete_appointment(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let appointment = load_appointment(&mut conn, id)?;
    if appointment.status != STATUS_CONFIRMED {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Only confirmed appointments can be completed",
        ));
    }

    diesel::update(appointments::table.filter(appointments::id.eq(id)))
        .set((
            appointments::status.eq(STATUS_COMPLETED),
            appointments::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(load_appointment(&mut conn, id)?))
}

pub async fn admin_list_cancellation_requests(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
) -> Result<Json<Vec<CancellationRequest>>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<CancellationRequest> = appointment_cancellation_requests::table
        .order((
            appointment_cancellation_requests::status
                .eq(REVIEW_PENDING)
                .desc(),
            appointment_cancellation_requests::created_at.asc(),
        ))
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(rows))
}

/// Approving cancels the linked appointment and then marks the request
/// approved, as two independent updates. Rejecting touches only the request.
pub async fn admin_review_cancellation(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<CancellationRequest>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let request: CancellationRequest = appointment_cancellation_requests::table
        .filter(appointment_cancellation_requests::id.eq(id))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Cancellation request not found"))?;

    if request.status != REVIEW_PENDING {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Request has already been reviewed",
        ));
    }

    let now = Utc::now();

    if req.approve {
        diesel::update(appointments::table.filter(appointments::id.eq(request.appointment_id)))
            .set((
                appointments::status.eq(STATUS_CANCELLED),
                appointments::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .map_err(db_error)?;
    }

    diesel::update(
        appointment_cancellation_requests::table
            .filter(appointment_cancellation_requests::id.eq(id)),
    )
    .set((
        appointment_cancellation_requests::status.eq(review_status(req.approve)),
        appointment_cancellation_requests::reviewed_by.eq(Some(admin.id)),
        appointment_cancellation_requests::reviewed_at.eq(Some(now)),
    ))
    .execute(&mut conn)
    .map_err(db_error)?;

    let updated: CancellationRequest = appointment_cancellation_requests::table
        .filter(appointment_cancellation_requests::id.eq(id))
        .first(&mut conn)
        .map_err(db_error)?;

    Ok(Json(updated))
}

pub fn configure_appointments_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/appointments",
            get(list_my_appointments).post(request_appointment),
        )
        .route("/api/appointments/:id/cancellation", post(request_cancellation))
        .route("/api/admin/appointments", get(admin_list_appointments))
        .route(
            "/api/admin/appointments/:id/confirm",
            put(admin_confirm_appointment),
        )
        .route(
            "/api/admin/appointments/:id/complete",
            put(admin_complete_appointment),
        )
        .route(
            "/api/admin/cancellation-requests",
            get(admin_list_cancellation_requests),
        )
        .route(
            "/api/admin/cancellation-requests/:id",
            put(admin_review_cancellation),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_status_mapping() {
        assert_eq!(review_status(true), REVIEW_APPROVED);
        assert_eq!(review_status(false), REVIEW_REJECTED);
    }
}
