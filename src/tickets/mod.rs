use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::admin::AdminRole;
use crate::auth::{CurrentAdmin, CurrentCustomer};
use crate::drive::{self, LinkAudience};
use crate::shared::schema::{service_tickets, ticket_attachments, ticket_messages};
use crate::shared::state::AppState;
use crate::shared::utils::{api_error, db_error, ApiError};

pub const STATUS_NEW: &str = "new";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const PRIORITY_LOW: &str = "low";
pub const PRIORITY_NORMAL: &str = "normal";
pub const PRIORITY_HIGH: &str = "high";

pub fn is_valid_status(status: &str) -> bool {
    matches!(
        status,
        STATUS_NEW | STATUS_IN_PROGRESS | STATUS_COMPLETED | STATUS_CANCELLED
    )
}

pub fn is_valid_priority(priority: &str) -> bool {
    matches!(priority, PRIORITY_LOW | PRIORITY_NORMAL | PRIORITY_HIGH)
}

/// Display label for a ticket status, used by the rendered pages.
pub fn status_label(status: &str) -> &'static str {
    match status {
        STATUS_NEW => "New",
        STATUS_IN_PROGRESS => "In Progress",
        STATUS_COMPLETED => "Completed",
        STATUS_CANCELLED => "Cancelled",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = service_tickets)]
pub struct ServiceTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub customer_id: Uuid,
    pub subject: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub assigned_to: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = ticket_messages)]
pub struct TicketMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_customer_id: Option<Uuid>,
    pub sender_admin_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = ticket_attachments)]
pub struct TicketAttachment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub file_name: String,
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub assignee_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketWithThread {
    pub ticket: ServiceTicket,
    pub messages: Vec<TicketMessage>,
    pub attachments: Vec<TicketAttachment>,
}

#[derive(Debug, Serialize)]
pub struct TicketStats {
    pub total: i64,
    pub new: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
}

pub fn format_ticket_number(seq: i64) -> String {
    format!("SVC-{:06}", seq)
}

fn generate_ticket_number(conn: &mut PgConnection) -> String {
    let count: i64 = service_tickets::table
        .count()
        .get_result(conn)
        .unwrap_or(0);
    format_ticket_number(count + 1)
}

/// Inserts a new ticket for a customer. Also used by the contact form when
/// an authenticated customer submits a request.
pub fn create_ticket_record(
    conn: &mut PgConnection,
    customer_id: Uuid,
    subject: String,
    description: Option<String>,
    priority: Option<String>,
) -> Result<ServiceTicket, diesel::result::Error> {
    let now = Utc::now();
    let priority = priority
        .filter(|p| is_valid_priority(p))
        .unwrap_or_else(|| PRIORITY_NORMAL.to_string());

    let ticket = ServiceTicket {
        id: Uuid::new_v4(),
        ticket_number: generate_ticket_number(conn),
        customer_id,
        subject,
        description,
        status: STATUS_NEW.to_string(),
        priority,
        assigned_to: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(service_tickets::table)
        .values(&ticket)
        .execute(conn)?;

    Ok(ticket)
}

fn load_ticket(conn: &mut PgConnection, id: Uuid) -> Result<ServiceTicket, ApiError> {
    service_tickets::table
        .filter(service_tickets::id.eq(id))
        .first(conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Ticket not found"))
}

fn load_owned_ticket(
    conn: &mut PgConnection,
    id: Uuid,
    customer_id: Uuid,
) -> Result<ServiceTicket, ApiError> {
    let ticket = load_ticket(conn, id)?;
    if ticket.customer_id != customer_id {
        return Err(api_error(StatusCode::NOT_FOUND, "Ticket not found"));
    }
    Ok(ticket)
}

// ===== Customer handlers =====

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Json(req): Json<CreateTicketRequest>,
) -> Result<Json<ServiceTicket>, ApiError> {
    if req.subject.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Subject is required"));
    }
    let mut conn = state.conn.get().map_err(db_error)?;

    let ticket = create_ticket_record(
        &mut conn,
        current.id,
        req.subject,
        req.description,
        req.priority,
    )
    .map_err(db_error)?;

    Ok(Json(ticket))
}

pub async fn list_my_tickets(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
) -> Result<Json<Vec<ServiceTicket>>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let tickets: Vec<ServiceTicket> = service_tickets::table
        .filter(service_tickets::customer_id.eq(current.id))
        .order(service_tickets::created_at.desc())
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(tickets))
}

fn load_thread(conn: &mut PgConnection, ticket: ServiceTicket) -> Result<TicketWithThread, ApiError> {
    let messages: Vec<TicketMessage> = ticket_messages::table
        .filter(ticket_messages::ticket_id.eq(ticket.id))
        .order(ticket_messages::created_at.asc())
        .load(conn)
        .map_err(db_error)?;

    let attachments: Vec<TicketAttachment> = ticket_attachments::table
        .filter(ticket_attachments::ticket_id.eq(ticket.id))
        .order(ticket_attachments::created_at.asc())
        .load(conn)
        .map_err(db_error)?;

    Ok(TicketWithThread {
        ticket,
        messages,
        attachments,
    })
}

pub async fn get_my_ticket(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketWithThread>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;
    let ticket = load_owned_ticket(&mut conn, id, current.id)?;
    Ok(Json(load_thread(&mut conn, ticket)?))
}

pub async fn add_message(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMessageRequest>,
) -> Result<Json<TicketMessage>, ApiError> {
    if req.body.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message body is required"));
    }
    let mut conn = state.conn.get().map_err(db_error)?;
    load_owned_ticket(&mut conn, id, current.id)?;

    let message = TicketMessage {
        id: Uuid::new_v4(),
        ticket_id: id,
        sender_customer_id: Some(current.id),
        sender_admin_id: None,
        body: req.body,
        created_at: Utc::now(),
    };

    diesel::insert_into(ticket_messages::table)
        .values(&message)
        .execute(&mut conn)
        .map_err(db_error)?;

    diesel::update(service_tickets::table.filter(service_tickets::id.eq(id)))
        .set(service_tickets::updated_at.eq(Utc::now()))
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(message))
}

async fn store_attachment(
    state: &AppState,
    ticket_id: Uuid,
    uploaded_by_admin: bool,
    multipart: &mut Multipart,
) -> Result<TicketAttachment, ApiError> {
    let drive_client = state
        .drive
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Storage is not configured"))?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid upload: {e}")))?
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file in upload"))?;

    let file_name = field
        .file_name()
        .unwrap_or("unnamed_file")
        .to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid upload: {e}")))?;

    let object_key = format!("tickets/{}/{}/{}", ticket_id, Uuid::new_v4(), file_name);
    let size_bytes = data.len() as i64;

    drive::put_object(
        drive_client,
        &state.bucket_name,
        &object_key,
        data.to_vec(),
        &content_type,
    )
    .await
    .map_err(|e| {
        error!("Attachment upload failed: {e}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(TicketAttachment {
        id: Uuid::new_v4(),
        ticket_id,
        file_name,
        object_key,
        content_type,
        size_bytes,
        uploaded_by_admin,
        created_at: Utc::now(),
    })
}

pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<TicketAttachment>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;
    load_owned_ticket(&mut conn, id, current.id)?;

    let attachment = store_attachment(&state, id, false, &mut multipart).await?;

    diesel::insert_into(ticket_attachments::table)
        .values(&attachment)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(attachment))
}

async fn attachment_link(
    state: &AppState,
    ticket_id: Uuid,
    attachment_id: Uuid,
    audience: LinkAudience,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let attachment: TicketAttachment = ticket_attachments::table
        .filter(ticket_attachments::id.eq(attachment_id))
        .filter(ticket_attachments::ticket_id.eq(ticket_id))
        .first(&mut conn)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Attachment not found"))?;

    let drive_client = state
        .drive
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Storage is not configured"))?;

    let url = drive::signed_download_url(
        drive_client,
        &state.bucket_name,
        &attachment.object_key,
        audience,
    )
    .await
    .map_err(|e| {
        error!("Failed to sign attachment URL: {e}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "success": true,
        "url": url,
        "expires_in": audience.expiry().as_secs(),
    })))
}

pub async fn my_attachment_url(
    State(state): State<Arc<AppState>>,
    current: CurrentCustomer,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    {
        let mut conn = state.conn.get().map_err(db_error)?;
        load_owned_ticket(&mut conn, id, current.id)?;
    }
    attachment_link(&state, id, attachment_id, LinkAudience::Customer).await
}

// ===== Admin handlers =====

pub async fn admin_list_tickets(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ServiceTicket>>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = service_tickets::table.into_boxed();
    if let Some(status) = query.status {
        q = q.filter(service_tickets::status.eq(status));
    }
    if let Some(priority) = query.priority {
        q = q.filter(service_tickets::priority.eq(priority));
    }
    if let Some(search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            service_tickets::subject
                .ilike(pattern.clone())
                .or(service_tickets::ticket_number.ilike(pattern)),
        );
    }

    let tickets: Vec<ServiceTicket> = q
        .order(service_tickets::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(tickets))
}

pub async fn admin_get_ticket(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketWithThread>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;
    let ticket = load_ticket(&mut conn, id)?;
    Ok(Json(load_thread(&mut conn, ticket)?))
}

pub async fn admin_change_status(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<ServiceTicket>, ApiError> {
    admin.require(AdminRole::Staff)?;
    if !is_valid_status(&req.status) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Unknown status: {}", req.status),
        ));
    }
    let mut conn = state.conn.get().map_err(db_error)?;

    let now = Utc::now();
    diesel::update(service_tickets::table.filter(service_tickets::id.eq(id)))
        .set((
            service_tickets::status.eq(&req.status),
            service_tickets::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    if req.status == STATUS_COMPLETED {
        diesel::update(service_tickets::table.filter(service_tickets::id.eq(id)))
            .set(service_tickets::completed_at.eq(Some(now)))
            .execute(&mut conn)
            .map_err(db_error)?;
    }

    let ticket = load_ticket(&mut conn, id)?;
    Ok(Json(ticket))
}

pub async fn admin_assign_ticket(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignTicketRequest>,
) -> Result<Json<ServiceTicket>, ApiError> {
    admin.require(AdminRole::Staff)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    diesel::update(service_tickets::table.filter(service_tickets::id.eq(id)))
        .set((
            service_tickets::assigned_to.eq(Some(req.assignee_id)),
            service_tickets::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    let ticket = load_ticket(&mut conn, id)?;
    Ok(Json(ticket))
}

pub async fn admin_add_message(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMessageRequest>,
) -> Result<Json<TicketMessage>, ApiError> {
    admin.require(AdminRole::Technician)?;
    if req.body.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message body is required"));
    }
    let mut conn = state.conn.get().map_err(db_error)?;
    load_ticket(&mut conn, id)?;

    let message = TicketMessage {
        id: Uuid::new_v4(),
        ticket_id: id,
        sender_customer_id: None,
        sender_admin_id: Some(admin.id),
        body: req.body,
        created_at: Utc::now(),
    };

    diesel::insert_into(ticket_messages::table)
        .values(&message)
        .execute(&mut conn)
        .map_err(db_error)?;

    diesel::update(service_tickets::table.filter(service_tickets::id.eq(id)))
        .set(service_tickets::updated_at.eq(Utc::now()))
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(message))
}

pub async fn admin_upload_attachment(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<TicketAttachment>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;
    load_ticket(&mut conn, id)?;

    let attachment = store_attachment(&state, id, true, &mut multipart).await?;

    diesel::insert_into(ticket_attachments::table)
        .values(&attachment)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(attachment))
}

pub async fn admin_attachment_url(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    admin.require(AdminRole::Technician)?;
    attachment_link(&state, id, attachment_id, LinkAudience::Admin).await
}

pub async fn admin_ticket_stats(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
) -> Result<Json<TicketStats>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let count_for = |status: &str, conn: &mut PgConnection| -> i64 {
        service_tickets::table
            .filter(service_tickets::status.eq(status))
            .count()
            .get_result(conn)
            .unwrap_or(0)
    };

    let total: i64 = service_tickets::table
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);

    let stats = TicketStats {
        total,
        new: count_for(STATUS_NEW, &mut conn),
        in_progress: count_for(STATUS_IN_PROGRESS, &mut conn),
        completed: count_for(STATUS_COMPLETED, &mut conn),
        cancelled: count_for(STATUS_CANCELLED, &mut conn),
    };

    Ok(Json(stats))
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_my_tickets).post(create_ticket))
        .route("/api/tickets/:id", get(get_my_ticket))
        .route("/api/tickets/:id/messages", post(add_message))
        .route("/api/tickets/:id/attachments", post(upload_attachment))
        .route(
            "/api/tickets/:id/attachments/:attachment_id/url",
            get(my_attachment_url),
        )
        .route("/api/admin/tickets", get(admin_list_tickets))
        .route("/api/admin/tickets/stats", get(admin_ticket_stats))
        .route("/api/admin/tickets/:id", get(admin_get_ticket))
        .route("/api/admin/tickets/:id/status", put(admin_change_status))
        .route("/api/admin/tickets/:id/assign", put(admin_assign_ticket))
        .route("/api/admin/tickets/:id/messages", post(admin_add_message))
        .route(
            "/api/admin/tickets/:id/attachments",
            post(admin_upload_attachment),
        )
        .route(
            "/api/admin/tickets/:id/attachments/:attachment_id/url",
            get(admin_attachment_url),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label("new"), "New");
        assert_eq!(status_label("in_progress"), "In Progress");
        assert_eq!(status_label("completed"), "Completed");
        assert_eq!(status_label("cancelled"), "Cancelled");
        assert_eq!(status_label("archived"), "Unknown");
    }

    #[test]
    fn test_valid_statuses() {
        for status in [STATUS_NEW, STATUS_IN_PROGRESS, STATUS_COMPLETED, STATUS_CANCELLED] {
            assert!(is_valid_status(status));
        }
        assert!(!is_valid_status("open"));
    }

    #[test]
    fn test_valid_priorities() {
        for priority in [PRIORITY_LOW, PRIORITY_NORMAL, PRIORITY_HIGH] {
            assert!(is_valid_priority(priority));
        }
        assert!(!is_valid_priority("urgent"));
    }

    #[test]
    fn test_ticket_number_format() {
        assert_eq!(format_ticket_number(1), "SVC-000001");
        assert_eq!(format_ticket_number(42), "SVC-000042");
        assert_eq!(format_ticket_number(1_234_567), "SVC-1234567");
    }
}
