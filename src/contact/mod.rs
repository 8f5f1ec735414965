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
use tracing::warn;
use uuid::Uuid;

use crate::admin::{AdminRole, SuccessResponse};
use crate::auth::{CurrentAdmin, MaybeCustomer};
use crate::shared::schema::contact_submissions;
use crate::shared::state::AppState;
use crate::shared::utils::{api_error, db_error, ApiError};
use crate::tickets;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = contact_submissions)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub processed: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body posted to the third-party form relay.
pub fn relay_payload(name: &str, email: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "email": email,
        "message": message,
    })
}

pub async fn forward_to_relay(
    http: &reqwest::Client,
    relay_url: &str,
    payload: &serde_json::Value,
) -> Result<(), reqwest::Error> {
    http.post(relay_url)
        .json(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    MaybeCustomer(customer): MaybeCustomer,
    Json(req): Json<SubmitContactRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.message.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Name, email and message are required",
        ));
    }

    let mut conn = state.conn.get().map_err(db_error)?;

    let submission = ContactSubmission {
        id: Uuid::new_v4(),
        name: req.name.clone(),
        email: req.email.clone(),
        phone: req.phone.clone(),
        message: req.message.clone(),
        processed: false,
        processed_at: None,
        created_at: Utc::now(),
    };

    diesel::insert_into(contact_submissions::table)
        .values(&submission)
        .execute(&mut conn)
        .map_err(db_error)?;

    // Relay delivery is best-effort and never blocks the response.
    if let Some(relay_url) = state.config.contact_relay_url.clone() {
        let http = state.http.clone();
        let payload = relay_payload(&req.name, &req.email, &req.message);
        tokio::spawn(async move {
            if let Err(e) = forward_to_relay(&http, &relay_url, &payload).await {
                warn!("Contact relay delivery failed: {e}");
            }
        });
    }

    match customer {
        Some(current) => {
            let ticket = tickets::create_ticket_record(
                &mut conn,
                current.id,
                format!("Contact form message from {}", req.name),
                Some(req.message),
                req.priority,
            )
            .map_err(db_error)?;

            Ok(Json(serde_json::json!({
                "success": true,
                "submission_id": submission.id,
                "ticket": ticket,
            })))
        }
        None => Ok(Json(serde_json::json!({
            "success": true,
            "submission_id": submission.id,
            "ticket": null,
            "signup_prompt": true,
        }))),
    }
}

pub async fn admin_list_submissions(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = contact_submissions::table.into_boxed();
    if let Some(processed) = query.processed {
        q = q.filter(contact_submissions::processed.eq(processed));
    }

    let rows: Vec<ContactSubmission> = q
        .order(contact_submissions::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(rows))
}

pub async fn admin_mark_processed(
    State(state): State<Arc<AppState>>,
    admin: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    admin.require(AdminRole::Technician)?;
    let mut conn = state.conn.get().map_err(db_error)?;

    let updated = diesel::update(contact_submissions::table.filter(contact_submissions::id.eq(id)))
        .set((
            contact_submissions::processed.eq(true),
            contact_submissions::processed_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    if updated == 0 {
        return Err(api_error(StatusCode::NOT_FOUND, "Submission not found"));
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: Some("Submission marked processed".to_string()),
    }))
}

pub fn configure_contact_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contact", post(submit_contact))
        .route(
            "/api/admin/contact-submissions",
            get(admin_list_submissions),
        )
        .route(
            "/api/admin/contact-submissions/:id/processed",
            put(admin_mark_processed),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_payload_shape() {
        let payload = relay_payload("Dana", "dana@example.com", "My router is down");
        assert_eq!(payload["name"], "Dana");
        assert_eq!(payload["email"], "dana@example.com");
        assert_eq!(payload["message"], "My router is down");
    }

    #[tokio::test]
    async fn test_forward_to_relay_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/relay")
            .match_header("content-type", "application/json")
            .with_status(200)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let payload = relay_payload("Dana", "dana@example.com", "hello");
        let url = format!("{}/relay", server.url());
        forward_to_relay(&http, &url, &payload).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forward_to_relay_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/relay")
            .with_status(500)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let payload = relay_payload("Dana", "dana@example.com", "hello");
        let url = format!("{}/relay", server.url());
        assert!(forward_to_relay(&http, &url, &payload).await.is_err());
    }
}
