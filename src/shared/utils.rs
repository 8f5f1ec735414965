use axum::{http::StatusCode, Json};
use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_conn(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

pub type ApiError = (StatusCode, Json<serde_json::Value>);

/// Failure envelope every handler returns: `{"success": false, "error": ...}`.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": message.into() })),
    )
}

pub fn db_error(e: impl std::fmt::Display) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_envelope_shape() {
        let (status, Json(body)) = api_error(StatusCode::NOT_FOUND, "Ticket not found");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Ticket not found");
    }
}
