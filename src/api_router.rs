//! API Router
//!
//! Combines the REST endpoints from all portal modules into a unified router.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

/// Configure all API routes from all modules
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::auth::configure_auth_routes())
        .merge(crate::customers::configure_customers_routes())
        .merge(crate::tickets::configure_tickets_routes())
        .merge(crate::appointments::configure_appointments_routes())
        .merge(crate::contact::configure_contact_routes())
        .merge(crate::admin::configure_admin_routes())
}
