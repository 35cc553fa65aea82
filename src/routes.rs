use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::api::{
    add_slot, apply_rules, create_booking, delete_slot, get_rules, list_bookings, list_contacts,
    list_slots, replace_rules, submit_contact, update_booking_status, update_contact_status,
    AppState,
};
use crate::handlers::health::health_check;

pub fn create_router(app_state: Arc<AppState>, admin_enabled: bool) -> Router {
    let mut router = Router::new();

    // Health check and the public booking and contact surface are always available
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/slots", get(list_slots))
        .route("/bookings", post(create_booking))
        .route("/contact", post(submit_contact));
    router = router.merge(public_routes);

    if admin_enabled {
        let admin_routes = Router::new()
            .route("/admin/rules", get(get_rules).put(replace_rules))
            .route("/admin/slots", post(add_slot))
            .route("/admin/slots/apply", post(apply_rules))
            .route("/admin/slots/:slot_id", delete(delete_slot))
            .route("/admin/bookings", get(list_bookings))
            .route("/admin/bookings/:booking_id/status", post(update_booking_status))
            .route("/admin/messages", get(list_contacts))
            .route("/admin/messages/:message_id/status", post(update_contact_status));

        router = router.merge(admin_routes);

        info!("Admin routes enabled");
    } else {
        info!("Running in production mode without admin token - admin routes not exposed");
    }

    router.with_state(app_state)
}
