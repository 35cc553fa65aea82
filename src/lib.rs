//! Booking Slot Service
//!
//! Turns an administrator's weekly availability rules into bookable
//! half-hour calendar slots and serves them, together with bookings, over a
//! small HTTP API, along with contact form messages.
//!
//! # Modules
//!
//! - `services::expander`: pure expansion of recurrence rules into slots
//! - `services::reconcile`: idempotent insertion of missing slots
//! - `services::bookings`: booking creation and status changes
//! - `services::contact`: contact form messages
//! - `store`: slot, booking, contact and rule store traits with memory and
//!   file backends
//! - `handlers`, `routes`: axum HTTP surface
//!
//! # Time handling
//!
//! All dates and times are naive wall-clock values in the service's local
//! calendar. Clients are expected to share that timezone.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;


// Re-export the main API types for ease of use
pub use config::AppConfig;
pub use handlers::api::AppState;
pub use models::rule::{RecurrenceRule, Validity};
pub use models::slot::GeneratedSlot;
pub use routes::create_router;
pub use services::expander::expand;
pub use services::reconcile::reconcile;
pub use store::{create_stores, SlotStore, Stores};
