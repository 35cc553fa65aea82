use axum::{
    extract::{Json as ExtractJson, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::ServiceError;
use crate::models::booking::{Booking, BookingRequest, StatusUpdate};
use crate::models::common::{AdminQueryParams, ApplyRange, DateRangeParams, NewSlotRequest};
use crate::models::contact::{ContactRequest, ContactStatusUpdate, ContactSubmission};
use crate::models::rule::{format_clock, parse_clock, RecurrenceRule};
use crate::models::slot::{ReconcileReport, TimeSlot};
use crate::services::{bookings, contact, reconcile};
use crate::store::Stores;

// AppState struct containing shared resources
pub struct AppState {
    pub stores: Stores,
    pub admin_auth_token: Option<String>,
    pub max_apply_days: i64,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

// Log a service error and turn it into the matching status code
fn error_status(context: &str, err: ServiceError) -> StatusCode {
    let status = err.status_code();
    if status.is_server_error() {
        error!("{}: {}", context, err);
    } else {
        warn!("{}: {}", context, err);
    }
    status
}

// Store backends may do file I/O, so store work runs on the blocking pool
async fn with_stores<T, F>(state: &AppState, task: F) -> Result<T, StatusCode>
where
    F: FnOnce(Stores) -> T + Send + 'static,
    T: Send + 'static,
{
    let stores = state.stores.clone();
    tokio::task::spawn_blocking(move || task(stores))
        .await
        .map_err(|e| {
            error!("Store task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn check_admin(state: &AppState, params: &AdminQueryParams) -> Result<(), StatusCode> {
    let Some(expected) = &state.admin_auth_token else {
        return Ok(());
    };

    match &params.auth {
        Some(provided) if provided == expected => Ok(()),
        Some(_) => {
            warn!("Rejected admin request with invalid auth token");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            warn!("Rejected admin request without auth token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

// Public slot listing, optionally restricted to a date range
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<Vec<TimeSlot>>, StatusCode> {
    info!(
        "Received request to list slots from {:?} to {:?}",
        params.start_date, params.end_date
    );

    with_stores(&state, move |stores| stores.slots.list(params.start_date, params.end_date))
        .await?
        .map(Json)
        .map_err(|e| error_status("Failed to list slots", e.into()))
}

// Public booking endpoint
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), StatusCode> {
    info!("Received booking request for {} {}", request.date, request.time);

    with_stores(&state, move |stores| {
        bookings::create_booking(stores.slots.as_ref(), stores.bookings.as_ref(), request, now())
    })
    .await?
    .map(|booking| (StatusCode::CREATED, Json(booking)))
    .map_err(|e| error_status("Failed to create booking", e))
}

// Public contact form endpoint
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<ContactRequest>,
) -> Result<(StatusCode, Json<ContactSubmission>), StatusCode> {
    info!("Received contact message from {}", request.email);

    with_stores(&state, move |stores| {
        contact::submit_contact(stores.contacts.as_ref(), request, now())
    })
    .await?
    .map(|submission| (StatusCode::CREATED, Json(submission)))
    .map_err(|e| error_status("Failed to store contact message", e))
}

pub async fn get_rules(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminQueryParams>,
) -> Result<Json<Vec<RecurrenceRule>>, StatusCode> {
    check_admin(&state, &params)?;

    with_stores(&state, |stores| stores.rules.load_rules())
        .await?
        .map(Json)
        .map_err(|e| error_status("Failed to load recurrence rules", e.into()))
}

// Replace the whole rule set; every rule must be well formed
pub async fn replace_rules(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminQueryParams>,
    ExtractJson(rules): ExtractJson<Vec<RecurrenceRule>>,
) -> Result<Json<Vec<RecurrenceRule>>, StatusCode> {
    check_admin(&state, &params)?;
    info!("Received request to replace recurrence rules with {} rules", rules.len());

    for (i, rule) in rules.iter().enumerate() {
        if let Err(e) = rule.validate() {
            warn!("Rejected recurrence rule {}: {}", i, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let now = now();
    let rules: Vec<RecurrenceRule> = rules
        .into_iter()
        .map(|mut rule| {
            rule.created_at.get_or_insert(now);
            rule
        })
        .collect();

    with_stores(&state, move |stores| stores.rules.replace_rules(rules))
        .await?
        .map(Json)
        .map_err(|e| error_status("Failed to save recurrence rules", e.into()))
}

// Expand the rules over a date range and create the missing slots
pub async fn apply_rules(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminQueryParams>,
    ExtractJson(range): ExtractJson<ApplyRange>,
) -> Result<Json<ReconcileReport>, StatusCode> {
    check_admin(&state, &params)?;
    info!(
        "Received request to apply recurrence rules from {} to {}",
        range.start_date, range.end_date
    );

    let days = (range.end_date - range.start_date).num_days() + 1;
    if days > state.max_apply_days {
        warn!(
            "Rejected apply request spanning {} days (limit {})",
            days, state.max_apply_days
        );
        return Err(StatusCode::BAD_REQUEST);
    }

    with_stores(&state, move |stores| {
        reconcile::apply_rules(
            stores.rules.as_ref(),
            stores.slots.as_ref(),
            range.start_date,
            range.end_date,
            now(),
        )
    })
    .await?
    .map(Json)
    .map_err(|e| error_status("Failed to apply recurrence rules", e))
}

pub async fn add_slot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminQueryParams>,
    ExtractJson(request): ExtractJson<NewSlotRequest>,
) -> Result<(StatusCode, Json<TimeSlot>), StatusCode> {
    check_admin(&state, &params)?;

    let time = parse_clock(&request.time).map(format_clock).map_err(|e| {
        warn!("Rejected slot with invalid time: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    with_stores(&state, move |stores| stores.slots.insert(request.date, &time, true))
        .await?
        .map(|slot| (StatusCode::CREATED, Json(slot)))
        .map_err(|e| error_status("Failed to add slot", e.into()))
}

pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Query(params): Query<AdminQueryParams>,
) -> Result<StatusCode, StatusCode> {
    check_admin(&state, &params)?;
    info!("Received request to delete slot {}", slot_id);

    match with_stores(&state, move |stores| stores.slots.remove(&slot_id)).await? {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => Err(error_status("Failed to delete slot", e.into())),
    }
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminQueryParams>,
) -> Result<Json<Vec<Booking>>, StatusCode> {
    check_admin(&state, &params)?;

    with_stores(&state, |stores| stores.bookings.list_bookings())
        .await?
        .map(Json)
        .map_err(|e| error_status("Failed to list bookings", e.into()))
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Query(params): Query<AdminQueryParams>,
    ExtractJson(update): ExtractJson<StatusUpdate>,
) -> Result<Json<Booking>, StatusCode> {
    check_admin(&state, &params)?;
    info!(
        "Received request to set booking {} to {:?}",
        booking_id, update.status
    );

    with_stores(&state, move |stores| {
        bookings::update_booking_status(
            stores.slots.as_ref(),
            stores.bookings.as_ref(),
            &booking_id,
            update.status,
        )
    })
    .await?
    .map(Json)
    .map_err(|e| error_status("Failed to update booking status", e))
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminQueryParams>,
) -> Result<Json<Vec<ContactSubmission>>, StatusCode> {
    check_admin(&state, &params)?;

    with_stores(&state, |stores| stores.contacts.list_contacts())
        .await?
        .map(Json)
        .map_err(|e| error_status("Failed to list contact messages", e.into()))
}

pub async fn update_contact_status(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
    Query(params): Query<AdminQueryParams>,
    ExtractJson(update): ExtractJson<ContactStatusUpdate>,
) -> Result<Json<ContactSubmission>, StatusCode> {
    check_admin(&state, &params)?;
    info!(
        "Received request to set contact message {} to {:?}",
        message_id, update.status
    );

    with_stores(&state, move |stores| {
        contact::update_contact_status(stores.contacts.as_ref(), &message_id, update.status)
    })
    .await?
    .map(Json)
    .map_err(|e| error_status("Failed to update contact message", e))
}
