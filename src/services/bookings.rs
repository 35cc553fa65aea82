use chrono::{NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};

use super::{required, required_email};
use crate::error::{Result, ServiceError};
use crate::models::booking::{Booking, BookingRequest, BookingStatus};
use crate::models::rule::{format_clock, parse_clock};
use crate::store::{new_id, BookingStore, SlotStore};

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn slot_unavailable(date: NaiveDate, time: &str) -> ServiceError {
    ServiceError::SlotUnavailable {
        date: date.to_string(),
        time: time.to_string(),
    }
}

// Hands a reserved slot back after the booking step that needed it failed
fn release_reserved(slots: &dyn SlotStore, date: NaiveDate, time: &str) {
    if let Err(e) = slots.set_available(date, time, true) {
        error!("Failed to release slot {} {}: {}", date, time, e);
    }
}

/// Books an available slot. The slot is reserved first, so two concurrent
/// requests cannot both take it; the booking starts out `pending`.
pub fn create_booking(
    slots: &dyn SlotStore,
    bookings: &dyn BookingStore,
    request: BookingRequest,
    now: NaiveDateTime,
) -> Result<Booking> {
    let name = required(&request.name, "name")?;
    let email = required_email(&request.email)?;

    let time = parse_clock(&request.time)
        .map(format_clock)
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    if !slots.reserve(request.date, &time)? {
        warn!("Booking requested for unavailable slot {} {}", request.date, time);
        return Err(slot_unavailable(request.date, &time));
    }

    let booking = Booking {
        id: new_id(),
        date: request.date,
        time: time.clone(),
        name,
        email,
        phone: optional(request.phone),
        message: optional(request.message),
        created_at: now,
        status: BookingStatus::Pending,
    };

    match bookings.insert_booking(booking) {
        Ok(booking) => {
            info!("Created booking {} for {} {}", booking.id, booking.date, booking.time);
            Ok(booking)
        }
        Err(e) => {
            release_reserved(slots, request.date, &time);
            Err(e.into())
        }
    }
}

/// Changes a booking's status. Cancelling an active booking re-opens its
/// slot; re-activating a cancelled booking has to take the slot again.
pub fn update_booking_status(
    slots: &dyn SlotStore,
    bookings: &dyn BookingStore,
    id: &str,
    status: BookingStatus,
) -> Result<Booking> {
    let current = bookings
        .get_booking(id)?
        .ok_or_else(|| ServiceError::NotFound(format!("Booking {}", id)))?;

    if current.status == status {
        return Ok(current);
    }

    let was_active = current.status != BookingStatus::Cancelled;
    let reactivating = !was_active;
    if reactivating && !slots.reserve(current.date, &current.time)? {
        warn!(
            "Cannot reactivate booking {}: slot {} {} is taken",
            current.id, current.date, current.time
        );
        return Err(slot_unavailable(current.date, &current.time));
    }

    let booking = match bookings.update_booking_status(id, status) {
        Ok(Some(booking)) => booking,
        Ok(None) => {
            if reactivating {
                release_reserved(slots, current.date, &current.time);
            }
            return Err(ServiceError::NotFound(format!("Booking {}", id)));
        }
        Err(e) => {
            if reactivating {
                release_reserved(slots, current.date, &current.time);
            }
            return Err(e.into());
        }
    };

    if was_active && status == BookingStatus::Cancelled {
        if slots.set_available(booking.date, &booking.time, true)? {
            info!("Slot {} {} available again", booking.date, booking.time);
        } else {
            warn!(
                "Cancelled booking {} refers to missing slot {} {}",
                booking.id, booking.date, booking.time
            );
        }
    }

    info!("Booking {} is now {:?}", booking.id, booking.status);
    Ok(booking)
}
