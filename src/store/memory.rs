use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{in_range, new_id, BookingStore, ContactStore, RuleStore, SlotStore, StoreResult};
use crate::error::StoreError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::contact::{ContactStatus, ContactSubmission};
use crate::models::rule::RecurrenceRule;
use crate::models::slot::TimeSlot;

#[derive(Default)]
struct MemoryState {
    slots: Vec<TimeSlot>,
    bookings: Vec<Booking>,
    contacts: Vec<ContactSubmission>,
    rules: Vec<RecurrenceRule>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_rules() -> Self {
        Self::with_rules(RecurrenceRule::defaults())
    }

    pub fn with_rules(rules: Vec<RecurrenceRule>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                rules,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire mutex: {}", e)))
    }
}

impl SlotStore for MemoryStore {
    fn exists(&self, date: NaiveDate, time: &str) -> StoreResult<bool> {
        let state = self.lock()?;
        Ok(state.slots.iter().any(|s| s.date == date && s.time == time))
    }

    fn insert(&self, date: NaiveDate, time: &str, available: bool) -> StoreResult<TimeSlot> {
        let mut state = self.lock()?;
        if state.slots.iter().any(|s| s.date == date && s.time == time) {
            return Err(StoreError::Conflict(format!("Slot {} {} already exists", date, time)));
        }

        let slot = TimeSlot::new(date, time, available);
        state.slots.push(slot.clone());
        debug!("Inserted slot {}", slot.id);
        Ok(slot)
    }

    fn list(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> StoreResult<Vec<TimeSlot>> {
        let state = self.lock()?;
        let mut slots: Vec<TimeSlot> = state
            .slots
            .iter()
            .filter(|s| in_range(s.date, start, end))
            .cloned()
            .collect();
        slots.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
        Ok(slots)
    }

    fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let before = state.slots.len();
        state.slots.retain(|s| s.id != id);
        Ok(state.slots.len() != before)
    }

    fn set_available(&self, date: NaiveDate, time: &str, available: bool) -> StoreResult<bool> {
        let mut state = self.lock()?;
        match state.slots.iter_mut().find(|s| s.date == date && s.time == time) {
            Some(slot) => {
                slot.available = available;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn reserve(&self, date: NaiveDate, time: &str) -> StoreResult<bool> {
        let mut state = self.lock()?;
        match state
            .slots
            .iter_mut()
            .find(|s| s.date == date && s.time == time && s.available)
        {
            Some(slot) => {
                slot.available = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find(&self, date: NaiveDate, time: &str) -> StoreResult<Option<TimeSlot>> {
        let state = self.lock()?;
        Ok(state
            .slots
            .iter()
            .find(|s| s.date == date && s.time == time)
            .cloned())
    }
}

impl BookingStore for MemoryStore {
    fn insert_booking(&self, booking: Booking) -> StoreResult<Booking> {
        let mut state = self.lock()?;
        if state.bookings.iter().any(|b| b.id == booking.id) {
            return Err(StoreError::Conflict(format!("Booking {} already exists", booking.id)));
        }
        state.bookings.push(booking.clone());
        Ok(booking)
    }

    fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let state = self.lock()?;
        let mut bookings = state.bookings.clone();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>> {
        let state = self.lock()?;
        Ok(state.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn update_booking_status(&self, id: &str, status: BookingStatus) -> StoreResult<Option<Booking>> {
        let mut state = self.lock()?;
        Ok(state.bookings.iter_mut().find(|b| b.id == id).map(|booking| {
            booking.status = status;
            booking.clone()
        }))
    }
}

impl ContactStore for MemoryStore {
    fn insert_contact(&self, submission: ContactSubmission) -> StoreResult<ContactSubmission> {
        let mut state = self.lock()?;
        if state.contacts.iter().any(|c| c.id == submission.id) {
            return Err(StoreError::Conflict(format!("Message {} already exists", submission.id)));
        }
        state.contacts.push(submission.clone());
        Ok(submission)
    }

    fn list_contacts(&self) -> StoreResult<Vec<ContactSubmission>> {
        let state = self.lock()?;
        let mut contacts = state.contacts.clone();
        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contacts)
    }

    fn update_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
    ) -> StoreResult<Option<ContactSubmission>> {
        let mut state = self.lock()?;
        Ok(state.contacts.iter_mut().find(|c| c.id == id).map(|contact| {
            contact.status = status;
            contact.clone()
        }))
    }
}

impl RuleStore for MemoryStore {
    fn load_rules(&self) -> StoreResult<Vec<RecurrenceRule>> {
        Ok(self.lock()?.rules.clone())
    }

    fn replace_rules(&self, rules: Vec<RecurrenceRule>) -> StoreResult<Vec<RecurrenceRule>> {
        let mut state = self.lock()?;
        let rules: Vec<RecurrenceRule> = rules
            .into_iter()
            .map(|mut rule| {
                rule.id.get_or_insert_with(new_id);
                rule
            })
            .collect();

        state.rules = rules.clone();
        info!("Replaced recurrence rules, {} now configured", rules.len());
        Ok(rules)
    }
}
