//! Persistence seams for slots, bookings, contact messages and recurrence
//! rules.
//!
//! Each concern is a trait so the service can run against the in-process
//! [`MemoryStore`] or the file-backed [`FileStore`]. The backend is chosen
//! once at startup by [`create_stores`].

use chrono::NaiveDate;
use rand::Rng;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, StoreBackend};
use crate::error::StoreError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::contact::{ContactStatus, ContactSubmission};
use crate::models::rule::RecurrenceRule;
use crate::models::slot::TimeSlot;

pub mod file;
pub mod memory;


pub use file::FileStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Bookable slots keyed by `(date, time)`.
#[cfg_attr(test, mockall::automock)]
pub trait SlotStore: Send + Sync {
    fn exists(&self, date: NaiveDate, time: &str) -> StoreResult<bool>;

    /// Fails with [`StoreError::Conflict`] when `(date, time)` is taken.
    fn insert(&self, date: NaiveDate, time: &str, available: bool) -> StoreResult<TimeSlot>;

    /// Slots within the inclusive range, ordered by date then time.
    fn list(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> StoreResult<Vec<TimeSlot>>;

    fn remove(&self, id: &str) -> StoreResult<bool>;

    /// Returns `false` when no slot matches.
    fn set_available(&self, date: NaiveDate, time: &str, available: bool) -> StoreResult<bool>;

    /// Marks the slot unavailable if it exists and is currently available,
    /// as one step. Returns whether this call took the slot.
    fn reserve(&self, date: NaiveDate, time: &str) -> StoreResult<bool>;

    fn find(&self, date: NaiveDate, time: &str) -> StoreResult<Option<TimeSlot>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait BookingStore: Send + Sync {
    fn insert_booking(&self, booking: Booking) -> StoreResult<Booking>;

    /// Newest first.
    fn list_bookings(&self) -> StoreResult<Vec<Booking>>;

    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>>;

    fn update_booking_status(&self, id: &str, status: BookingStatus) -> StoreResult<Option<Booking>>;
}

/// Messages left through the public contact form.
pub trait ContactStore: Send + Sync {
    fn insert_contact(&self, submission: ContactSubmission) -> StoreResult<ContactSubmission>;

    /// Newest first.
    fn list_contacts(&self) -> StoreResult<Vec<ContactSubmission>>;

    fn update_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
    ) -> StoreResult<Option<ContactSubmission>>;
}

pub trait RuleStore: Send + Sync {
    fn load_rules(&self) -> StoreResult<Vec<RecurrenceRule>>;

    /// Replaces the whole rule set, assigning ids to rules without one.
    fn replace_rules(&self, rules: Vec<RecurrenceRule>) -> StoreResult<Vec<RecurrenceRule>>;
}

/// The stores the application works with, sharing one backend.
#[derive(Clone)]
pub struct Stores {
    pub slots: Arc<dyn SlotStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub rules: Arc<dyn RuleStore>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: SlotStore + BookingStore + ContactStore + RuleStore + 'static,
    {
        Self {
            slots: backend.clone(),
            bookings: backend.clone(),
            contacts: backend.clone(),
            rules: backend,
        }
    }
}

pub fn create_stores(config: &AppConfig) -> StoreResult<Stores> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory store with default recurrence rules");
            Ok(Stores::from_backend(Arc::new(MemoryStore::with_default_rules())))
        }
        StoreBackend::File => {
            info!("Using file store in {}", config.data_dir.display());
            Ok(Stores::from_backend(Arc::new(FileStore::open(&config.data_dir)?)))
        }
    }
}

pub(crate) fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

/// Random identifier for rules, bookings and contact messages.
pub fn new_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}
