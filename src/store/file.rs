use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::{in_range, new_id, BookingStore, ContactStore, RuleStore, SlotStore, StoreResult};
use crate::error::StoreError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::contact::{ContactStatus, ContactSubmission};
use crate::models::rule::RecurrenceRule;
use crate::models::slot::TimeSlot;

const SLOT_HEADERS: [&str; 4] = ["id", "date", "time", "available"];
const BOOKING_HEADERS: [&str; 9] = [
    "id",
    "date",
    "time",
    "name",
    "email",
    "phone",
    "message",
    "created_at",
    "status",
];
const CONTACT_HEADERS: [&str; 6] = ["id", "name", "email", "message", "created_at", "status"];

/// Store backed by CSV files (slots, bookings, contact messages) and a JSON
/// rule file inside one data directory.
pub struct FileStore {
    slots_path: PathBuf,
    bookings_path: PathBuf,
    contacts_path: PathBuf,
    rules_path: PathBuf,
    file_mutex: Mutex<()>,
}

impl FileStore {
    /// Opens the store in `dir`, creating the directory and CSV files with
    /// headers when they do not exist yet.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let store = Self {
            slots_path: dir.join("time_slots.csv"),
            bookings_path: dir.join("bookings.csv"),
            contacts_path: dir.join("contact_submissions.csv"),
            rules_path: dir.join("fixed_time_slots.json"),
            file_mutex: Mutex::new(()),
        };

        create_with_headers(&store.slots_path, &SLOT_HEADERS)?;
        create_with_headers(&store.bookings_path, &BOOKING_HEADERS)?;
        create_with_headers(&store.contacts_path, &CONTACT_HEADERS)?;

        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.file_mutex
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire mutex: {}", e)))
    }

    fn read_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        read_records(&self.slots_path)
    }

    fn read_bookings(&self) -> StoreResult<Vec<Booking>> {
        read_records(&self.bookings_path)
    }

    fn read_contacts(&self) -> StoreResult<Vec<ContactSubmission>> {
        read_records(&self.contacts_path)
    }
}

fn create_with_headers(path: &Path, headers: &[&str]) -> StoreResult<()> {
    if path.exists() {
        return Ok(());
    }

    info!("Creating new data file at {}", path.display());
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    writer.flush()?;
    Ok(())
}

fn read_records<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize::<T>() {
        records.push(result?);
    }
    Ok(records)
}

fn append_record<T: Serialize>(path: &Path, record: &T) -> StoreResult<()> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}

// Rewrites the whole file; used for updates and deletions
fn write_all<T: Serialize>(path: &Path, headers: &[&str], records: &[T]) -> StoreResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

impl SlotStore for FileStore {
    fn exists(&self, date: NaiveDate, time: &str) -> StoreResult<bool> {
        let _lock = self.lock()?;
        Ok(self
            .read_slots()?
            .iter()
            .any(|s| s.date == date && s.time == time))
    }

    fn insert(&self, date: NaiveDate, time: &str, available: bool) -> StoreResult<TimeSlot> {
        let _lock = self.lock()?;
        if self
            .read_slots()?
            .iter()
            .any(|s| s.date == date && s.time == time)
        {
            return Err(StoreError::Conflict(format!("Slot {} {} already exists", date, time)));
        }

        let slot = TimeSlot::new(date, time, available);
        append_record(&self.slots_path, &slot)?;
        debug!("Stored slot {}", slot.id);
        Ok(slot)
    }

    fn list(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> StoreResult<Vec<TimeSlot>> {
        let _lock = self.lock()?;
        let mut slots: Vec<TimeSlot> = self
            .read_slots()?
            .into_iter()
            .filter(|s| in_range(s.date, start, end))
            .collect();
        slots.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
        Ok(slots)
    }

    fn remove(&self, id: &str) -> StoreResult<bool> {
        let _lock = self.lock()?;
        let mut slots = self.read_slots()?;
        let before = slots.len();
        slots.retain(|s| s.id != id);
        if slots.len() == before {
            warn!("No slot found with id {}", id);
            return Ok(false);
        }

        write_all(&self.slots_path, &SLOT_HEADERS, &slots)?;
        info!("Removed slot {}", id);
        Ok(true)
    }

    fn set_available(&self, date: NaiveDate, time: &str, available: bool) -> StoreResult<bool> {
        let _lock = self.lock()?;
        let mut slots = self.read_slots()?;
        let Some(slot) = slots.iter_mut().find(|s| s.date == date && s.time == time) else {
            return Ok(false);
        };
        slot.available = available;

        write_all(&self.slots_path, &SLOT_HEADERS, &slots)?;
        Ok(true)
    }

    fn reserve(&self, date: NaiveDate, time: &str) -> StoreResult<bool> {
        let _lock = self.lock()?;
        let mut slots = self.read_slots()?;
        let Some(slot) = slots
            .iter_mut()
            .find(|s| s.date == date && s.time == time && s.available)
        else {
            return Ok(false);
        };
        slot.available = false;

        write_all(&self.slots_path, &SLOT_HEADERS, &slots)?;
        debug!("Reserved slot {} {}", date, time);
        Ok(true)
    }

    fn find(&self, date: NaiveDate, time: &str) -> StoreResult<Option<TimeSlot>> {
        let _lock = self.lock()?;
        Ok(self
            .read_slots()?
            .into_iter()
            .find(|s| s.date == date && s.time == time))
    }
}

impl BookingStore for FileStore {
    fn insert_booking(&self, booking: Booking) -> StoreResult<Booking> {
        let _lock = self.lock()?;
        if self.read_bookings()?.iter().any(|b| b.id == booking.id) {
            return Err(StoreError::Conflict(format!("Booking {} already exists", booking.id)));
        }

        append_record(&self.bookings_path, &booking)?;
        info!("Stored booking {} for {} {}", booking.id, booking.date, booking.time);
        Ok(booking)
    }

    fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let _lock = self.lock()?;
        let mut bookings = self.read_bookings()?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>> {
        let _lock = self.lock()?;
        Ok(self.read_bookings()?.into_iter().find(|b| b.id == id))
    }

    fn update_booking_status(&self, id: &str, status: BookingStatus) -> StoreResult<Option<Booking>> {
        let _lock = self.lock()?;
        let mut bookings = self.read_bookings()?;
        let Some(booking) = bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        booking.status = status;
        let updated = booking.clone();

        write_all(&self.bookings_path, &BOOKING_HEADERS, &bookings)?;
        Ok(Some(updated))
    }
}

impl ContactStore for FileStore {
    fn insert_contact(&self, submission: ContactSubmission) -> StoreResult<ContactSubmission> {
        let _lock = self.lock()?;
        if self.read_contacts()?.iter().any(|c| c.id == submission.id) {
            return Err(StoreError::Conflict(format!("Message {} already exists", submission.id)));
        }

        append_record(&self.contacts_path, &submission)?;
        info!("Stored contact message {} from {}", submission.id, submission.email);
        Ok(submission)
    }

    fn list_contacts(&self) -> StoreResult<Vec<ContactSubmission>> {
        let _lock = self.lock()?;
        let mut contacts = self.read_contacts()?;
        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contacts)
    }

    fn update_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
    ) -> StoreResult<Option<ContactSubmission>> {
        let _lock = self.lock()?;
        let mut contacts = self.read_contacts()?;
        let Some(contact) = contacts.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        contact.status = status;
        let updated = contact.clone();

        write_all(&self.contacts_path, &CONTACT_HEADERS, &contacts)?;
        Ok(Some(updated))
    }
}

impl RuleStore for FileStore {
    fn load_rules(&self) -> StoreResult<Vec<RecurrenceRule>> {
        let _lock = self.lock()?;
        if !self.rules_path.exists() {
            info!("No saved recurrence rules, using defaults");
            return Ok(RecurrenceRule::defaults());
        }

        let file = File::open(&self.rules_path)?;
        Ok(serde_json::from_reader(file)?)
    }

    fn replace_rules(&self, rules: Vec<RecurrenceRule>) -> StoreResult<Vec<RecurrenceRule>> {
        let _lock = self.lock()?;
        let rules: Vec<RecurrenceRule> = rules
            .into_iter()
            .map(|mut rule| {
                rule.id.get_or_insert_with(new_id);
                rule
            })
            .collect();

        let file = File::create(&self.rules_path)?;
        serde_json::to_writer_pretty(file, &rules)?;
        info!("Saved {} recurrence rules to {}", rules.len(), self.rules_path.display());
        Ok(rules)
    }
}
