use chrono::NaiveDateTime;
use tracing::info;

use super::{required, required_email};
use crate::error::{Result, ServiceError};
use crate::models::contact::{ContactRequest, ContactStatus, ContactSubmission};
use crate::store::{new_id, ContactStore};

/// Records a contact form message with status `new`.
pub fn submit_contact(
    contacts: &dyn ContactStore,
    request: ContactRequest,
    now: NaiveDateTime,
) -> Result<ContactSubmission> {
    let submission = ContactSubmission {
        id: new_id(),
        name: required(&request.name, "name")?,
        email: required_email(&request.email)?,
        message: required(&request.message, "message")?,
        created_at: now,
        status: ContactStatus::New,
    };

    let submission = contacts.insert_contact(submission)?;
    info!("Received contact message {} from {}", submission.id, submission.email);
    Ok(submission)
}

pub fn update_contact_status(
    contacts: &dyn ContactStore,
    id: &str,
    status: ContactStatus,
) -> Result<ContactSubmission> {
    let submission = contacts
        .update_contact_status(id, status)?
        .ok_or_else(|| ServiceError::NotFound(format!("Message {}", id)))?;

    info!("Contact message {} is now {:?}", submission.id, submission.status);
    Ok(submission)
}
