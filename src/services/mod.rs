use crate::error::{Result, ServiceError};

pub mod bookings;
pub mod contact;
pub mod expander;
pub mod reconcile;


// Trimmed, non-empty field or a validation error naming it
fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn required_email(value: &str) -> Result<String> {
    let email = required(value, "email")?;
    if !email.contains('@') {
        return Err(ServiceError::Validation(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}
