pub mod booking;
pub mod common;
pub mod contact;
pub mod rule;
pub mod slot;
