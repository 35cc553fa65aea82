pub mod api;
pub mod health;

#[cfg(test)]
mod api_test;
