//! HTTP handlers, one module per resource. Every handler returns `Result<_, ApiError>` so
//! failures leave through the shared error envelope.

pub mod accounts;
pub mod admin;
pub mod favorites;
pub mod inquiries;
pub mod listings;
pub mod uploads;
pub mod users;
