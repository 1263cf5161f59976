//! Quote domain: data model, payload validation, and the HTTP endpoints.

pub mod handlers;
pub mod models;
pub mod validation;

pub use models::QuoteRecord;
pub use validation::{parse_quote_payload, validate_quote, ValidationError};
