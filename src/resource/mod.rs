//! Resources managed by budgeteer

pub mod api_key;

pub use api_key::{ApiKeyModel, ApiKeyResource};
