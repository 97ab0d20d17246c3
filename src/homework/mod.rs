pub mod client;
pub mod schema;
pub mod validate;

pub use client::{PracticumClient, ReviewSource};
pub use schema::{extract_message, Homework, ReviewStatus};
pub use validate::{check_response, StatusBatch};
