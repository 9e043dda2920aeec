pub mod envelope;
pub mod models;

pub use envelope::ApiEnvelope;
