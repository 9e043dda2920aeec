mod client;
mod error;

pub use client::{CmsClient, EmailPayload, NewRegistration, RegistrationPatch, reduce_error_message};
pub use error::CmsError;
