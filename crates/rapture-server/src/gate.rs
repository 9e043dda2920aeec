use rapture_cms::{CmsClient, CmsError};
use rapture_common::models::auth::Claims;
use rapture_common::models::event::EventRegistration;

/// Why an ownership check refused to let a mutation through.
#[derive(Debug)]
pub enum Denial {
    /// Token present but carries no usable subject.
    Unauthorized(String),
    /// Caller is not the registration's owner, or ownership could not be
    /// established.
    Forbidden(String),
    /// The lookup itself failed; the mutation is denied rather than
    /// passed through.
    Upstream(CmsError),
}

pub fn owner_matches(subject: &str, owner_id: i64) -> bool {
    subject == owner_id.to_string()
}

/// Verify the caller owns the registration before any mutation/deletion.
///
/// Fails closed: a missing subject, a failed lookup, or a registration
/// without a populated owner all deny, and the CMS mutation is never
/// issued. Returns the fetched registration so handlers need not fetch
/// again.
#[tracing::instrument(skip(cms, claims))]
pub async fn authorize_owner(
    cms: &CmsClient,
    claims: &Claims,
    registration_id: &str,
) -> Result<EventRegistration, Denial> {
    let subject = claims
        .subject()
        .ok_or_else(|| Denial::Unauthorized("Unauthorized - no user ID in token".to_string()))?;

    let registration = cms
        .get_registration(registration_id)
        .await
        .map_err(Denial::Upstream)?;

    let owner = registration.owner.as_ref().ok_or_else(|| {
        Denial::Forbidden("Registration ownership could not be established".to_string())
    })?;

    if !owner_matches(&subject, owner.id) {
        tracing::warn!(
            "User {} attempted to mutate registration {} owned by {}",
            subject,
            registration_id,
            owner.id
        );
        return Err(Denial::Forbidden(
            "You can only modify your own registrations".to_string(),
        ));
    }

    Ok(registration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_matches_same_id() {
        assert!(owner_matches("42", 42));
    }

    #[test]
    fn test_owner_matches_different_id() {
        assert!(!owner_matches("42", 7));
    }

    #[test]
    fn test_owner_matches_non_numeric_subject() {
        assert!(!owner_matches("google-oauth-sub", 42));
    }
}
