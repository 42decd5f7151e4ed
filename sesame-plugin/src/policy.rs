//! Realm and hostname authorization, checked once before a mechanism
//! session is started.

use crate::error::AuthError;
use crate::params::{keys, SessionData};

/// True when `host` equals `domain` or is a subdomain of it
/// ("mail.example.com" is in "example.com", "notexample.com" is not).
fn host_in_domain(host: &str, domain: &str) -> bool {
    match host.strip_suffix(domain) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

/// A supplied realm must appear verbatim in the allowed list; a supplied
/// hostname must lie within one of the allowed domains. Nothing supplied
/// means nothing to check.
pub(crate) fn authorize(data: &SessionData) -> Result<(), AuthError> {
    let realm = data.realm();
    let host = data.get(keys::HOSTNAME);
    let mut realm_ok = false;
    let mut host_ok = false;

    if let Some(allowed) = data.allowed_realms() {
        for item in allowed {
            if let Some(r) = realm {
                if r == item {
                    realm_ok = true;
                }
            }
            if let Some(h) = host {
                if host_in_domain(h, item) {
                    host_ok = true;
                }
            }
        }
    }
    if realm.is_some() && !realm_ok {
        tracing::warn!(realm = ?realm, "realm rejected");
        return Err(AuthError::NotAuthorized("Unauthorized realm".to_string()));
    }
    if host.is_some() && !host_ok {
        tracing::warn!(hostname = ?host, "hostname rejected");
        return Err(AuthError::NotAuthorized(
            "Unauthorized hostname".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_matching() {
        assert!(host_in_domain("example.com", "example.com"));
        assert!(host_in_domain("mail.example.com", "example.com"));
        assert!(!host_in_domain("notexample.com", "example.com"));
        assert!(!host_in_domain("example.com", "mail.example.com"));
    }

    #[test]
    fn nothing_supplied_passes() {
        let data = SessionData::new();
        assert!(authorize(&data).is_ok());
    }

    #[test]
    fn realm_needs_exact_entry() {
        let mut data = SessionData::new();
        data.set_allowed_realms(["megahostname"]);
        data.set_realm("megahostname");
        assert!(authorize(&data).is_ok());

        data.set_realm("Megahostname");
        assert_eq!(
            authorize(&data),
            Err(AuthError::NotAuthorized("Unauthorized realm".to_string()))
        );
    }

    #[test]
    fn realm_without_allowed_list_is_rejected() {
        let mut data = SessionData::new();
        data.set_realm("megahostname");
        assert_eq!(
            authorize(&data),
            Err(AuthError::NotAuthorized("Unauthorized realm".to_string()))
        );
    }

    #[test]
    fn hostname_matches_by_domain() {
        let mut data = SessionData::new();
        data.set_allowed_realms(["example.com"]);
        data.set(keys::HOSTNAME, "imap.example.com");
        assert!(authorize(&data).is_ok());

        data.set(keys::HOSTNAME, "elsewhere.org");
        assert_eq!(
            authorize(&data),
            Err(AuthError::NotAuthorized(
                "Unauthorized hostname".to_string()
            ))
        );
    }
}
