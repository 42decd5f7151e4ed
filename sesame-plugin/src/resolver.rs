//! Resolves mechanism property queries against the parameter bag.

use sesame_sasl::{Callback, Property};

use crate::params::{keys, SessionData};

/// Each property maps to exactly one parameter key; anything the bag does
/// not hold resolves to absent.
impl Callback for SessionData {
    fn property(&self, property: Property) -> Option<String> {
        let key = match property {
            Property::AuthId => keys::USERNAME,
            Property::AuthzId => keys::AUTHZID,
            Property::Password => keys::SECRET,
            Property::AnonymousToken => keys::ANONYMOUS_TOKEN,
            Property::Service => keys::SERVICE,
            Property::Hostname => keys::HOSTNAME,
            Property::GssapiDisplayName => keys::GSSAPI_DISPLAY_NAME,
            Property::Passcode => keys::PASSCODE,
            Property::SuggestedPin => keys::SUGGESTED_PIN,
            Property::Pin => keys::PIN,
            Property::Realm => keys::REALM,
            Property::DigestMd5HashedPassword => keys::DIGEST_MD5_HASHED_PASSWORD,
            Property::Qops => keys::QOPS,
            Property::Qop => keys::QOP,
            Property::ScramIter => keys::SCRAM_ITER,
            Property::ScramSalt => keys::SCRAM_SALT,
            Property::ScramSaltedPassword => keys::SCRAM_SALTED_PASSWORD,
            Property::CbTlsUnique => keys::CB_TLS_UNIQUE,
        };
        let value = self.get(key).map(str::to_string);
        tracing::debug!(property = ?property, found = value.is_some(), "property queried");
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_resolve_to_their_keys() {
        let mut data = SessionData::new();
        data.set_username("megauser@example.com");
        data.set_secret("megapassword");
        data.set(keys::AUTHZID, "admin");

        assert_eq!(
            data.property(Property::AuthId).as_deref(),
            Some("megauser@example.com")
        );
        assert_eq!(
            data.property(Property::Password).as_deref(),
            Some("megapassword")
        );
        assert_eq!(data.property(Property::AuthzId).as_deref(), Some("admin"));
    }

    #[test]
    fn missing_keys_are_absent() {
        let data = SessionData::new();
        assert_eq!(data.property(Property::AnonymousToken), None);
        assert_eq!(data.property(Property::CbTlsUnique), None);
    }
}
