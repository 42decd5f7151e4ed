use std::collections::HashMap;

/// Keys recognized in [`SessionData`].
pub mod keys {
    /// Initial or intermediate server challenge, base64.
    pub const CHALLENGE_BASE64: &str = "ChallengeBase64";
    /// Client response carried by outbound signals, base64.
    pub const RESPONSE_BASE64: &str = "ResponseBase64";
    /// Authentication identity.
    pub const USERNAME: &str = "UserName";
    /// Password of the authentication identity.
    pub const SECRET: &str = "Secret";
    /// Authorization identity.
    pub const AUTHZID: &str = "Authzid";
    /// Anonymous trace token, e.g. an email address.
    pub const ANONYMOUS_TOKEN: &str = "AnonymousToken";
    /// Registered service name of the application service, e.g. "imap".
    pub const SERVICE: &str = "Service";
    /// Local host name of the machine.
    pub const HOSTNAME: &str = "Hostname";
    /// Name of the authentication domain.
    pub const REALM: &str = "Realm";
    /// Quality of protection: qop-auth, qop-int or qop-conf.
    pub const QOP: &str = "Qop";
    pub const QOPS: &str = "Qops";
    pub const GSSAPI_DISPLAY_NAME: &str = "GssapiDisplayName";
    pub const PASSCODE: &str = "Passcode";
    pub const SUGGESTED_PIN: &str = "SuggestedPin";
    pub const PIN: &str = "Pin";
    pub const DIGEST_MD5_HASHED_PASSWORD: &str = "DigestMd5HashedPassword";
    pub const SCRAM_ITER: &str = "ScramIter";
    pub const SCRAM_SALT: &str = "ScramSalt";
    /// 40 character hex string with the user's salted password.
    pub const SCRAM_SALTED_PASSWORD: &str = "ScramSaltedPassword";
    /// Base64 encoded tls-unique channel binding data.
    pub const CB_TLS_UNIQUE: &str = "CbTlsUnique";
}

/// The parameter bag of one authentication attempt.
///
/// Caller-owned string keys and values, plus an ordered list of allowed
/// realms for realm-aware mechanisms. The negotiation core only ever
/// reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    values: HashMap<String, String>,
    allowed_realms: Option<Vec<String>>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn username(&self) -> Option<&str> {
        self.get(keys::USERNAME)
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.set(keys::USERNAME, username);
    }

    pub fn secret(&self) -> Option<&str> {
        self.get(keys::SECRET)
    }

    pub fn set_secret(&mut self, secret: impl Into<String>) {
        self.set(keys::SECRET, secret);
    }

    pub fn realm(&self) -> Option<&str> {
        self.get(keys::REALM)
    }

    pub fn set_realm(&mut self, realm: impl Into<String>) {
        self.set(keys::REALM, realm);
    }

    pub fn allowed_realms(&self) -> Option<&[String]> {
        self.allowed_realms.as_deref()
    }

    pub fn set_allowed_realms(&mut self, realms: impl IntoIterator<Item = impl Into<String>>) {
        self.allowed_realms = Some(realms.into_iter().map(Into::into).collect());
    }

    /// Convenience accessor for the response payload of outbound signals.
    pub fn response_base64(&self) -> Option<&str> {
        self.get(keys::RESPONSE_BASE64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_share_the_map() {
        let mut data = SessionData::new();
        data.set_username("megauser@example.com");
        data.set_secret("megapassword");
        assert_eq!(data.get(keys::USERNAME), Some("megauser@example.com"));
        assert_eq!(data.secret(), Some("megapassword"));
        assert_eq!(data.get(keys::REALM), None);
    }

    #[test]
    fn allowed_realms_keep_order() {
        let mut data = SessionData::new();
        data.set_allowed_realms(["microhostname", "megahostname"]);
        assert_eq!(
            data.allowed_realms(),
            Some(&["microhostname".to_string(), "megahostname".to_string()][..])
        );
    }
}
