//! PLAIN (RFC 4616): `[authzid] NUL authcid NUL password` in one message.

use crate::decode::plain_message;
use crate::mech::Props;
use crate::types::{Error, Property, Result, Step};

#[derive(Debug, Default)]
pub(crate) struct Client;

impl Client {
    pub fn step(&mut self, _challenge: &[u8], props: &Props) -> Result<Step> {
        let authid = props.require(Property::AuthId)?;
        let password = props.require(Property::Password)?;
        let authzid = props.get(Property::AuthzId).unwrap_or_default();

        let mut out = Vec::with_capacity(authzid.len() + authid.len() + password.len() + 2);
        out.extend_from_slice(authzid.as_bytes());
        out.push(0);
        out.extend_from_slice(authid.as_bytes());
        out.push(0);
        out.extend_from_slice(password.as_bytes());
        Ok(Step::Done(out))
    }
}

#[derive(Debug, Default)]
pub(crate) struct Server;

impl Server {
    pub fn step(&mut self, message: &[u8], props: &Props) -> Result<Step> {
        if message.is_empty() {
            return Ok(Step::NeedsMore(Vec::new()));
        }
        let (_, (authzid, authid, password)) =
            plain_message(message).map_err(|_| Error::Malformed("plain"))?;
        if authid.is_empty() {
            return Err(Error::Malformed("plain"));
        }
        // Impersonation is not supported: authzid must be absent or equal
        // to the authentication identity.
        if !authzid.is_empty() && authzid != authid {
            tracing::warn!("plain login rejected, authzid differs from authid");
            return Err(Error::AuthenticationFailed);
        }
        let expected = props.require(Property::Password)?;
        if password == expected.as_bytes() {
            Ok(Step::Done(Vec::new()))
        } else {
            tracing::warn!("plain login failed");
            Err(Error::AuthenticationFailed)
        }
    }
}
