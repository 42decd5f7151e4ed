//! ANONYMOUS (RFC 4505): the client transmits a single trace token,
//! typically an email address.

use crate::mech::Props;
use crate::types::{Error, Property, Result, Step};

#[derive(Debug, Default)]
pub(crate) struct Client;

impl Client {
    pub fn step(&mut self, _challenge: &[u8], props: &Props) -> Result<Step> {
        let token = props.require(Property::AnonymousToken)?;
        Ok(Step::Done(token.into_bytes()))
    }
}

#[derive(Debug, Default)]
pub(crate) struct Server;

impl Server {
    pub fn step(&mut self, message: &[u8], _props: &Props) -> Result<Step> {
        if message.is_empty() {
            return Ok(Step::NeedsMore(Vec::new()));
        }
        // token = 1*255 UTF-8 characters
        match std::str::from_utf8(message) {
            Ok(token) if !token.is_empty() && token.chars().count() <= 255 => {
                tracing::debug!(token = %token, "anonymous login accepted");
                Ok(Step::Done(Vec::new()))
            }
            _ => Err(Error::Malformed("anonymous token")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NoCallback;
    use std::collections::HashMap;

    #[test]
    fn client_sends_trace_token() {
        let mut local = HashMap::new();
        local.insert(Property::AnonymousToken, "megauser@example.com".to_string());
        let props = Props {
            local: &local,
            callback: &NoCallback,
        };
        let step = Client::default().step(b"", &props).unwrap();
        assert_eq!(step, Step::Done(b"megauser@example.com".to_vec()));
    }

    #[test]
    fn client_without_token_fails() {
        let local = HashMap::new();
        let props = Props {
            local: &local,
            callback: &NoCallback,
        };
        let err = Client::default().step(b"", &props).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingProperty(Property::AnonymousToken)
        ));
    }
}
