//! CRAM-MD5 (RFC 2195): keyed MD5 digest of a server challenge.

use hmac::{Hmac, Mac};
use md5::Md5;
use rand::prelude::*;

use crate::mech::Props;
use crate::types::{Error, Property, Result, Step};

type HmacMd5 = Hmac<Md5>;

pub(crate) fn hmac_md5_hex(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacMd5::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Default)]
pub(crate) struct Client;

impl Client {
    pub fn step(&mut self, challenge: &[u8], props: &Props) -> Result<Step> {
        if challenge.is_empty() {
            return Err(Error::Malformed("cram-md5 challenge"));
        }
        let authid = props.require(Property::AuthId)?;
        let password = props.require(Property::Password)?;
        let digest = hmac_md5_hex(password.as_bytes(), challenge);
        Ok(Step::Done(format!("{} {}", authid, digest).into_bytes()))
    }
}

#[derive(Debug)]
pub(crate) enum Server {
    Initial,
    Challenged(String),
}

impl Default for Server {
    fn default() -> Self {
        Server::Initial
    }
}

impl Server {
    pub fn step(&mut self, message: &[u8], props: &Props) -> Result<Step> {
        match self {
            Server::Initial => {
                let hostname = props
                    .get(Property::Hostname)
                    .unwrap_or_else(|| "localhost".to_string());
                let mut raw = [0u8; 8];
                thread_rng().fill(&mut raw);
                let challenge = format!("<{}@{}>", hex::encode(raw), hostname);
                *self = Server::Challenged(challenge.clone());
                Ok(Step::NeedsMore(challenge.into_bytes()))
            }
            Server::Challenged(challenge) => {
                let text = std::str::from_utf8(message)
                    .map_err(|_| Error::Malformed("cram-md5 response"))?;
                let (authid, digest) = text
                    .rsplit_once(' ')
                    .ok_or(Error::Malformed("cram-md5 response"))?;
                if authid.is_empty() {
                    return Err(Error::Malformed("cram-md5 response"));
                }
                let password = props.require(Property::Password)?;
                let expected = hmac_md5_hex(password.as_bytes(), challenge.as_bytes());
                if digest.eq_ignore_ascii_case(&expected) {
                    Ok(Step::Done(Vec::new()))
                } else {
                    tracing::warn!(authid = %authid, "cram-md5 digest mismatch");
                    Err(Error::AuthenticationFailed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NoCallback;
    use std::collections::HashMap;

    #[test]
    fn rfc2195_example() {
        // Keyed digest from the RFC's worked example.
        let digest = hmac_md5_hex(
            b"tanstaaftanstaaf",
            b"<1896.697170952@postoffice.reston.mci.net>",
        );
        assert_eq!(digest, "b913a602c7eda7a495b4e6e7334d3890");
    }

    #[test]
    fn client_response_layout() {
        let mut local = HashMap::new();
        local.insert(Property::AuthId, "tim".to_string());
        local.insert(Property::Password, "tanstaaftanstaaf".to_string());
        let props = Props {
            local: &local,
            callback: &NoCallback,
        };
        let step = Client::default()
            .step(b"<1896.697170952@postoffice.reston.mci.net>", &props)
            .unwrap();
        assert_eq!(
            step,
            Step::Done(b"tim b913a602c7eda7a495b4e6e7334d3890".to_vec())
        );
    }
}
