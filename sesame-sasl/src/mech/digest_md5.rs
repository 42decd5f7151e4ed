//! DIGEST-MD5 (RFC 2831), qop=auth only.
//!
//! The client answers a digest-challenge with a digest-response and then
//! checks the server's `rspauth` for mutual authentication, finishing with
//! an empty output. Integrity and confidentiality layers (auth-int,
//! auth-conf) are not offered.

use md5::{Digest, Md5};
use rand::prelude::*;

use crate::decode::{digest_message, param, param_all};
use crate::encode::{self, quoted};
use crate::mech::Props;
use crate::types::{Error, Property, Result, Step};

const NC_INITIAL: &str = "00000001";

fn md5_parts(parts: &[&[u8]]) -> [u8; 16] {
    let mut hash = Md5::new();
    for part in parts {
        hash.update(part);
    }
    hash.finalize().into()
}

/// H(authid:realm:password), the reusable long-term secret.
fn secret_hash(authid: &str, realm: &str, password: &str) -> [u8; 16] {
    md5_parts(&[
        authid.as_bytes(),
        b":",
        realm.as_bytes(),
        b":",
        password.as_bytes(),
    ])
}

/// HEX(H(A1)) with A1 = secret : nonce : cnonce [: authzid] (md5-sess).
fn a1_hex(secret: [u8; 16], nonce: &str, cnonce: &str, authzid: Option<&str>) -> String {
    let mut hash = Md5::new();
    hash.update(secret);
    hash.update(b":");
    hash.update(nonce.as_bytes());
    hash.update(b":");
    hash.update(cnonce.as_bytes());
    if let Some(az) = authzid {
        hash.update(b":");
        hash.update(az.as_bytes());
    }
    hex::encode(hash.finalize())
}

/// The `response` / `rspauth` hex value. `a2_prefix` is "AUTHENTICATE"
/// when the client proves itself and "" for the server's response auth.
fn response_hex(
    a1: &str,
    nonce: &str,
    nc: &str,
    cnonce: &str,
    a2_prefix: &str,
    digest_uri: &str,
) -> String {
    let a2 = md5_parts(&[a2_prefix.as_bytes(), b":", digest_uri.as_bytes()]);
    let a2 = hex::encode(a2);
    let kd = md5_parts(&[
        a1.as_bytes(),
        b":",
        nonce.as_bytes(),
        b":",
        nc.as_bytes(),
        b":",
        cnonce.as_bytes(),
        b":auth:",
        a2.as_bytes(),
    ]);
    hex::encode(kd)
}

/// Maps the property spelling ("qop-auth") to the wire spelling ("auth").
fn normalize_qop(value: &str) -> &str {
    match value {
        "qop-auth" => "auth",
        "qop-int" => "auth-int",
        "qop-conf" => "auth-conf",
        other => other,
    }
}

fn long_term_secret(props: &Props, authid: &str, realm: &str) -> Result<[u8; 16]> {
    if let Some(hexed) = props.get(Property::DigestMd5HashedPassword) {
        let raw = hex::decode(&hexed).map_err(|_| Error::Malformed("digest-md5 hashed password"))?;
        return raw
            .try_into()
            .map_err(|_| Error::Malformed("digest-md5 hashed password"));
    }
    let password = props.require(Property::Password)?;
    Ok(secret_hash(authid, realm, &password))
}

#[derive(Debug)]
pub(crate) enum Client {
    Initial,
    /// Response sent; the expected `rspauth` value is kept for the
    /// mutual-authentication check.
    Responded { rspauth: String },
}

impl Default for Client {
    fn default() -> Self {
        Client::Initial
    }
}

impl Client {
    pub fn step(&mut self, challenge: &[u8], props: &Props) -> Result<Step> {
        match self {
            Client::Initial => self.respond(challenge, props),
            Client::Responded { rspauth } => {
                let text = std::str::from_utf8(challenge)
                    .map_err(|_| Error::Malformed("digest-md5 response auth"))?;
                let (_, params) = digest_message(text)
                    .map_err(|_| Error::Malformed("digest-md5 response auth"))?;
                let got =
                    param(&params, "rspauth").ok_or(Error::Malformed("digest-md5 response auth"))?;
                if got == rspauth {
                    Ok(Step::Done(Vec::new()))
                } else {
                    tracing::warn!("server response auth mismatch");
                    Err(Error::AuthenticationFailed)
                }
            }
        }
    }

    fn respond(&mut self, challenge: &[u8], props: &Props) -> Result<Step> {
        let text = std::str::from_utf8(challenge)
            .map_err(|_| Error::Malformed("digest-md5 challenge"))?;
        let (_, params) =
            digest_message(text).map_err(|_| Error::Malformed("digest-md5 challenge"))?;
        let nonce = param(&params, "nonce").ok_or(Error::Malformed("digest-md5 challenge"))?;

        // The realm preference is the caller's, falling back to the first
        // realm the server offered.
        let realm = props
            .get(Property::Realm)
            .or_else(|| param_all(&params, "realm").first().map(|r| r.to_string()))
            .unwrap_or_default();

        let offered = param(&params, "qop").unwrap_or("auth").to_string();
        let chosen = props.get(Property::Qop).unwrap_or_else(|| "auth".to_string());
        let chosen = normalize_qop(&chosen);
        if chosen != "auth" || !offered.split(',').map(str::trim).any(|q| q == chosen) {
            return Err(Error::Malformed("digest-md5 qop"));
        }

        let authid = props.require(Property::AuthId)?;
        let service = props.require(Property::Service)?;
        let hostname = props.require(Property::Hostname)?;
        let digest_uri = format!("{}/{}", service, hostname);
        let authzid = props.get(Property::AuthzId);

        let secret = long_term_secret(props, &authid, &realm)?;
        let mut raw = [0u8; 12];
        thread_rng().fill(&mut raw);
        let cnonce = hex::encode(raw);

        let a1 = a1_hex(secret, nonce, &cnonce, authzid.as_deref());
        let response = response_hex(&a1, nonce, NC_INITIAL, &cnonce, "AUTHENTICATE", &digest_uri);
        let rspauth = response_hex(&a1, nonce, NC_INITIAL, &cnonce, "", &digest_uri);

        let mut pairs = vec![
            ("username", quoted(&authid)),
            ("realm", quoted(&realm)),
            ("nonce", quoted(nonce)),
            ("cnonce", quoted(&cnonce)),
            ("nc", NC_INITIAL.to_string()),
            ("qop", "auth".to_string()),
            ("digest-uri", quoted(&digest_uri)),
            ("response", response),
        ];
        if param(&params, "charset") == Some("utf-8") {
            pairs.push(("charset", "utf-8".to_string()));
        }
        if let Some(az) = &authzid {
            pairs.push(("authzid", quoted(az)));
        }

        *self = Client::Responded { rspauth };
        Ok(Step::NeedsMore(encode::digest_message(&pairs).into_bytes()))
    }
}

#[derive(Debug)]
pub(crate) enum Server {
    Initial,
    Challenged { nonce: String },
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
                let mut raw = [0u8; 16];
                thread_rng().fill(&mut raw);
                let nonce = hex::encode(raw);

                let qops = props
                    .get(Property::Qops)
                    .unwrap_or_else(|| "auth".to_string());
                let mut pairs = Vec::new();
                if let Some(realm) = props.get(Property::Realm) {
                    pairs.push(("realm", quoted(&realm)));
                }
                pairs.push(("nonce", quoted(&nonce)));
                pairs.push(("qop", quoted(&qops)));
                pairs.push(("charset", "utf-8".to_string()));
                pairs.push(("algorithm", "md5-sess".to_string()));

                let challenge = encode::digest_message(&pairs);
                *self = Server::Challenged { nonce };
                Ok(Step::NeedsMore(challenge.into_bytes()))
            }
            Server::Challenged { nonce } => {
                let text = std::str::from_utf8(message)
                    .map_err(|_| Error::Malformed("digest-md5 response"))?;
                let (_, params) =
                    digest_message(text).map_err(|_| Error::Malformed("digest-md5 response"))?;
                let malformed = || Error::Malformed("digest-md5 response");

                let username = param(&params, "username").ok_or_else(malformed)?;
                let realm = param(&params, "realm").unwrap_or_default().to_string();
                let cnonce = param(&params, "cnonce").ok_or_else(malformed)?;
                let digest_uri = param(&params, "digest-uri").ok_or_else(malformed)?;
                let response = param(&params, "response").ok_or_else(malformed)?;
                let authzid = param(&params, "authzid");

                if param(&params, "nonce") != Some(nonce.as_str())
                    || param(&params, "nc").unwrap_or(NC_INITIAL) != NC_INITIAL
                    || normalize_qop(param(&params, "qop").unwrap_or("auth")) != "auth"
                {
                    return Err(Error::AuthenticationFailed);
                }

                let secret = long_term_secret(props, username, &realm)?;
                let a1 = a1_hex(secret, nonce, cnonce, authzid);
                let expected =
                    response_hex(&a1, nonce, NC_INITIAL, cnonce, "AUTHENTICATE", digest_uri);
                if !response.eq_ignore_ascii_case(&expected) {
                    tracing::warn!(username = %username, "digest-md5 response mismatch");
                    return Err(Error::AuthenticationFailed);
                }

                let rspauth = response_hex(&a1, nonce, NC_INITIAL, cnonce, "", digest_uri);
                Ok(Step::Done(format!("rspauth={}", rspauth).into_bytes()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from RFC 2831 section 4.
    const NONCE: &str = "OA6MG9tEQGm2hh";
    const CNONCE: &str = "OA6MHXh6VqTrRk";
    const URI: &str = "imap/elwood.innosoft.com";

    fn example_a1() -> String {
        let secret = secret_hash("chris", "elwood.innosoft.com", "secret");
        a1_hex(secret, NONCE, CNONCE, None)
    }

    #[test]
    fn rfc2831_response_example() {
        let response = response_hex(&example_a1(), NONCE, NC_INITIAL, CNONCE, "AUTHENTICATE", URI);
        assert_eq!(response, "d388dad90d4bbd760a152321f2143af7");
    }

    #[test]
    fn rfc2831_rspauth_example() {
        let rspauth = response_hex(&example_a1(), NONCE, NC_INITIAL, CNONCE, "", URI);
        assert_eq!(rspauth, "ea40f60335c427b5527b84dbabcdfffd");
    }

    #[test]
    fn qop_spellings_normalize() {
        assert_eq!(normalize_qop("qop-auth"), "auth");
        assert_eq!(normalize_qop("auth"), "auth");
        assert_eq!(normalize_qop("qop-conf"), "auth-conf");
    }
}
