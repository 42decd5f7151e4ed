//! SCRAM-SHA-1 (RFC 5802).
//!
//! Three client rounds: client-first, client-final with the proof, then
//! verification of the server signature, finishing with an empty output.
//! The salted password can be supplied directly through the
//! ScramSaltedPassword property (40 hex characters) instead of Password.

use base64::Engine;
use hmac::{Hmac, Mac};
use rand::prelude::*;
use sha1::{Digest, Sha1};

use crate::decode::{scram_attr, scram_client_first, scram_message};
use crate::encode;
use crate::mech::Props;
use crate::types::{Error, Property, Result, Step};

type HmacSha1 = Hmac<Sha1>;

const DEFAULT_ITERATIONS: u32 = 4096;

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> [u8; 20] {
    let mut mac = HmacSha1::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn salted_password(props: &Props, salt: &[u8], iterations: u32) -> Result<[u8; 20]> {
    if let Some(hexed) = props.get(Property::ScramSaltedPassword) {
        let raw = hex::decode(&hexed).map_err(|_| Error::Malformed("scram salted password"))?;
        return raw
            .try_into()
            .map_err(|_| Error::Malformed("scram salted password"));
    }
    let password = props.require(Property::Password)?;
    let mut out = [0u8; 20];
    pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut out);
    Ok(out)
}

fn keys_of(salted: &[u8; 20]) -> ([u8; 20], [u8; 20]) {
    let client_key = hmac_sha1(salted, b"Client Key");
    let stored_key: [u8; 20] = Sha1::digest(client_key).into();
    let server_key = hmac_sha1(salted, b"Server Key");
    (stored_key, server_key)
}

fn fresh_nonce() -> String {
    let mut raw = [0u8; 15];
    thread_rng().fill(&mut raw);
    b64(&raw)
}

#[derive(Debug)]
pub(crate) enum Client {
    Initial,
    FirstSent {
        gs2: String,
        bare: String,
        nonce: String,
    },
    FinalSent {
        server_signature: [u8; 20],
    },
}

impl Default for Client {
    fn default() -> Self {
        Client::Initial
    }
}

impl Client {
    pub fn step(&mut self, challenge: &[u8], props: &Props) -> Result<Step> {
        match self {
            Client::Initial => {
                let authid = props.require(Property::AuthId)?;
                let authzid = props.get(Property::AuthzId);
                // Without a -PLUS variant in the catalog, available binding
                // data only flips the gs2 flag to "supported but unused".
                let cb_flag = match props.get(Property::CbTlsUnique) {
                    Some(_) => 'y',
                    None => 'n',
                };
                let nonce = fresh_nonce();
                let gs2 = encode::gs2_header(cb_flag, authzid.as_deref());
                let bare = encode::scram_client_first_bare(&authid, &nonce);
                let out = format!("{}{}", gs2, bare);
                *self = Client::FirstSent { gs2, bare, nonce };
                Ok(Step::NeedsMore(out.into_bytes()))
            }
            Client::FirstSent { gs2, bare, nonce } => {
                let text = std::str::from_utf8(challenge)
                    .map_err(|_| Error::Malformed("scram server first"))?;
                let (_, attrs) =
                    scram_message(text).map_err(|_| Error::Malformed("scram server first"))?;
                if scram_attr(&attrs, 'm').is_some() {
                    return Err(Error::Malformed("scram server first"));
                }
                let server_nonce = scram_attr(&attrs, 'r')
                    .ok_or(Error::Malformed("scram server first"))?
                    .to_string();
                if !server_nonce.starts_with(nonce.as_str()) || server_nonce.len() <= nonce.len() {
                    tracing::warn!("server nonce does not extend the client nonce");
                    return Err(Error::AuthenticationFailed);
                }
                let salt = base64::engine::general_purpose::STANDARD
                    .decode(scram_attr(&attrs, 's').ok_or(Error::Malformed("scram server first"))?)?;
                let iterations: u32 = scram_attr(&attrs, 'i')
                    .ok_or(Error::Malformed("scram server first"))?
                    .parse()
                    .map_err(|_| Error::Malformed("scram server first"))?;

                let salted = salted_password(props, &salt, iterations)?;
                let client_key = hmac_sha1(&salted, b"Client Key");
                let stored_key: [u8; 20] = Sha1::digest(client_key).into();
                let server_key = hmac_sha1(&salted, b"Server Key");

                let without_proof =
                    encode::scram_client_final_without_proof(gs2, &server_nonce);
                let auth_message = format!("{},{},{}", bare, text, without_proof);
                let client_signature = hmac_sha1(&stored_key, auth_message.as_bytes());
                let proof: Vec<u8> = client_key
                    .iter()
                    .zip(client_signature)
                    .map(|(k, s)| k ^ s)
                    .collect();
                let server_signature = hmac_sha1(&server_key, auth_message.as_bytes());

                let out = format!("{},p={}", without_proof, b64(&proof));
                *self = Client::FinalSent { server_signature };
                Ok(Step::NeedsMore(out.into_bytes()))
            }
            Client::FinalSent { server_signature } => {
                let text = std::str::from_utf8(challenge)
                    .map_err(|_| Error::Malformed("scram server final"))?;
                let (_, attrs) =
                    scram_message(text).map_err(|_| Error::Malformed("scram server final"))?;
                if let Some(err) = scram_attr(&attrs, 'e') {
                    tracing::warn!(server_error = %err, "server rejected authentication");
                    return Err(Error::AuthenticationFailed);
                }
                let verifier = scram_attr(&attrs, 'v').ok_or(Error::Malformed("scram server final"))?;
                let verifier = base64::engine::general_purpose::STANDARD.decode(verifier)?;
                if verifier.as_slice() == &server_signature[..] {
                    Ok(Step::Done(Vec::new()))
                } else {
                    tracing::warn!("server signature mismatch");
                    Err(Error::AuthenticationFailed)
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) enum Server {
    Initial,
    FirstSent {
        server_first: String,
        bare: String,
        gs2_header: String,
        full_nonce: String,
        stored_key: [u8; 20],
        server_key: [u8; 20],
    },
}

impl Default for Server {
    fn default() -> Self {
        Server::Initial
    }
}

impl Server {
    pub fn step(&mut self, message: &[u8], props: &Props) -> Result<Step> {
        match self {
            // SCRAM servers cannot speak first; an empty input just keeps
            // the session waiting for client-first.
            Server::Initial if message.is_empty() => Ok(Step::NeedsMore(Vec::new())),
            Server::Initial => {
                let text = std::str::from_utf8(message)
                    .map_err(|_| Error::Malformed("scram client first"))?;
                let (_, first) = scram_client_first(text)
                    .map_err(|_| Error::Malformed("scram client first"))?;

                let full_nonce = format!("{}{}", first.nonce, fresh_nonce());
                let salt = match props.get(Property::ScramSalt) {
                    Some(encoded) => base64::engine::general_purpose::STANDARD.decode(encoded)?,
                    None => {
                        let mut raw = [0u8; 16];
                        thread_rng().fill(&mut raw);
                        raw.to_vec()
                    }
                };
                let iterations = match props.get(Property::ScramIter) {
                    Some(value) => value
                        .parse()
                        .map_err(|_| Error::Malformed("scram iteration count"))?,
                    None => DEFAULT_ITERATIONS,
                };

                let salted = salted_password(props, &salt, iterations)?;
                let (stored_key, server_key) = keys_of(&salted);

                let server_first = format!("r={},s={},i={}", full_nonce, b64(&salt), iterations);
                *self = Server::FirstSent {
                    server_first: server_first.clone(),
                    bare: first.bare.clone(),
                    gs2_header: first.gs2_header(),
                    full_nonce,
                    stored_key,
                    server_key,
                };
                Ok(Step::NeedsMore(server_first.into_bytes()))
            }
            Server::FirstSent {
                server_first,
                bare,
                gs2_header,
                full_nonce,
                stored_key,
                server_key,
            } => {
                let text = std::str::from_utf8(message)
                    .map_err(|_| Error::Malformed("scram client final"))?;
                let (_, attrs) =
                    scram_message(text).map_err(|_| Error::Malformed("scram client final"))?;

                let channel = scram_attr(&attrs, 'c').ok_or(Error::Malformed("scram client final"))?;
                let channel = base64::engine::general_purpose::STANDARD.decode(channel)?;
                if channel != gs2_header.as_bytes() {
                    tracing::warn!("channel binding data does not match the gs2 header");
                    return Err(Error::AuthenticationFailed);
                }
                if scram_attr(&attrs, 'r') != Some(full_nonce.as_str()) {
                    return Err(Error::AuthenticationFailed);
                }
                let proof = scram_attr(&attrs, 'p').ok_or(Error::Malformed("scram client final"))?;
                let proof = base64::engine::general_purpose::STANDARD.decode(proof)?;
                let (without_proof, _) = text
                    .rsplit_once(",p=")
                    .ok_or(Error::Malformed("scram client final"))?;

                let auth_message = format!("{},{},{}", bare, server_first, without_proof);
                let client_signature = hmac_sha1(&stored_key[..], auth_message.as_bytes());
                let client_key: Vec<u8> = proof
                    .iter()
                    .zip(client_signature)
                    .map(|(p, s)| p ^ s)
                    .collect();
                let recovered: [u8; 20] = Sha1::digest(&client_key).into();
                if recovered != *stored_key {
                    tracing::warn!("client proof mismatch");
                    return Err(Error::AuthenticationFailed);
                }

                let server_signature = hmac_sha1(&server_key[..], auth_message.as_bytes());
                Ok(Step::Done(format!("v={}", b64(&server_signature)).into_bytes()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from RFC 5802 section 5.
    const CLIENT_FIRST_BARE: &str = "n=user,r=fyko+d2lbbFgONRv9qkxdawL";
    const SERVER_FIRST: &str =
        "r=fyko+d2lbbFgONRv9qkxdawLHo+Vgk7qvUOKUwuWLIWg4l/9SraGMHEE,s=QSXCR+Q6sek8bf92,i=4096";
    const WITHOUT_PROOF: &str =
        "c=biws,r=fyko+d2lbbFgONRv9qkxdawLHo+Vgk7qvUOKUwuWLIWg4l/9SraGMHEE";

    fn example_salted() -> [u8; 20] {
        let salt = base64::engine::general_purpose::STANDARD
            .decode("QSXCR+Q6sek8bf92")
            .unwrap();
        let mut out = [0u8; 20];
        pbkdf2::pbkdf2_hmac::<Sha1>(b"pencil", &salt, 4096, &mut out);
        out
    }

    #[test]
    fn rfc5802_salted_password() {
        assert_eq!(
            hex::encode(example_salted()),
            "1d96ee3a529b5a5f9e47c01f229a2cb8a6e15f7d"
        );
    }

    #[test]
    fn rfc5802_client_proof() {
        let salted = example_salted();
        let client_key = hmac_sha1(&salted, b"Client Key");
        let stored_key: [u8; 20] = Sha1::digest(client_key).into();
        let auth_message =
            format!("{},{},{}", CLIENT_FIRST_BARE, SERVER_FIRST, WITHOUT_PROOF);
        let signature = hmac_sha1(&stored_key, auth_message.as_bytes());
        let proof: Vec<u8> = client_key.iter().zip(signature).map(|(k, s)| k ^ s).collect();
        assert_eq!(b64(&proof), "v0X8v3Bz2T0CJGbJQyF0X+HI4Ts=");
    }

    #[test]
    fn rfc5802_server_signature() {
        let salted = example_salted();
        let server_key = hmac_sha1(&salted, b"Server Key");
        let auth_message =
            format!("{},{},{}", CLIENT_FIRST_BARE, SERVER_FIRST, WITHOUT_PROOF);
        let signature = hmac_sha1(&server_key, auth_message.as_bytes());
        assert_eq!(b64(&signature), "rmF9pqV8S7suAoZWja4dJRkFsKQ=");
    }
}
