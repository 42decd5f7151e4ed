use std::collections::HashMap;

use base64::Engine;

use crate::callback::Callback;
use crate::mech::{anonymous, cram_md5, digest_md5, plain, scram, Props};
use crate::types::{Error, Mechanism, Property, Result, Step, Step64};

fn decode64(input: Option<&str>) -> Result<Vec<u8>> {
    match input {
        None | Some("") => Ok(Vec::new()),
        Some(encoded) => Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?),
    }
}

fn encode64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[derive(Debug)]
enum ClientState {
    Anonymous(anonymous::Client),
    Plain(plain::Client),
    CramMd5(cram_md5::Client),
    DigestMd5(digest_md5::Client),
    ScramSha1(scram::Client),
    Finished,
}

/// One in-progress client-side negotiation.
///
/// The session owns per-mechanism state and a local property store; all
/// other property lookups go through the [`Callback`] passed to each step.
#[derive(Debug)]
pub struct ClientSession {
    mechanism: Mechanism,
    properties: HashMap<Property, String>,
    state: ClientState,
}

impl ClientSession {
    /// Begins a client session for a mechanism name, e.g. "SCRAM-SHA-1".
    pub fn start(mechanism: &str) -> Result<Self> {
        let mechanism = Mechanism::parse(mechanism)
            .ok_or_else(|| Error::UnknownMechanism(mechanism.to_string()))?;
        Ok(Self::for_mechanism(mechanism))
    }

    pub fn for_mechanism(mechanism: Mechanism) -> Self {
        tracing::debug!(mechanism = %mechanism, "starting client session");
        let state = match mechanism {
            Mechanism::Anonymous => ClientState::Anonymous(Default::default()),
            Mechanism::Plain => ClientState::Plain(Default::default()),
            Mechanism::CramMd5 => ClientState::CramMd5(Default::default()),
            Mechanism::DigestMd5 => ClientState::DigestMd5(Default::default()),
            Mechanism::ScramSha1 => ClientState::ScramSha1(Default::default()),
        };
        Self {
            mechanism,
            properties: HashMap::new(),
            state,
        }
    }

    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// Sets a session-local property, consulted before the callback.
    pub fn set_property(&mut self, property: Property, value: impl Into<String>) {
        self.properties.insert(property, value.into());
    }

    /// Performs one mechanism step over raw bytes.
    pub fn step(&mut self, challenge: &[u8], callback: &dyn Callback) -> Result<Step> {
        let Self {
            mechanism,
            properties,
            state,
        } = self;
        let props = Props {
            local: properties,
            callback,
        };
        let outcome = match state {
            ClientState::Anonymous(m) => m.step(challenge, &props),
            ClientState::Plain(m) => m.step(challenge, &props),
            ClientState::CramMd5(m) => m.step(challenge, &props),
            ClientState::DigestMd5(m) => m.step(challenge, &props),
            ClientState::ScramSha1(m) => m.step(challenge, &props),
            ClientState::Finished => Err(Error::SessionFinished),
        }?;
        if matches!(outcome, Step::Done(_)) {
            *state = ClientState::Finished;
        }
        tracing::trace!(
            mechanism = %mechanism,
            done = matches!(outcome, Step::Done(_)),
            "client step"
        );
        Ok(outcome)
    }

    /// Performs one step over base64 input and output. `None` and `""`
    /// both stand for an empty challenge.
    pub fn step64(&mut self, challenge: Option<&str>, callback: &dyn Callback) -> Result<Step64> {
        let challenge = decode64(challenge)?;
        Ok(match self.step(&challenge, callback)? {
            Step::Done(out) => Step64::Done(encode64(&out)),
            Step::NeedsMore(out) => Step64::NeedsMore(encode64(&out)),
        })
    }
}

#[derive(Debug)]
enum ServerState {
    Anonymous(anonymous::Server),
    Plain(plain::Server),
    CramMd5(cram_md5::Server),
    DigestMd5(digest_md5::Server),
    ScramSha1(scram::Server),
    Finished,
}

/// Server-side counterpart of [`ClientSession`], used by test harnesses
/// and loopback drivers to generate challenges and verify responses.
#[derive(Debug)]
pub struct ServerSession {
    mechanism: Mechanism,
    properties: HashMap<Property, String>,
    state: ServerState,
}

impl ServerSession {
    pub fn start(mechanism: &str) -> Result<Self> {
        let mechanism = Mechanism::parse(mechanism)
            .ok_or_else(|| Error::UnknownMechanism(mechanism.to_string()))?;
        Ok(Self::for_mechanism(mechanism))
    }

    pub fn for_mechanism(mechanism: Mechanism) -> Self {
        tracing::debug!(mechanism = %mechanism, "starting server session");
        let state = match mechanism {
            Mechanism::Anonymous => ServerState::Anonymous(Default::default()),
            Mechanism::Plain => ServerState::Plain(Default::default()),
            Mechanism::CramMd5 => ServerState::CramMd5(Default::default()),
            Mechanism::DigestMd5 => ServerState::DigestMd5(Default::default()),
            Mechanism::ScramSha1 => ServerState::ScramSha1(Default::default()),
        };
        Self {
            mechanism,
            properties: HashMap::new(),
            state,
        }
    }

    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    pub fn set_property(&mut self, property: Property, value: impl Into<String>) {
        self.properties.insert(property, value.into());
    }

    /// Consumes one client message (or an empty buffer to let the server
    /// speak first) and produces the next challenge or the final data.
    pub fn step(&mut self, message: &[u8], callback: &dyn Callback) -> Result<Step> {
        let Self {
            mechanism,
            properties,
            state,
        } = self;
        let props = Props {
            local: properties,
            callback,
        };
        let outcome = match state {
            ServerState::Anonymous(m) => m.step(message, &props),
            ServerState::Plain(m) => m.step(message, &props),
            ServerState::CramMd5(m) => m.step(message, &props),
            ServerState::DigestMd5(m) => m.step(message, &props),
            ServerState::ScramSha1(m) => m.step(message, &props),
            ServerState::Finished => Err(Error::SessionFinished),
        }?;
        if matches!(outcome, Step::Done(_)) {
            *state = ServerState::Finished;
        }
        tracing::trace!(
            mechanism = %mechanism,
            done = matches!(outcome, Step::Done(_)),
            "server step"
        );
        Ok(outcome)
    }

    pub fn step64(&mut self, message: Option<&str>, callback: &dyn Callback) -> Result<Step64> {
        let message = decode64(message)?;
        Ok(match self.step(&message, callback)? {
            Step::Done(out) => Step64::Done(encode64(&out)),
            Step::NeedsMore(out) => Step64::NeedsMore(encode64(&out)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NoCallback;

    fn need(step: Step) -> Vec<u8> {
        match step {
            Step::NeedsMore(out) => out,
            Step::Done(_) => panic!("negotiation concluded too early"),
        }
    }

    fn done(step: Step) -> Vec<u8> {
        match step {
            Step::Done(out) => out,
            Step::NeedsMore(_) => panic!("negotiation still in progress"),
        }
    }

    #[test]
    fn anonymous_loopback() {
        let mut client = ClientSession::start("ANONYMOUS").unwrap();
        client.set_property(Property::AnonymousToken, "megauser@example.com");
        let mut server = ServerSession::start("ANONYMOUS").unwrap();

        let token = done(client.step(b"", &NoCallback).unwrap());
        assert!(token.starts_with(b"megauser@example.com"));
        assert!(done(server.step(&token, &NoCallback).unwrap()).is_empty());
    }

    #[test]
    fn plain_loopback() {
        let mut client = ClientSession::start("PLAIN").unwrap();
        client.set_property(Property::AuthId, "megauser@example.com");
        client.set_property(Property::Password, "megapassword");
        let mut server = ServerSession::start("PLAIN").unwrap();
        server.set_property(Property::Password, "megapassword");

        let message = done(client.step(b"", &NoCallback).unwrap());
        assert!(done(server.step(&message, &NoCallback).unwrap()).is_empty());
    }

    #[test]
    fn cram_md5_loopback() {
        let mut server = ServerSession::start("CRAM-MD5").unwrap();
        server.set_property(Property::Password, "megapassword");
        let challenge = need(server.step(b"", &NoCallback).unwrap());

        let mut client = ClientSession::start("CRAM-MD5").unwrap();
        client.set_property(Property::AuthId, "megauser@example.com");
        client.set_property(Property::Password, "megapassword");
        let response = done(client.step(&challenge, &NoCallback).unwrap());
        assert!(done(server.step(&response, &NoCallback).unwrap()).is_empty());
    }

    #[test]
    fn cram_md5_wrong_password_rejected() {
        let mut server = ServerSession::start("CRAM-MD5").unwrap();
        server.set_property(Property::Password, "megapassword");
        let challenge = need(server.step(b"", &NoCallback).unwrap());

        let mut client = ClientSession::start("CRAM-MD5").unwrap();
        client.set_property(Property::AuthId, "megauser@example.com");
        client.set_property(Property::Password, "guessword");
        let response = done(client.step(&challenge, &NoCallback).unwrap());
        assert!(matches!(
            server.step(&response, &NoCallback),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn digest_md5_loopback() {
        let mut server = ServerSession::start("DIGEST-MD5").unwrap();
        server.set_property(Property::Password, "megapassword");
        let challenge = need(server.step(b"", &NoCallback).unwrap());

        let mut client = ClientSession::start("DIGEST-MD5").unwrap();
        client.set_property(Property::AuthId, "megauser@example.com");
        client.set_property(Property::Password, "megapassword");
        client.set_property(Property::Service, "megaservice");
        client.set_property(Property::Hostname, "megahostname");

        let response = need(client.step(&challenge, &NoCallback).unwrap());
        let rspauth = done(server.step(&response, &NoCallback).unwrap());
        assert!(rspauth.starts_with(b"rspauth="));
        assert!(done(client.step(&rspauth, &NoCallback).unwrap()).is_empty());
    }

    #[test]
    fn scram_sha_1_loopback() {
        let mut server = ServerSession::start("SCRAM-SHA-1").unwrap();
        server.set_property(Property::Password, "megapassword");
        // SCRAM servers have nothing to say before client-first.
        assert!(need(server.step(b"", &NoCallback).unwrap()).is_empty());

        let mut client = ClientSession::start("SCRAM-SHA-1").unwrap();
        client.set_property(Property::AuthId, "megauser@example.com");
        client.set_property(Property::Password, "megapassword");

        let client_first = need(client.step(b"", &NoCallback).unwrap());
        let server_first = need(server.step(&client_first, &NoCallback).unwrap());
        let client_final = need(client.step(&server_first, &NoCallback).unwrap());
        let server_final = done(server.step(&client_final, &NoCallback).unwrap());
        assert!(server_final.starts_with(b"v="));
        assert!(done(client.step(&server_final, &NoCallback).unwrap()).is_empty());
    }

    #[test]
    fn scram_accepts_salted_password_property() {
        let mut server = ServerSession::start("SCRAM-SHA-1").unwrap();
        server.set_property(Property::Password, "pencil");
        server.set_property(Property::ScramSalt, "QSXCR+Q6sek8bf92");
        server.set_property(Property::ScramIter, "4096");

        let mut client = ClientSession::start("SCRAM-SHA-1").unwrap();
        client.set_property(Property::AuthId, "user");
        // RFC 5802 salted form of "pencil" under the salt above.
        client.set_property(
            Property::ScramSaltedPassword,
            "1d96ee3a529b5a5f9e47c01f229a2cb8a6e15f7d",
        );

        let client_first = need(client.step(b"", &NoCallback).unwrap());
        let server_first = need(server.step(&client_first, &NoCallback).unwrap());
        let client_final = need(client.step(&server_first, &NoCallback).unwrap());
        let server_final = done(server.step(&client_final, &NoCallback).unwrap());
        assert!(done(client.step(&server_final, &NoCallback).unwrap()).is_empty());
    }

    #[test]
    fn step64_wraps_base64() {
        let mut client = ClientSession::start("ANONYMOUS").unwrap();
        client.set_property(Property::AnonymousToken, "tok");
        match client.step64(None, &NoCallback).unwrap() {
            Step64::Done(out) => assert_eq!(out, "dG9r"),
            Step64::NeedsMore(_) => panic!("anonymous is single step"),
        }
    }

    #[test]
    fn step64_rejects_invalid_base64() {
        let mut client = ClientSession::start("PLAIN").unwrap();
        assert!(matches!(
            client.step64(Some("!!!"), &NoCallback),
            Err(Error::Base64(_))
        ));
    }

    #[test]
    fn step_after_done_fails() {
        let mut client = ClientSession::start("ANONYMOUS").unwrap();
        client.set_property(Property::AnonymousToken, "tok");
        client.step(b"", &NoCallback).unwrap();
        assert!(matches!(
            client.step(b"", &NoCallback),
            Err(Error::SessionFinished)
        ));
    }

    #[test]
    fn unknown_mechanism_is_reported() {
        let err = ClientSession::start("LOGIN").unwrap_err();
        assert!(matches!(err, Error::UnknownMechanism(_)));
        assert_eq!(err.code(), 2);
    }
}
