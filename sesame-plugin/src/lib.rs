//! Client-side SASL authentication plugin for single sign-on frameworks.
//!
//! The plugin implements the client end of several commonly used SASL
//! mechanisms: ANONYMOUS, PLAIN, CRAM-MD5, DIGEST-MD5 and SCRAM-SHA-1. It
//! takes a mechanism name and mechanism-specific parameters, and produces a
//! final or an intermediate response string for the application to transmit
//! to the server. After an intermediate response the server returns a
//! challenge string, which is handed back to the plugin, until a final
//! response concludes the authentication. The plugin performs no network
//! I/O itself; challenges and responses travel as base64 strings in the
//! parameter bag.
//!
//! ## Authorization sequence
//!
//! A sequence begins with [`SignonPlugin::request_initial`], giving one of
//! the names from [`SignonPlugin::mechanisms`] and a [`SessionData`] bag
//! with the entries the mechanism needs. The call answers with one
//! [`Signal`]:
//!
//! - [`Signal::ResponseFinal`] — the sequence ended successfully and the
//!   final client response, encoded in base64, sits under the
//!   `ResponseBase64` key.
//! - [`Signal::Response`] — an intermediate response, same key and
//!   encoding. The server's next challenge goes back in through
//!   [`SignonPlugin::request`] under the `ChallengeBase64` key, after which
//!   another response or the final response follows.
//! - [`Signal::Error`] — the sequence failed and stops here.
//!
//! [`SignonPlugin::cancel`] abandons the attempt at any point and answers
//! with an [`AuthError::SessionCanceled`] error signal.
//!
//! ## Parameters
//!
//! - ANONYMOUS needs an anonymous trace token (`AnonymousToken`).
//! - PLAIN needs the authentication identity and password, and optionally
//!   an authorization identity (`Authzid`).
//! - CRAM-MD5 needs the identity, the password and the initial server
//!   challenge.
//! - DIGEST-MD5 needs the identity, password, service, hostname, the
//!   allowed realms list and the initial server challenge; optionally a
//!   realm, a quality of protection (`Qop`) and an authorization identity.
//!   One response/challenge round precedes the final response.
//! - SCRAM-SHA-1 needs the identity, the initial (empty) server challenge,
//!   and either the password or a precomputed `ScramSaltedPassword` (40
//!   hex characters); optionally an authorization identity and
//!   `CbTlsUnique` channel binding data. Two response/challenge rounds
//!   precede the final response.
//!
//! The allowed realms list must be present whenever a `Realm` or
//! `Hostname` entry is supplied; attempts with a realm outside the list or
//! a hostname outside every listed domain are rejected before any
//! mechanism step runs.

pub mod error;
pub mod params;
pub mod plugin;
pub mod session;

mod policy;
mod resolver;

pub use error::AuthError;
pub use params::{keys, SessionData};
pub use plugin::{Signal, SignonPlugin};
pub use session::SaslPlugin;
