use std::sync::Arc;

use sesame_sasl::{ClientSession, Mechanism, Step64};

use crate::error::AuthError;
use crate::params::{keys, SessionData};
use crate::plugin::{Signal, SignonPlugin};
use crate::policy;

struct ActiveSession {
    client: ClientSession,
    /// The bag retained at request_initial; the sole source for property
    /// lookups until the session ends, whatever later requests carry.
    data: Arc<SessionData>,
}

/// The SASL plugin: drives one authentication attempt at a time through
/// the mechanism engine.
#[derive(Default)]
pub struct SaslPlugin {
    session: Option<ActiveSession>,
}

impl SaslPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_session(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("discarded mechanism session");
        }
    }

    /// Runs one mechanism step and turns its outcome into a signal.
    fn step_iteration(&mut self, challenge: Option<&str>) -> Signal {
        let active = match self.session.as_mut() {
            Some(active) => active,
            None => {
                return Signal::Error(AuthError::WrongState(
                    "request_initial needs to be issued first".to_string(),
                ))
            }
        };
        let ActiveSession { client, data } = active;
        match client.step64(challenge, data.as_ref()) {
            Ok(Step64::Done(response)) => {
                self.reset_session();
                let mut out = SessionData::new();
                out.set(keys::RESPONSE_BASE64, response);
                Signal::ResponseFinal(out)
            }
            Ok(Step64::NeedsMore(response)) => {
                let mut out = SessionData::new();
                out.set(keys::RESPONSE_BASE64, response);
                Signal::Response(out)
            }
            Err(err) => {
                tracing::warn!(error = %err, "mechanism step failed");
                Signal::Error(AuthError::NotAuthorized(format!(
                    "Authorization error {}",
                    err.code()
                )))
            }
        }
    }
}

impl SignonPlugin for SaslPlugin {
    fn plugin_type(&self) -> &'static str {
        "sasl"
    }

    fn mechanisms(&self) -> Vec<&'static str> {
        Mechanism::ALL.iter().map(|m| m.name()).collect()
    }

    fn request_initial(
        &mut self,
        session_data: Arc<SessionData>,
        _identity_method_cache: Option<&SessionData>,
        mechanism: &str,
    ) -> Signal {
        if let Err(err) = policy::authorize(&session_data) {
            return Signal::Error(err);
        }

        self.reset_session();

        let client = match ClientSession::start(mechanism) {
            Ok(client) => client,
            Err(err) => {
                return Signal::Error(AuthError::OperationNotSupported(format!(
                    "Couldn't initialize sasl session, error {}",
                    err.code()
                )))
            }
        };
        tracing::info!(mechanism = %mechanism, "authentication attempt started");
        self.session = Some(ActiveSession {
            client,
            data: session_data.clone(),
        });
        self.step_iteration(session_data.get(keys::CHALLENGE_BASE64))
    }

    fn request(&mut self, session_data: &SessionData) -> Signal {
        if self.session.is_none() {
            return Signal::Error(AuthError::WrongState(
                "request_initial needs to be issued first".to_string(),
            ));
        }
        self.step_iteration(session_data.get(keys::CHALLENGE_BASE64))
    }

    fn user_action_finished(&mut self, _session_data: &SessionData) -> Signal {
        Signal::Error(AuthError::WrongState(
            "SASL plugin doesn't support user actions".to_string(),
        ))
    }

    fn refresh(&mut self, _session_data: &SessionData) -> Signal {
        Signal::Error(AuthError::WrongState(
            "SASL plugin doesn't support refresh".to_string(),
        ))
    }

    /// Always answers with SessionCanceled; an active mechanism session is
    /// discarded so the attempt cannot be resumed.
    fn cancel(&mut self) -> Signal {
        self.reset_session();
        Signal::Error(AuthError::SessionCanceled)
    }
}
