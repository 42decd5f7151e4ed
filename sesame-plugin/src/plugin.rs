//! The contract between a plugin and its host single sign-on framework.

use std::sync::Arc;

use crate::error::AuthError;
use crate::params::SessionData;

/// One emission back to the host framework.
///
/// Every inbound operation produces exactly one signal; the host adapter
/// translates it into whatever notification scheme it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Intermediate client response under `ResponseBase64`; the server is
    /// expected to answer with another challenge.
    Response(SessionData),
    /// Terminal client response under `ResponseBase64`; no further
    /// challenges are expected.
    ResponseFinal(SessionData),
    /// The attempt failed or was abandoned.
    Error(AuthError),
}

impl Signal {
    /// The response payload, when the signal carries one.
    pub fn response_base64(&self) -> Option<&str> {
        match self {
            Signal::Response(data) | Signal::ResponseFinal(data) => data.response_base64(),
            Signal::Error(_) => None,
        }
    }
}

/// Inbound operations a host framework issues against a plugin.
pub trait SignonPlugin {
    /// The fixed method type of this plugin, e.g. "sasl".
    fn plugin_type(&self) -> &'static str;

    /// Supported mechanism names, in advertisement order.
    fn mechanisms(&self) -> Vec<&'static str>;

    /// Begins a new authentication attempt. Any prior attempt is
    /// discarded first. The identity method cache is ignored by
    /// mechanisms that have no use for it.
    fn request_initial(
        &mut self,
        session_data: Arc<SessionData>,
        identity_method_cache: Option<&SessionData>,
        mechanism: &str,
    ) -> Signal;

    /// Supplies the next server challenge of an attempt started with
    /// [`SignonPlugin::request_initial`].
    fn request(&mut self, session_data: &SessionData) -> Signal;

    fn user_action_finished(&mut self, session_data: &SessionData) -> Signal;

    fn refresh(&mut self, session_data: &SessionData) -> Signal;

    /// Abandons the current attempt.
    fn cancel(&mut self) -> Signal;
}
