pub mod callback;
pub mod decode;
pub mod encode;
pub mod flow;
/// Standalone SASL mechanism engine
///
/// ## Trace
///
/// ```text
/// C: ANONYMOUS
/// C: megauser@example.com
/// S: (accepted)
///
/// S: realm="megahostname",nonce="...",qop="auth",charset=utf-8,algorithm=md5-sess
/// C: username="megauser@example.com",realm="megahostname",nonce="...",cnonce="...",
///    nc=00000001,qop=auth,digest-uri="megaservice/megahostname",response=...
/// S: rspauth=...
/// C: (empty, concluded)
/// ```
///
/// ## RFC References
///
/// SASL framework - https://datatracker.ietf.org/doc/html/rfc4422
///
/// ANONYMOUS - https://datatracker.ietf.org/doc/html/rfc4505
/// PLAIN - https://datatracker.ietf.org/doc/html/rfc4616
/// CRAM-MD5 - https://datatracker.ietf.org/doc/html/rfc2195
/// DIGEST-MD5 - https://datatracker.ietf.org/doc/html/rfc2831
/// SCRAM-SHA-1 - https://datatracker.ietf.org/doc/html/rfc5802
pub mod types;

mod mech;

pub use callback::{Callback, NoCallback};
pub use flow::{ClientSession, ServerSession};
pub use types::{Error, Mechanism, Property, Result, Step, Step64};
