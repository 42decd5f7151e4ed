use base64::Engine;

use crate::decode::saslname_escape;

/// Backslash-quotes a value into a DIGEST-MD5 quoted-string.
pub fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Joins pre-formatted `name=value` pairs into a DIGEST-MD5 message.
pub fn digest_message(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn gs2_header(cb_flag: char, authzid: Option<&str>) -> String {
    match authzid {
        Some(a) => format!("{},a={},", cb_flag, saslname_escape(a)),
        None => format!("{},,", cb_flag),
    }
}

pub fn scram_client_first_bare(username: &str, nonce: &str) -> String {
    format!("n={},r={}", saslname_escape(username), nonce)
}

/// client-final-message-without-proof; `c=` carries the base64 gs2-header.
pub fn scram_client_final_without_proof(gs2_header: &str, server_nonce: &str) -> String {
    format!(
        "c={},r={}",
        base64::engine::general_purpose::STANDARD.encode(gs2_header),
        server_nonce
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quoted("plain"), "\"plain\"");
        assert_eq!(quoted("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn digest_message_joins_pairs() {
        let msg = digest_message(&[
            ("nc", "00000001".to_string()),
            ("qop", "auth".to_string()),
        ]);
        assert_eq!(msg, "nc=00000001,qop=auth");
    }

    #[test]
    fn rfc5802_gs2_and_channel() {
        assert_eq!(gs2_header('n', None), "n,,");
        assert_eq!(gs2_header('y', Some("adm,in")), "y,a=adm=2Cin,");
        assert_eq!(
            scram_client_final_without_proof("n,,", "fyko+d2lbbFgONRv9qkxdawLHo+Vgk7qvUOKUwuWLIWg4l/9SraGMHEE"),
            "c=biws,r=fyko+d2lbbFgONRv9qkxdawLHo+Vgk7qvUOKUwuWLIWg4l/9SraGMHEE"
        );
    }
}
