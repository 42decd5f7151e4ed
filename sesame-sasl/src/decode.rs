use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take, take_while, take_while1},
    character::complete::{anychar, char, multispace0, satisfy},
    combinator::{map, opt, rest},
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair, terminated, tuple},
    IResult,
};

// -----------------------------------------------------------------
//
// PLAIN (RFC 4616)
//
// -----------------------------------------------------------------

fn not_null(c: u8) -> bool {
    c != 0x0
}

/// authzid, authcid, password
pub fn plain_message(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8], &[u8])> {
    map(
        tuple((
            take_while(not_null),
            take(1usize),
            take_while(not_null),
            take(1usize),
            rest,
        )),
        |(authz, _, authc, _, pass)| (authz, authc, pass),
    )(input)
}

// -----------------------------------------------------------------
//
// DIGEST-MD5 (RFC 2831)
//
// Challenges and responses are comma separated lists of
// `name = ( token | quoted-string )` pairs, with optional linear
// whitespace around separators.
//
// -----------------------------------------------------------------

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && !"()<>@,;:\\\"/[]?={} \t".contains(c)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(is_not("\"\\"), '\\', anychar)),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn auth_param(input: &str) -> IResult<&str, (String, String)> {
    separated_pair(
        map(token, String::from),
        delimited(multispace0, char('='), multispace0),
        alt((quoted_string, map(token, String::from))),
    )(input)
}

pub fn digest_message(input: &str) -> IResult<&str, Vec<(String, String)>> {
    preceded(
        multispace0,
        terminated(
            separated_list1(delimited(multispace0, char(','), multispace0), auth_param),
            multispace0,
        ),
    )(input)
}

/// First value for `name`, case-insensitively.
pub fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Every value for `name`, in order of appearance.
pub fn param_all<'a>(params: &'a [(String, String)], name: &'a str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
        .collect()
}

// -----------------------------------------------------------------
//
// SCRAM (RFC 5802)
//
// -----------------------------------------------------------------

fn scram_attr_val(input: &str) -> IResult<&str, (char, String)> {
    separated_pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        char('='),
        map(is_not(","), String::from),
    )(input)
}

/// Comma separated `x=value` attributes, as found in server-first,
/// server-final and the bare part of client messages.
pub fn scram_message(input: &str) -> IResult<&str, Vec<(char, String)>> {
    separated_list1(char(','), scram_attr_val)(input)
}

pub fn scram_attr(attrs: &[(char, String)], name: char) -> Option<&str> {
    attrs
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, PartialEq)]
pub struct ClientFirst {
    pub cb_flag: char,
    pub authzid: Option<String>,
    /// client-first-message-bare, kept verbatim for the AuthMessage.
    pub bare: String,
    pub username: String,
    pub nonce: String,
}

impl ClientFirst {
    /// The gs2-header exactly as the client sent it.
    pub fn gs2_header(&self) -> String {
        match &self.authzid {
            Some(a) => format!("{},a={},", self.cb_flag, saslname_escape(a)),
            None => format!("{},,", self.cb_flag),
        }
    }
}

pub fn scram_client_first(input: &str) -> IResult<&str, ClientFirst> {
    let (bare, (cb_flag, _, authzid, _)) = tuple((
        alt((char('n'), char('y'))),
        char(','),
        opt(preceded(tag("a="), map(is_not(","), String::from))),
        char(','),
    ))(input)?;
    let (rest, attrs) = scram_message(bare)?;
    let invalid = || {
        nom::Err::Failure(nom::error::Error::new(
            bare,
            nom::error::ErrorKind::Verify,
        ))
    };
    let (username, nonce) = match (scram_attr(&attrs, 'n'), scram_attr(&attrs, 'r')) {
        (Some(n), Some(r)) => (n.to_string(), r.to_string()),
        _ => return Err(invalid()),
    };
    let authzid = match authzid {
        Some(raw) => Some(saslname_unescape(&raw).ok_or_else(invalid)?),
        None => None,
    };
    let username = saslname_unescape(&username).ok_or_else(invalid)?;
    Ok((
        rest,
        ClientFirst {
            cb_flag,
            authzid,
            bare: bare.to_string(),
            username,
            nonce,
        },
    ))
}

/// Undoes `=2C` and `=3D` escaping in a saslname. Returns `None` when a
/// stray `=` makes the name invalid.
pub fn saslname_unescape(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '=' {
            out.push(c);
            continue;
        }
        match (chars.next(), chars.next()) {
            (Some('2'), Some('C')) => out.push(','),
            (Some('3'), Some('D')) => out.push('='),
            _ => return None,
        }
    }
    Some(out)
}

pub fn saslname_escape(name: &str) -> String {
    name.replace('=', "=3D").replace(',', "=2C")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4616_example() {
        let (rest, (authz, authc, pass)) = plain_message(b"\0tim\0tanstaaftanstaaf").unwrap();
        assert!(rest.is_empty());
        assert_eq!(authz, b"");
        assert_eq!(authc, b"tim");
        assert_eq!(pass, b"tanstaaftanstaaf");
    }

    #[test]
    fn plain_with_authzid() {
        let (_, (authz, authc, pass)) = plain_message(b"admin\0tim\0secret").unwrap();
        assert_eq!(authz, b"admin");
        assert_eq!(authc, b"tim");
        assert_eq!(pass, b"secret");
    }

    #[test]
    fn rfc2831_challenge_example() {
        let input = "realm=\"elwood.innosoft.com\", nonce=\"OA6MG9tEQGm2hh\", \
                     qop=\"auth\", algorithm=md5-sess, charset=utf-8";
        let (rest, params) = digest_message(input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(param(&params, "realm"), Some("elwood.innosoft.com"));
        assert_eq!(param(&params, "nonce"), Some("OA6MG9tEQGm2hh"));
        assert_eq!(param(&params, "qop"), Some("auth"));
        assert_eq!(param(&params, "algorithm"), Some("md5-sess"));
    }

    #[test]
    fn digest_quoted_escapes_and_multiple_realms() {
        let (_, params) =
            digest_message("realm=\"a\\\"b\", realm=\"other\", nc=00000001").unwrap();
        assert_eq!(param_all(&params, "realm"), vec!["a\"b", "other"]);
        assert_eq!(param(&params, "nc"), Some("00000001"));
    }

    #[test]
    fn rfc5802_server_first_example() {
        let input = "r=fyko+d2lbbFgONRv9qkxdawLHo+Vgk7qvUOKUwuWLIWg4l/9SraGMHEE,\
                     s=QSXCR+Q6sek8bf92,i=4096";
        let (rest, attrs) = scram_message(input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            scram_attr(&attrs, 'r'),
            Some("fyko+d2lbbFgONRv9qkxdawLHo+Vgk7qvUOKUwuWLIWg4l/9SraGMHEE")
        );
        assert_eq!(scram_attr(&attrs, 's'), Some("QSXCR+Q6sek8bf92"));
        assert_eq!(scram_attr(&attrs, 'i'), Some("4096"));
    }

    #[test]
    fn rfc5802_client_first_example() {
        let (rest, first) =
            scram_client_first("n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL").unwrap();
        assert!(rest.is_empty());
        assert_eq!(first.cb_flag, 'n');
        assert_eq!(first.authzid, None);
        assert_eq!(first.username, "user");
        assert_eq!(first.nonce, "fyko+d2lbbFgONRv9qkxdawL");
        assert_eq!(first.bare, "n=user,r=fyko+d2lbbFgONRv9qkxdawL");
        assert_eq!(first.gs2_header(), "n,,");
    }

    #[test]
    fn saslname_escaping_round_trip() {
        assert_eq!(saslname_escape("a,b=c"), "a=2Cb=3Dc");
        assert_eq!(saslname_unescape("a=2Cb=3Dc").as_deref(), Some("a,b=c"));
        assert_eq!(saslname_unescape("bad=4X"), None);
    }
}
