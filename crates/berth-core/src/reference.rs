//! Stringified object references.
//!
//! An offer advertises a reference of the form `identity[:endpoint]*`, where an
//! endpoint is a protocol followed by options, e.g.
//! `greeter:tcp -h localhost -p 10000:udp -p 10001`. A reference without
//! endpoints is indirect and left for the registry's locator to resolve.
//!
//! `:` separates endpoints, so an option value containing one (an IPv6 host)
//! must be double-quoted: `greeter:tcp -h "::1" -p 10000`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("reference is empty")]
    Empty,

    #[error("invalid identity '{0}'")]
    InvalidIdentity(String),

    #[error("empty endpoint")]
    EmptyEndpoint,

    #[error("invalid protocol '{0}'")]
    InvalidProtocol(String),

    #[error("unexpected token '{token}' in endpoint '{endpoint}'")]
    UnexpectedToken { endpoint: String, token: String },

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("unterminated quote in '{0}'")]
    UnterminatedQuote(String),
}

/// One endpoint option: `-h localhost` or a bare flag like `-z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointOption {
    pub flag: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: String,
    pub options: Vec<EndpointOption>,
}

impl Endpoint {
    /// Value of option `flag` (e.g. `"-h"`), if present with a value.
    pub fn option(&self, flag: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|opt| opt.flag == flag)
            .and_then(|opt| opt.value.as_deref())
    }

    pub fn host(&self) -> Option<&str> {
        self.option("-h")
    }

    pub fn port(&self) -> Option<u16> {
        self.option("-p").and_then(|p| p.parse().ok())
    }
}

impl FromStr for Endpoint {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace().peekable();
        let protocol = tokens.next().ok_or(ReferenceError::EmptyEndpoint)?;
        if !protocol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ReferenceError::InvalidProtocol(protocol.to_string()));
        }

        let mut options = Vec::new();
        while let Some(token) = tokens.next() {
            if !token.starts_with('-') || token.len() < 2 {
                return Err(ReferenceError::UnexpectedToken {
                    endpoint: s.trim().to_string(),
                    token: token.to_string(),
                });
            }
            let value = match tokens.peek() {
                Some(next) if !next.starts_with('-') => {
                    tokens.next().map(|v| v.trim_matches('"').to_string())
                }
                _ => None,
            };
            if token == "-p" {
                let port = value.as_deref().unwrap_or_default();
                port.parse::<u16>()
                    .map_err(|_| ReferenceError::InvalidPort(port.to_string()))?;
            }
            options.push(EndpointOption {
                flag: token.to_string(),
                value,
            });
        }

        Ok(Endpoint {
            protocol: protocol.to_string(),
            options,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.protocol)?;
        for opt in &self.options {
            write!(f, " {}", opt.flag)?;
            match opt.value {
                Some(ref value) if value.contains(':') => write!(f, " \"{value}\"")?,
                Some(ref value) => write!(f, " {value}")?,
                None => {}
            }
        }
        Ok(())
    }
}

/// A parsed object reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    identity: String,
    endpoints: Vec<Endpoint>,
}

impl ObjectReference {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// True when the reference carries no endpoints.
    pub fn is_indirect(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl FromStr for ObjectReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let mut parts = split_unquoted(s)?.into_iter();
        let identity = parts.next().unwrap_or_default().trim();
        if identity.is_empty() || identity.chars().any(char::is_whitespace) {
            return Err(ReferenceError::InvalidIdentity(identity.to_string()));
        }

        let endpoints = parts
            .map(|part| part.parse::<Endpoint>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ObjectReference {
            identity: identity.to_string(),
            endpoints,
        })
    }
}

/// Split on `:` outside double quotes.
fn split_unquoted(s: &str) -> Result<Vec<&str>, ReferenceError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(ReferenceError::UnterminatedQuote(s.to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)?;
        for endpoint in &self.endpoints {
            write!(f, ":{endpoint}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direct_reference() {
        let reference: ObjectReference = "greeter:tcp -h localhost -p 10000".parse().unwrap();
        assert_eq!(reference.identity(), "greeter");
        assert_eq!(reference.endpoints().len(), 1);
        let endpoint = &reference.endpoints()[0];
        assert_eq!(endpoint.protocol, "tcp");
        assert_eq!(endpoint.host(), Some("localhost"));
        assert_eq!(endpoint.port(), Some(10000));
        assert!(!reference.is_indirect());
    }

    #[test]
    fn parses_indirect_reference() {
        let reference: ObjectReference = "  Yellow/Admin ".parse().unwrap();
        assert_eq!(reference.identity(), "Yellow/Admin");
        assert!(reference.is_indirect());
    }

    #[test]
    fn parses_multiple_endpoints_and_flags() {
        let reference: ObjectReference =
            "svc:tcp -h a -p 1 -z:udp -p 2".parse().unwrap();
        assert_eq!(reference.endpoints().len(), 2);
        assert_eq!(reference.endpoints()[0].options[2].flag, "-z");
        assert_eq!(reference.endpoints()[0].options[2].value, None);
        assert_eq!(reference.to_string(), "svc:tcp -h a -p 1 -z:udp -p 2");
    }

    #[test]
    fn quoted_hosts_may_contain_colons() {
        let reference: ObjectReference =
            r#"svc:tcp -h "::1" -p 10000:udp -h "fe80::1" -p 2"#.parse().unwrap();
        assert_eq!(reference.endpoints().len(), 2);
        assert_eq!(reference.endpoints()[0].host(), Some("::1"));
        assert_eq!(reference.endpoints()[0].port(), Some(10000));
        assert_eq!(reference.endpoints()[1].host(), Some("fe80::1"));
        assert_eq!(
            reference.to_string(),
            r#"svc:tcp -h "::1" -p 10000:udp -h "fe80::1" -p 2"#
        );
        assert_eq!(reference.to_string().parse::<ObjectReference>(), Ok(reference));
    }

    #[test]
    fn unquoted_ipv6_host_is_rejected() {
        assert!("svc:tcp -h ::1 -p 10000".parse::<ObjectReference>().is_err());
        assert!(matches!(
            r#"svc:tcp -h "::1 -p 10000"#.parse::<ObjectReference>(),
            Err(ReferenceError::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn rejects_bad_references() {
        assert_eq!("".parse::<ObjectReference>(), Err(ReferenceError::Empty));
        assert!(matches!(
            ":tcp -p 1".parse::<ObjectReference>(),
            Err(ReferenceError::InvalidIdentity(_))
        ));
        assert_eq!(
            "svc:".parse::<ObjectReference>(),
            Err(ReferenceError::EmptyEndpoint)
        );
        assert!(matches!(
            "svc:tcp host".parse::<ObjectReference>(),
            Err(ReferenceError::UnexpectedToken { .. })
        ));
        assert_eq!(
            "svc:tcp -p http".parse::<ObjectReference>(),
            Err(ReferenceError::InvalidPort("http".to_string()))
        );
        assert!(matches!(
            "svc:t+p -p 1".parse::<ObjectReference>(),
            Err(ReferenceError::InvalidProtocol(_))
        ));
    }
}
