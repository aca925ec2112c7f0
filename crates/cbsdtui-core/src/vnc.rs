//! VNC console endpoints of virtual machines

use crate::{CoreError, Result};
use std::fmt;
use std::str::FromStr;

/// A `host:port` pair as stored for a VM's VNC server
///
/// The host is not validated beyond being non-empty, so names, IPv4 and
/// bracketless IPv6 addresses are all accepted. The port splits off at the
/// last `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VncConsole {
    pub host: String,
    pub port: u16,
}

impl VncConsole {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| CoreError::InvalidVnc(raw.to_string()))?;
        if host.is_empty() {
            return Err(CoreError::InvalidVnc(raw.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| CoreError::InvalidVnc(raw.to_string()))?;
        Ok(Self::new(host, port))
    }
}

impl FromStr for VncConsole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VncConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let vnc = VncConsole::parse("127.0.0.1:5900").unwrap();
        assert_eq!(vnc.host, "127.0.0.1");
        assert_eq!(vnc.port, 5900);
        assert_eq!(vnc.to_string(), "127.0.0.1:5900");
    }

    #[test]
    fn test_host_is_permissive() {
        assert_eq!(VncConsole::parse("0.0.0.0:6000").unwrap().host, "0.0.0.0");
        assert_eq!(VncConsole::parse("vnc.local:5901").unwrap().host, "vnc.local");
        assert_eq!(VncConsole::parse("999.1.1.1:5900").unwrap().host, "999.1.1.1");
        assert_eq!(VncConsole::parse("::1:5900").unwrap().host, "::1");
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in ["", "5900", ":5900", "host:", "host:port", "host:70000"] {
            assert!(
                matches!(VncConsole::parse(raw), Err(CoreError::InvalidVnc(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
