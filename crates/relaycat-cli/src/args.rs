//! Validation of the positional arguments and flags.
//!
//! Everything here runs before any socket is opened; a failure means the
//! process exits with status 1.

use anyhow::{bail, Context, Result};
use std::fmt;

/// Transport used for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// Whether to dial out or wait for a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Connect { host: String, port: u16 },
    Listen { port: u16 },
}

/// A fully validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub protocol: Protocol,
    pub mode: Mode,
    pub source_port: Option<u16>,
}

impl Invocation {
    /// Build an invocation from the parsed flags and positional arguments.
    ///
    /// Connect mode takes exactly `<hostname> <port>`, listen mode exactly
    /// `<port>`.
    pub fn from_args(listen: bool, udp: bool, source_port: Option<u16>, args: &[String]) -> Result<Self> {
        let protocol = if udp { Protocol::Udp } else { Protocol::Tcp };

        let mode = if listen {
            let [port] = args else {
                bail!("when listening, <port> is the only argument (got {})", args.len());
            };
            Mode::Listen {
                port: parse_port(port)?,
            }
        } else {
            let [host, port] = args else {
                bail!("<hostname> <port> are mandatory arguments (got {})", args.len());
            };
            if host.is_empty() {
                bail!("empty hostname");
            }
            let port = parse_port(port)?;
            if port == 0 {
                bail!("destination port must not be 0");
            }
            Mode::Connect {
                host: host.clone(),
                port,
            }
        };

        Ok(Self {
            protocol,
            mode,
            source_port,
        })
    }
}

/// Parse a decimal port number.
pub fn parse_port(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .with_context(|| format!("port shall be an integer between 0 and 65535, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn connect_takes_host_and_port() {
        let inv = Invocation::from_args(false, false, None, &strings(&["example.com", "80"])).unwrap();
        assert_eq!(inv.protocol, Protocol::Tcp);
        assert_eq!(
            inv.mode,
            Mode::Connect {
                host: "example.com".into(),
                port: 80
            }
        );
        assert_eq!(inv.source_port, None);
    }

    #[test]
    fn listen_takes_port_only() {
        let inv = Invocation::from_args(true, true, Some(9000), &strings(&["4444"])).unwrap();
        assert_eq!(inv.protocol, Protocol::Udp);
        assert_eq!(inv.mode, Mode::Listen { port: 4444 });
        assert_eq!(inv.source_port, Some(9000));
    }

    #[test]
    fn listen_accepts_port_zero() {
        let inv = Invocation::from_args(true, false, None, &strings(&["0"])).unwrap();
        assert_eq!(inv.mode, Mode::Listen { port: 0 });
    }

    #[test]
    fn connect_rejects_port_zero() {
        assert!(Invocation::from_args(false, false, None, &strings(&["localhost", "0"])).is_err());
    }

    #[test]
    fn connect_requires_exactly_two_args() {
        assert!(Invocation::from_args(false, false, None, &[]).is_err());
        assert!(Invocation::from_args(false, false, None, &strings(&["localhost"])).is_err());
        assert!(Invocation::from_args(false, false, None, &strings(&["localhost", "80", "81"])).is_err());
    }

    #[test]
    fn listen_requires_exactly_one_arg() {
        assert!(Invocation::from_args(true, false, None, &[]).is_err());
        assert!(Invocation::from_args(true, false, None, &strings(&["localhost", "80"])).is_err());
    }

    #[test]
    fn ports_must_be_integers() {
        assert!(Invocation::from_args(false, false, None, &strings(&["localhost", "http"])).is_err());
        assert!(Invocation::from_args(true, false, None, &strings(&["-1"])).is_err());
        assert!(Invocation::from_args(true, false, None, &strings(&["65536"])).is_err());
    }

    #[test]
    fn empty_host_fails() {
        assert!(Invocation::from_args(false, false, None, &strings(&["", "80"])).is_err());
    }

    #[test]
    fn protocol_display() {
        assert_eq!(Protocol::Tcp.to_string(), "tcp");
        assert_eq!(Protocol::Udp.to_string(), "udp");
    }
}
