//! Wire types: addresses, requests, and replies.
//!
//! The teacher crate's [`Message`] enum combined a binary length-prefixed
//! framing with a set of api/p2p variants. This protocol is line-oriented
//! colon-delimited ASCII instead (one request, one reply, per connection),
//! but the idea of a tagged enum with a `parse`/serialize pair carries over
//! directly: the dispatcher matches on [`Request`] variants rather than
//! slicing strings ad hoc.

use std::fmt;

use crate::identifier::Identifier;

/// The stable identity of a node: its network location plus derived key.
///
/// A plain value type. There is no setter for `key`; it is derived once at
/// construction and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub key: Identifier,
    pub ip: String,
    pub port: u16,
}

impl Address {
    /// Builds an `Address` for `(ip, port)`, computing its key via
    /// [`crate::identifier::hash`].
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        let ip = ip.into();
        let key = crate::identifier::hash(&ip, port);
        Address { key, ip, port }
    }

    /// Serializes as `<key>:<ip>:<port>`, the wire format for an address.
    pub fn to_wire(&self) -> String {
        format!("{}:{}:{}", self.key, self.ip, self.port)
    }

    /// Parses `<key>:<ip>:<port>`, or the sentinel `"nil"` for "no address".
    ///
    /// Returns `Ok(None)` for `"nil"`, `Ok(Some(addr))` for a well-formed
    /// address, and `Err` for anything else.
    pub fn parse(s: &str) -> Result<Option<Address>, AddressParseError> {
        if s == "nil" {
            return Ok(None);
        }
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(AddressParseError(s.to_string()));
        }
        let key: Identifier = parts[0]
            .parse()
            .map_err(|_| AddressParseError(s.to_string()))?;
        let port: u16 = parts[2]
            .parse()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Some(Address {
            key,
            ip: parts[1].to_string(),
            port,
        }))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// An address string that did not match `<key>:<ip>:<port>` or `"nil"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParseError(pub String);

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed address: {:?}", self.0)
    }
}

impl std::error::Error for AddressParseError {}

/// A parsed inbound request, tagged by method.
///
/// Replaces ad hoc string slicing in the dispatcher with a `match` over
/// these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    FindSuccessor { target_id: Identifier },
    GetPredecessor,
    Notify { candidate: Address },
    TraceSuccessor { target_id: Identifier, hops: u32 },
}

impl Request {
    /// Serializes a request to its wire form, `<METHOD>:<arg1>:<arg2>:...`.
    pub fn to_wire(&self) -> String {
        match self {
            Request::Ping => "PING:".to_string(),
            Request::FindSuccessor { target_id } => format!("FIND_SUCCESSOR:{}", target_id),
            Request::GetPredecessor => "GET_PREDECESSOR:".to_string(),
            Request::Notify { candidate } => format!("NOTIFY:{}", candidate.to_wire()),
            Request::TraceSuccessor { target_id, hops } => {
                format!("TRACE_SUCCESSOR:{}:{}", target_id, hops)
            }
        }
    }
}

/// Parses a request's method name and argument list (as split by the
/// network layer) into a [`Request`].
///
/// Returns `Err` with the method name on an unrecognized method, so the
/// caller can reply `"INVALID_METHOD"`; returns `Err` with a more specific
/// tag for methods whose arguments are malformed.
pub fn parse_wire_request(method: &str, args: &[String]) -> Result<Request, RequestParseError> {
    match method {
        "PING" => Ok(Request::Ping),
        "GET_PREDECESSOR" => Ok(Request::GetPredecessor),
        "FIND_SUCCESSOR" => {
            let target_id = args
                .first()
                .and_then(|s| s.parse().ok())
                .ok_or(RequestParseError::InvalidMethod)?;
            Ok(Request::FindSuccessor { target_id })
        }
        "TRACE_SUCCESSOR" => {
            if args.len() != 2 {
                return Err(RequestParseError::InvalidTraceSuccessor);
            }
            let target_id = args[0]
                .parse()
                .map_err(|_| RequestParseError::InvalidTraceSuccessor)?;
            let hops = args[1]
                .parse()
                .map_err(|_| RequestParseError::InvalidTraceSuccessor)?;
            Ok(Request::TraceSuccessor { target_id, hops })
        }
        "NOTIFY" => {
            if args.len() != 3 {
                return Err(RequestParseError::InvalidNode);
            }
            let wire = args.join(":");
            let candidate = Address::parse(&wire)
                .ok()
                .flatten()
                .ok_or(RequestParseError::InvalidNode)?;
            Ok(Request::Notify { candidate })
        }
        _ => Err(RequestParseError::InvalidMethod),
    }
}

/// Why a wire request failed to parse; maps directly onto the failure
/// replies in the method dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestParseError {
    InvalidMethod,
    InvalidNode,
    InvalidTraceSuccessor,
}

/// A dispatcher reply, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Alive,
    Address(Address),
    NoAddress,
    Ok,
    Ignored,
    InvalidMethod,
    InvalidNode,
    TraceSuccessor { addr_wire: String, hops: u32 },
    InvalidTraceSuccessor,
}

impl Reply {
    /// Serializes a reply to the exact wire string specified in the
    /// dispatch table.
    pub fn to_wire(&self) -> String {
        match self {
            Reply::Alive => "ALIVE".to_string(),
            Reply::Address(addr) => addr.to_wire(),
            Reply::NoAddress => "nil".to_string(),
            Reply::Ok => "OK".to_string(),
            Reply::Ignored => "IGNORED".to_string(),
            Reply::InvalidMethod => "INVALID_METHOD".to_string(),
            Reply::InvalidNode => "INVALID_NODE".to_string(),
            Reply::TraceSuccessor { addr_wire, hops } => format!("{}:{}", addr_wire, hops),
            Reply::InvalidTraceSuccessor => "ERROR:Invalid TRACE_SUCCESSOR Request".to_string(),
        }
    }
}

/// Splits a raw wire line `<METHOD>:<arg1>:<arg2>:...` into method name and
/// argument list. A trailing bare colon (no args) yields an empty arg list.
pub fn split_wire_line(line: &str) -> (&str, Vec<String>) {
    let mut parts = line.splitn(2, ':');
    let method = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("");
    let args = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(':').map(|s| s.to_string()).collect()
    };
    (method, args)
}
