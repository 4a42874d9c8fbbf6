//! A peer-to-peer overlay implementing the [Chord protocol][w:chord] over
//! [consistent hashing][w:cons]: each node discovers and maintains its own
//! position on a circular identifier space and cooperatively routes lookups
//! to the node responsible for any given key in O(log N) hops.
//!
//! # Introduction
//!
//! Every node runs the same small set of operations: `find_successor` to
//! resolve ownership of a key, and the periodic `stabilize`/`notify`/
//! `fix_fingers`/`check_predecessor` maintenance protocol that keeps the
//! ring consistent as peers join and leave. This crate implements the ring
//! itself; an application-layer store that wants to place values on the
//! ring would consume `find_successor(k)` to locate the owning node, the
//! same way the key-value layer in an earlier version of this codebase sat
//! on top of its own routing layer.
//!
//! # Architecture
//!
//! [`node::Node`] holds the routing state (finger table, predecessor,
//! successor) and implements every ring operation purely in terms of the
//! [`network::Transport`] trait, so it can be driven entirely by
//! `#[cfg(test)]` fakes without opening a socket. [`peer::Peer`] is the
//! compositional piece that wires a real `Node` up to the real world: it
//! owns the TCP [`network::Server`] (a thread-pool-backed listener, same
//! shape as this crate's earlier pure-DHT incarnation) and the
//! [`maintenance::MaintenanceLoop`] background thread.
//!
//! [w:chord]: https://en.wikipedia.org/wiki/Chord_(peer-to-peer)
//! [w:cons]: https://en.wikipedia.org/wiki/Consistent_hashing

pub mod config;
pub mod error;
pub mod handler;
pub mod identifier;
pub mod maintenance;
pub mod message;
pub mod network;
pub mod node;
pub mod peer;
pub mod routing;

pub use error::{Error, Result};
