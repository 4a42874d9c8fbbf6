//! The inbound `ServerHandler`: parses one wire request per connection and
//! dispatches it to [`Node::process_request`].
//!
//! Grounded on the teacher's `P2PHandler`, which wrapped an
//! `Arc<Mutex<Routing<SocketAddr>>>` and matched on parsed `Message`
//! variants. This handler is thinner because `Node` already owns its own
//! locking and dispatch; the handler's only job is the wire <-> `Node`
//! boundary and the panic/error handling `ServerHandler` requires.

use std::io;
use std::sync::Arc;

use log::{debug, error};

use crate::message::split_wire_line;
use crate::network::{Connection, ServerHandler};
use crate::node::Node;

/// Services inbound Chord RPCs for a single [`Node`].
pub struct P2PHandler {
    node: Arc<Node>,
}

impl P2PHandler {
    pub fn new(node: Arc<Node>) -> Self {
        P2PHandler { node }
    }

    fn handle(&self, mut connection: Connection) -> io::Result<()> {
        let line = connection.receive()?;
        let (method, args) = split_wire_line(&line);
        debug!("received {} request with {} arg(s)", method, args.len());

        let reply = self.node.process_request(method, &args);
        connection.send(&reply.to_wire())
    }
}

impl ServerHandler for P2PHandler {
    fn handle_connection(&self, connection: Connection) {
        if let Err(err) = self.handle(connection) {
            error!("error handling connection: {}", err);
        }
    }

    fn handle_error(&self, error: io::Error) {
        error!("error accepting connection: {}", error);
    }
}
