//! The ring-membership and routing engine.
//!
//! [`Node`] holds the routing state and implements every ring operation in
//! terms of the [`crate::network::Transport`] seam, never a concrete
//! socket. This mirrors how the original implementation's test suite
//! patches `ChordNode.start()` independently of `create()`/`join()`: the
//! ring-state transitions here never touch a real connection, which is
//! what lets them run against a fake transport in `#[cfg(test)]` below.
//! Starting the real listener and maintenance thread around a `Node` is
//! [`crate::peer::Peer`]'s job, generalized from the teacher's split
//! between `Stabilization`/`Procedures` (periodic vs. one-shot RPCs) to a
//! single struct that owns both, since Chord's maintenance operations and
//! its RPC procedures are the same small set of calls.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::identifier::{finger_start, in_half_open_interval, in_open_interval, Identifier};
use crate::message::{parse_wire_request, Address, Reply, Request, RequestParseError};
use crate::network::Transport;
use crate::routing::RoutingTable;

/// A Chord node's ring state: its own address, routing table, running
/// flag, and the transport it dispatches RPCs through.
pub struct Node {
    pub address: Address,
    routing: Mutex<RoutingTable>,
    running: AtomicBool,
    transport: Arc<dyn Transport>,
    timeout_ms: u64,
}

impl Node {
    /// Builds a fresh, inactive node for `(ip, port)`.
    pub fn new(ip: impl Into<String>, port: u16, transport: Arc<dyn Transport>, timeout_ms: u64) -> Self {
        Node {
            address: Address::new(ip, port),
            routing: Mutex::new(RoutingTable::new()),
            running: AtomicBool::new(false),
            transport,
            timeout_ms,
        }
    }

    /// Whether `create`/`join` has succeeded and `stop` has not since run.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The current successor, `finger_table[0]`.
    pub fn successor(&self) -> Option<Address> {
        self.routing.lock().unwrap().successor().cloned()
    }

    /// The current predecessor, if any.
    pub fn predecessor(&self) -> Option<Address> {
        self.routing.lock().unwrap().predecessor().cloned()
    }

    /// Initializes a solo ring: self is its own successor, no predecessor.
    pub fn create(&self) {
        {
            let mut routing = self.routing.lock().unwrap();
            routing.set_successor(self.address.clone());
        }
        self.running.store(true, Ordering::SeqCst);
        info!("created ring anchored at {}", self.address);
        self.fix_fingers();
    }

    /// Joins an existing ring through `peer_ip:peer_port`.
    ///
    /// Fails with [`Error::JoinFailed`] if the peer does not reply or
    /// replies unparseably, leaving the node untouched (still inactive).
    pub fn join(&self, peer_ip: &str, peer_port: u16) -> Result<()> {
        let peer = Address::new(peer_ip, peer_port);
        let request = Request::FindSuccessor {
            target_id: self.address.key,
        };
        let reply = self.transport.send(&peer, &request, self.timeout_ms);
        let successor = reply
            .and_then(|s| Address::parse(&s).ok().flatten())
            .ok_or_else(|| Error::JoinFailed(format!("no usable reply from {}", peer)))?;

        {
            let mut routing = self.routing.lock().unwrap();
            routing.set_successor(successor.clone());
        }
        self.running.store(true, Ordering::SeqCst);
        info!("joined ring via {}, successor is {}", peer, successor);
        self.fix_fingers();
        Ok(())
    }

    /// Marks the node inactive. Safe to call before `create`/`join`, and
    /// idempotently afterward.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns the finger closest to, but not past, `target_id`, or this
    /// node's own address if no finger qualifies.
    pub fn closest_preceding_finger(&self, target_id: Identifier) -> Address {
        let routing = self.routing.lock().unwrap();
        routing
            .closest_preceding_finger(self.address.key, target_id)
            .cloned()
            .unwrap_or_else(|| self.address.clone())
    }

    /// Resolves ownership of `target_id`, forwarding to a closer peer when
    /// this node cannot answer directly. Never fails: any remote error
    /// falls back to the local successor.
    pub fn find_successor(&self, target_id: Identifier) -> Address {
        let successor = match self.successor() {
            None => return self.address.clone(),
            Some(s) => s,
        };

        if in_half_open_interval(self.address.key, successor.key, target_id) {
            return successor;
        }

        let cpf = self.closest_preceding_finger(target_id);
        if cpf == self.address {
            return successor;
        }

        let request = Request::FindSuccessor { target_id };
        match self.transport.send(&cpf, &request, self.timeout_ms) {
            Some(reply) => match Address::parse(&reply) {
                Ok(Some(addr)) => addr,
                _ => successor,
            },
            None => successor,
        }
    }

    /// Same routing as [`Self::find_successor`], but additionally reports
    /// the number of forwarding hops taken. Always returns the pinned
    /// `(wire address, hops)` shape, including on the failure path.
    pub fn trace_successor(&self, target_id: Identifier, hops: u32) -> (String, u32) {
        let successor = match self.successor() {
            None => return (self.address.to_wire(), hops),
            Some(s) => s,
        };

        if in_half_open_interval(self.address.key, successor.key, target_id) {
            return (successor.to_wire(), hops);
        }

        let cpf = self.closest_preceding_finger(target_id);
        if cpf == self.address {
            return (successor.to_wire(), hops);
        }

        let request = Request::TraceSuccessor { target_id, hops };
        match self.transport.send(&cpf, &request, self.timeout_ms) {
            Some(reply) => match reply.rfind(':') {
                Some(idx) => {
                    let (addr_wire, hops_part) = reply.split_at(idx);
                    match hops_part[1..].parse::<u32>() {
                        Ok(h) => (addr_wire.to_string(), h + 1),
                        Err(_) => (successor.to_wire(), hops),
                    }
                }
                None => (successor.to_wire(), hops),
            },
            None => (successor.to_wire(), hops),
        }
    }

    /// Corrects the successor pointer and advertises self to it. Network
    /// failures at any step are swallowed.
    pub fn stabilize(&self) {
        let successor = match self.successor() {
            None => return,
            Some(s) => s,
        };

        let mut current_successor = successor.clone();
        let request = Request::GetPredecessor;
        if let Some(reply) = self.transport.send(&successor, &request, self.timeout_ms) {
            if let Ok(Some(candidate)) = Address::parse(&reply) {
                if in_open_interval(self.address.key, successor.key, candidate.key) {
                    info!("stabilize: adopting new successor {}", candidate);
                    let mut routing = self.routing.lock().unwrap();
                    routing.set_successor(candidate.clone());
                    current_successor = candidate;
                }
            }
        }

        self.notify(Some(&current_successor));
    }

    /// Sends `NOTIFY(self.address)` to `candidate`. Returns `true` if the
    /// peer replied `"OK"` or `"IGNORED"` (both mean it parsed the
    /// notification); `false` on any other reply, network failure, or an
    /// absent candidate.
    pub fn notify(&self, candidate: Option<&Address>) -> bool {
        let candidate = match candidate {
            None => return false,
            Some(c) => c,
        };
        let request = Request::Notify {
            candidate: self.address.clone(),
        };
        match self.transport.send(candidate, &request, self.timeout_ms) {
            Some(reply) => reply == "OK" || reply == "IGNORED",
            None => false,
        }
    }

    /// Inbound `NOTIFY` handler: adopts `candidate` as predecessor if none
    /// is set, or if `candidate` is strictly closer than the current one.
    pub fn be_notified(&self, candidate: Address) -> bool {
        let mut routing = self.routing.lock().unwrap();
        let predecessor_key = routing.predecessor().map(|p| p.key);
        match predecessor_key {
            None => {
                routing.set_predecessor(candidate);
                true
            }
            Some(pred_key) => {
                if in_open_interval(pred_key, self.address.key, candidate.key) {
                    routing.set_predecessor(candidate);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Refreshes one finger per call, advancing the cursor cyclically.
    ///
    /// The lookup is wrapped in a panic boundary: if `find_successor`
    /// unwinds, the finger is left unchanged. The cursor still advances so
    /// a recurring failure on one finger never starves the others.
    pub fn fix_fingers(&self) {
        let i = {
            let routing = self.routing.lock().unwrap();
            if routing.successor().is_none() {
                return;
            }
            routing.next_finger_cursor()
        };

        let target = finger_start(self.address.key, i);
        match catch_unwind(AssertUnwindSafe(|| self.find_successor(target))) {
            Ok(addr) => {
                let mut routing = self.routing.lock().unwrap();
                routing.set_finger(i, addr);
            }
            Err(_) => {
                warn!("fix_fingers: find_successor panicked refreshing finger {}, leaving unchanged", i);
            }
        }

        let mut routing = self.routing.lock().unwrap();
        routing.advance_finger_cursor();
    }

    /// Pings the predecessor, clearing it on anything other than
    /// `"ALIVE"` or on a failed request.
    pub fn check_predecessor(&self) {
        let predecessor = match self.predecessor() {
            None => return,
            Some(p) => p,
        };
        match self.transport.send(&predecessor, &Request::Ping, self.timeout_ms) {
            Some(reply) if reply == "ALIVE" => {}
            _ => {
                let mut routing = self.routing.lock().unwrap();
                routing.clear_predecessor();
            }
        }
    }

    /// Parses and dispatches one inbound wire request, per the method
    /// table: `PING`, `FIND_SUCCESSOR`, `GET_PREDECESSOR`, `NOTIFY`, and
    /// `TRACE_SUCCESSOR`.
    pub fn process_request(&self, method: &str, args: &[String]) -> Reply {
        match parse_wire_request(method, args) {
            Ok(Request::Ping) => Reply::Alive,
            Ok(Request::GetPredecessor) => match self.predecessor() {
                Some(addr) => Reply::Address(addr),
                None => Reply::NoAddress,
            },
            Ok(Request::FindSuccessor { target_id }) => Reply::Address(self.find_successor(target_id)),
            Ok(Request::Notify { candidate }) => {
                if self.be_notified(candidate) {
                    Reply::Ok
                } else {
                    Reply::Ignored
                }
            }
            Ok(Request::TraceSuccessor { target_id, hops }) => {
                let (addr_wire, hops) = self.trace_successor(target_id, hops);
                Reply::TraceSuccessor { addr_wire, hops }
            }
            Err(RequestParseError::InvalidMethod) => Reply::InvalidMethod,
            Err(RequestParseError::InvalidNode) => Reply::InvalidNode,
            Err(RequestParseError::InvalidTraceSuccessor) => Reply::InvalidTraceSuccessor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeTransport {
        replies: StdMutex<HashMap<(String, u16, &'static str), String>>,
        panic_on: StdMutex<Option<(String, u16)>>,
    }

    impl FakeTransport {
        fn new() -> Self {
            FakeTransport {
                replies: StdMutex::new(HashMap::new()),
                panic_on: StdMutex::new(None),
            }
        }

        fn set_reply(&self, ip: &str, port: u16, method: &'static str, reply: &str) {
            self.replies
                .lock()
                .unwrap()
                .insert((ip.to_string(), port, method), reply.to_string());
        }

        fn panic_on(&self, ip: &str, port: u16) {
            *self.panic_on.lock().unwrap() = Some((ip.to_string(), port));
        }

        fn tag(request: &Request) -> &'static str {
            match request {
                Request::Ping => "PING",
                Request::FindSuccessor { .. } => "FIND_SUCCESSOR",
                Request::GetPredecessor => "GET_PREDECESSOR",
                Request::Notify { .. } => "NOTIFY",
                Request::TraceSuccessor { .. } => "TRACE_SUCCESSOR",
            }
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, dest: &Address, request: &Request, _timeout_ms: u64) -> Option<String> {
            if let Some((ip, port)) = self.panic_on.lock().unwrap().clone() {
                if dest.ip == ip && dest.port == port {
                    panic!("fake transport configured to panic for {}:{}", ip, port);
                }
            }
            self.replies
                .lock()
                .unwrap()
                .get(&(dest.ip.clone(), dest.port, Self::tag(request)))
                .cloned()
        }
    }

    fn node_with(address: Address, transport: Arc<FakeTransport>) -> Node {
        Node {
            address,
            routing: Mutex::new(RoutingTable::new()),
            running: AtomicBool::new(true),
            transport,
            timeout_ms: 1000,
        }
    }

    #[test]
    fn solo_ring_create() {
        let transport = Arc::new(FakeTransport::new());
        let node = Node::new("1.2.3.4", 5, transport, 1000);
        node.create();

        assert_eq!(node.address.key, 57776);
        assert_eq!(node.successor().unwrap(), node.address);
        assert!(node.is_running());
    }

    #[test]
    fn find_successor_without_successor_returns_self() {
        let transport = Arc::new(FakeTransport::new());
        let node = Node::new("1.2.3.4", 5, transport, 1000);
        assert_eq!(node.find_successor(12345), node.address);
    }

    #[test]
    fn be_notified_accepts_closer_and_rejects_farther() {
        let transport = Arc::new(FakeTransport::new());
        let node = node_with(
            Address {
                key: 1000,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );

        assert!(node.be_notified(Address {
            key: 400,
            ip: "p".to_string(),
            port: 1
        }));
        assert_eq!(node.predecessor().unwrap().key, 400);

        assert!(node.be_notified(Address {
            key: 500,
            ip: "q".to_string(),
            port: 1
        }));
        assert_eq!(node.predecessor().unwrap().key, 500);

        assert!(!node.be_notified(Address {
            key: 300,
            ip: "r".to_string(),
            port: 1
        }));
        assert_eq!(node.predecessor().unwrap().key, 500);
    }

    #[test]
    fn find_successor_falls_back_on_remote_failure() {
        let transport = Arc::new(FakeTransport::new());
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        {
            let mut routing = node.routing.lock().unwrap();
            routing.set_successor(Address {
                key: 200,
                ip: "succ".to_string(),
                port: 2,
            });
            routing.set_finger(
                5,
                Address {
                    key: 150,
                    ip: "remote".to_string(),
                    port: 3,
                },
            );
        }

        let result = node.find_successor(250);
        assert_eq!(result.key, 200);
    }

    #[test]
    fn fix_fingers_leaves_finger_unchanged_on_panic_and_advances_cursor() {
        let transport = Arc::new(FakeTransport::new());
        transport.panic_on("remote", 9);
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        {
            let mut routing = node.routing.lock().unwrap();
            routing.set_successor(Address {
                key: 200,
                ip: "succ".to_string(),
                port: 2,
            });
            routing.set_finger(
                12,
                Address {
                    key: 150,
                    ip: "remote".to_string(),
                    port: 9,
                },
            );
            for _ in 0..10 {
                routing.advance_finger_cursor();
            }
        }

        node.fix_fingers();

        let routing = node.routing.lock().unwrap();
        assert!(routing.finger(10).is_none());
        assert_eq!(routing.next_finger_cursor(), 11);
    }

    #[test]
    fn join_succeeds_with_valid_reply() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_reply("peer", 10, "FIND_SUCCESSOR", "200:succhost:20");
        let node = Node::new("self", 1, transport, 1000);

        assert!(node.join("peer", 10).is_ok());
        assert_eq!(node.successor().unwrap().key, 200);
        assert!(node.is_running());
    }

    #[test]
    fn join_fails_without_reply() {
        let transport = Arc::new(FakeTransport::new());
        let node = Node::new("self", 1, transport, 1000);

        assert!(node.join("peer", 10).is_err());
        assert!(!node.is_running());
        assert!(node.successor().is_none());
    }

    #[test]
    fn stabilize_noop_without_successor() {
        let transport = Arc::new(FakeTransport::new());
        let node = Node::new("self", 1, transport, 1000);
        node.stabilize();
        assert!(node.successor().is_none());
    }

    #[test]
    fn stabilize_adopts_closer_predecessor_and_notifies_it() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_reply("succ", 2, "GET_PREDECESSOR", "150:cand:3");
        transport.set_reply("cand", 3, "NOTIFY", "OK");
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        node.routing.lock().unwrap().set_successor(Address {
            key: 200,
            ip: "succ".to_string(),
            port: 2,
        });

        node.stabilize();

        let successor = node.successor().unwrap();
        assert_eq!(successor.key, 150);
        assert_eq!(successor.ip, "cand");
    }

    #[test]
    fn notify_treats_ok_and_ignored_as_success() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_reply("peer", 5, "NOTIFY", "OK");
        let node = Node::new("self", 1, transport.clone(), 1000);
        let peer = Address::new("peer", 5);
        assert!(node.notify(Some(&peer)));

        transport.set_reply("peer", 5, "NOTIFY", "IGNORED");
        assert!(node.notify(Some(&peer)));

        transport.set_reply("peer", 5, "NOTIFY", "WAT");
        assert!(!node.notify(Some(&peer)));

        assert!(!node.notify(None));
    }

    #[test]
    fn check_predecessor_clears_on_non_alive_reply() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_reply("pred", 7, "PING", "DEAD");
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        node.routing.lock().unwrap().set_predecessor(Address {
            key: 50,
            ip: "pred".to_string(),
            port: 7,
        });

        node.check_predecessor();
        assert!(node.predecessor().is_none());
    }

    #[test]
    fn check_predecessor_keeps_alive_predecessor() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_reply("pred", 7, "PING", "ALIVE");
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        node.routing.lock().unwrap().set_predecessor(Address {
            key: 50,
            ip: "pred".to_string(),
            port: 7,
        });

        node.check_predecessor();
        assert_eq!(node.predecessor().unwrap().key, 50);
    }

    #[test]
    fn trace_successor_returns_local_successor_directly() {
        let transport = Arc::new(FakeTransport::new());
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        node.routing.lock().unwrap().set_successor(Address {
            key: 200,
            ip: "succ".to_string(),
            port: 2,
        });

        let (addr_wire, hops) = node.trace_successor(150, 0);
        assert_eq!(addr_wire, "200:succ:2");
        assert_eq!(hops, 0);
    }

    #[test]
    fn trace_successor_increments_hops_on_forward() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_reply("remote", 9, "TRACE_SUCCESSOR", "300:dest:4:2");
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        {
            let mut routing = node.routing.lock().unwrap();
            routing.set_successor(Address {
                key: 200,
                ip: "succ".to_string(),
                port: 2,
            });
            routing.set_finger(
                10,
                Address {
                    key: 150,
                    ip: "remote".to_string(),
                    port: 9,
                },
            );
        }

        let (addr_wire, hops) = node.trace_successor(1124, 0);
        assert_eq!(addr_wire, "300:dest:4");
        assert_eq!(hops, 3);
    }

    #[test]
    fn trace_successor_falls_back_on_remote_failure() {
        let transport = Arc::new(FakeTransport::new());
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        {
            let mut routing = node.routing.lock().unwrap();
            routing.set_successor(Address {
                key: 200,
                ip: "succ".to_string(),
                port: 2,
            });
            routing.set_finger(
                10,
                Address {
                    key: 150,
                    ip: "remote".to_string(),
                    port: 9,
                },
            );
        }

        let (addr_wire, hops) = node.trace_successor(1124, 5);
        assert_eq!(addr_wire, "200:succ:2");
        assert_eq!(hops, 5);
    }

    #[test]
    fn process_request_dispatch_table() {
        let transport = Arc::new(FakeTransport::new());
        let node = node_with(
            Address {
                key: 100,
                ip: "self".to_string(),
                port: 1,
            },
            transport,
        );
        node.routing.lock().unwrap().set_successor(Address {
            key: 200,
            ip: "succ".to_string(),
            port: 2,
        });

        assert_eq!(node.process_request("PING", &[]), Reply::Alive);

        assert_eq!(
            node.process_request("FIND_SUCCESSOR", &["150".to_string()]),
            Reply::Address(Address {
                key: 200,
                ip: "succ".to_string(),
                port: 2
            })
        );
        assert_eq!(
            node.process_request("FIND_SUCCESSOR", &["nope".to_string()]),
            Reply::InvalidMethod
        );

        assert_eq!(node.process_request("GET_PREDECESSOR", &[]), Reply::NoAddress);

        assert_eq!(
            node.process_request(
                "NOTIFY",
                &["50".to_string(), "p".to_string(), "9".to_string()]
            ),
            Reply::Ok
        );
        assert_eq!(
            node.process_request("NOTIFY", &["1".to_string()]),
            Reply::InvalidNode
        );

        assert_eq!(
            node.process_request("TRACE_SUCCESSOR", &["bad".to_string()]),
            Reply::InvalidTraceSuccessor
        );

        assert_eq!(node.process_request("BOGUS", &[]), Reply::InvalidMethod);
    }
}
