//! End-to-end scenarios driving the membership table and failure detector
//! together over a simulated network (spec §8), mirroring the shape of the
//! teacher's `tests/cluster_10_node_test.rs` but built on `ChannelTransport`
//! instead of real sockets, for determinism.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use swim_membership::common::Node;
use swim_membership::config::SwimConfig;
use swim_membership::detector::{self, FailureDetectorHandle};
use swim_membership::dissemination::DisseminationQueue;
use swim_membership::membership::{self, MembershipTableHandle};
use swim_membership::protocol::WireMessage;
use swim_membership::transport::{ChannelTransport, Transport};
use swim_membership::{MembershipEvent, Result, Status};

fn node(port: u16) -> Node {
    Node::new(SocketAddr::from(([127, 0, 0, 1], port)))
}

fn fast_config() -> SwimConfig {
    SwimConfig {
        period_timeout: Duration::from_millis(25),
        ping_timeout: Duration::from_millis(10),
        ping_request_group_size: 2,
        suspect_timeout: Duration::from_millis(150),
        ..SwimConfig::default()
    }
}

fn spawn_node(
    local: Node,
    peers: Vec<Node>,
    transport: Arc<dyn Transport>,
) -> (MembershipTableHandle, FailureDetectorHandle) {
    let cfg = fast_config();
    let table = membership::spawn(local, peers, Arc::new(DisseminationQueue::new(64)), cfg.suspect_timeout);
    let fd = detector::spawn(local, cfg, table.clone(), transport);
    (table, fd)
}

/// Forward everything a transport receives to a detector's mailbox.
fn spawn_forwarder(transport: Arc<dyn Transport>, fd: FailureDetectorHandle) {
    tokio::spawn(async move {
        while let Some((from, msg)) = transport.recv().await {
            if fd.deliver(from, msg).await.is_err() {
                break;
            }
        }
    });
}

/// Wraps a [`ChannelTransport`] and silently drops every send addressed to
/// `blocked`, simulating a one-directional network partition so that direct
/// probes fail while indirect probing through a third node still works.
struct PartitionedTransport {
    inner: Arc<ChannelTransport>,
    blocked: Node,
}

#[async_trait]
impl Transport for PartitionedTransport {
    async fn send(&self, to: Node, msg: WireMessage) -> Result<()> {
        if to == self.blocked {
            return Ok(());
        }
        self.inner.send(to, msg).await
    }

    async fn recv(&self) -> Option<(Node, WireMessage)> {
        self.inner.recv().await
    }
}

#[tokio::test]
async fn healthy_triangle_keeps_everyone_alive() {
    let a = node(30001);
    let b = node(30002);
    let c = node(30003);
    let net = ChannelTransport::network(&[a, b, c]);

    let (table_a, fd_a) = spawn_node(a, vec![b, c], net[&a].clone());
    let (_table_b, fd_b) = spawn_node(b, vec![a, c], net[&b].clone());
    let (_table_c, fd_c) = spawn_node(c, vec![a, b], net[&c].clone());

    spawn_forwarder(net[&a].clone(), fd_a);
    spawn_forwarder(net[&b].clone(), fd_b);
    spawn_forwarder(net[&c].clone(), fd_c);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut members = table_a.members().await.unwrap();
    members.sort_by_key(|(n, _)| n.addr());
    let mut expected = vec![(b, 0), (c, 0)];
    expected.sort_by_key(|(n, _)| n.addr());
    assert_eq!(members, expected);
}

#[tokio::test]
async fn indirect_probe_succeeds_through_a_helper_despite_a_dropped_direct_link() {
    let a = node(30011);
    let b = node(30012);
    let c = node(30013);
    let net = ChannelTransport::network(&[a, b, c]);

    let partitioned_a: Arc<dyn Transport> = Arc::new(PartitionedTransport {
        inner: net[&a].clone(),
        blocked: b,
    });

    let (table_a, fd_a) = spawn_node(a, vec![b, c], partitioned_a);
    let (_table_b, fd_b) = spawn_node(b, vec![a, c], net[&b].clone());
    let (_table_c, fd_c) = spawn_node(c, vec![a, b], net[&c].clone());

    spawn_forwarder(net[&a].clone(), fd_a);
    spawn_forwarder(net[&b].clone(), fd_b);
    spawn_forwarder(net[&c].clone(), fd_c);

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Despite every direct ping from A to B being dropped, C relays pings
    // and acks on A's behalf, so A never suspects B.
    let members = table_a.members().await.unwrap();
    assert!(members.contains(&(b, 0)), "expected b to remain alive via indirect probing, got {members:?}");
}

#[tokio::test]
async fn unreachable_peer_is_suspected_then_declared_dead() {
    let a = node(30021);
    let unreachable = node(30022);
    let net = ChannelTransport::network(&[a]);

    let (table_a, fd_a) = spawn_node(a, vec![unreachable], net[&a].clone());
    spawn_forwarder(net[&a].clone(), fd_a);

    // One tick to discover the unresolved probe, one suspect_timeout to
    // let it expire.
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(table_a.length().await.unwrap(), 0);
}

#[tokio::test]
async fn gossip_claiming_self_suspect_triggers_refutation() {
    let a = node(30031);
    let b = node(30032);
    let net = ChannelTransport::network(&[a, b]);

    let (table_a, fd_a) = spawn_node(a, vec![b], net[&a].clone());

    fd_a
        .deliver(
            b,
            WireMessage::Gossip {
                events: vec![MembershipEvent {
                    node: a,
                    status: Status::Suspect(0),
                }],
            },
        )
        .await
        .unwrap();

    // handle_incoming runs inline in the actor's mailbox loop; give it a
    // beat to process before asserting.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (local, incarnation) = table_a.local().await.unwrap();
    assert_eq!(local, a);
    assert_eq!(incarnation, 1);
}
