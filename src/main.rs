// SWIM membership node
//
// Binds a UDP transport, starts the membership table and failure detector
// actors, and wires the transport's receive loop into the detector. Runs
// until interrupted.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use swim_membership::common::Node;
use swim_membership::config::SwimConfig;
use swim_membership::detector;
use swim_membership::dissemination::DisseminationQueue;
use swim_membership::membership;
use swim_membership::protocol::WireMessage;
use swim_membership::transport::{Transport, UdpTransport};
use swim_membership::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "swim-node", about = "SWIM membership and failure detection node")]
struct Args {
    /// Address to bind the UDP transport to.
    #[arg(long, default_value = "0.0.0.0:7946")]
    bind: SocketAddr,

    /// Peer addresses to seed the membership table with.
    #[arg(long = "seed")]
    seeds: Vec<SocketAddr>,

    /// Probe period, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    period_ms: u64,

    /// Direct-ping timeout, in milliseconds.
    #[arg(long, default_value_t = 500)]
    ping_timeout_ms: u64,

    /// Indirect helper group size.
    #[arg(long, default_value_t = 3)]
    ping_request_group_size: usize,

    /// Suspect-to-dead timeout, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    suspect_timeout_ms: u64,
}

impl Args {
    fn into_config(&self) -> SwimConfig {
        SwimConfig {
            port: self.bind.port(),
            period_timeout: Duration::from_millis(self.period_ms),
            ping_timeout: Duration::from_millis(self.ping_timeout_ms),
            ping_request_group_size: self.ping_request_group_size,
            suspect_timeout: Duration::from_millis(self.suspect_timeout_ms),
            ..SwimConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.into_config();
    config.validate();

    let local = Node::new(args.bind);
    let peers: Vec<Node> = args.seeds.iter().copied().map(Node::new).collect();

    info!(%local, peer_count = peers.len(), "starting swim node");

    let dissemination = Arc::new(DisseminationQueue::new(config.dissemination_capacity));
    let table = membership::spawn(local, peers, dissemination.clone(), config.suspect_timeout);

    let transport = Arc::new(UdpTransport::bind(local).await?);
    let (inbound_tx, mut inbound_rx) = mpsc::channel(256);
    transport.spawn_recv_loop(inbound_tx);

    let fd = detector::spawn(local, config.clone(), table.clone(), transport.clone() as Arc<dyn Transport>);

    let fd_for_recv = fd.clone();
    tokio::spawn(async move {
        while let Some((source, msg)) = inbound_rx.recv().await {
            if let Err(e) = fd_for_recv.deliver(source, msg).await {
                warn!(error = %e, "failed to deliver inbound message to detector");
                break;
            }
        }
    });

    spawn_gossip_broadcaster(
        table.clone(),
        dissemination,
        transport,
        config.period_timeout,
        config.piggyback_batch,
    );

    info!("swim node running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}

/// Periodically drains the dissemination sink and broadcasts it to every
/// current member as a low-rate `Gossip` message, separate from the
/// probe/ack traffic driven by the detector.
fn spawn_gossip_broadcaster(
    table: membership::MembershipTableHandle,
    dissemination: Arc<DisseminationQueue>,
    transport: Arc<UdpTransport>,
    period: Duration,
    piggyback_batch: usize,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if dissemination.is_empty() {
                continue;
            }
            let events = dissemination.drain(piggyback_batch);
            let Ok(members) = table.members().await else {
                continue;
            };
            for (node, _) in members {
                let msg = WireMessage::Gossip {
                    events: events.clone(),
                };
                if let Err(e) = transport.send(node, msg).await {
                    warn!(%node, error = %e, "gossip send failed");
                }
            }
        }
    });
}
