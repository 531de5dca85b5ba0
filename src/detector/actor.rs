//! The failure detector actor (spec §4.2): direct probing with indirect
//! fallback, run as a single-threaded cooperative actor in the same idiom
//! as [`crate::membership::table`] — its own `Command` mailbox, its own
//! deferred self-calls via [`crate::timer::spawn_after`], grounded in the
//! probe/timeout loop of the teacher's `networking/health/detector.rs` and
//! `networking/health/checker.rs`.

use crate::common::{Incarnation, Node};
use crate::config::SwimConfig;
use crate::detector::roundrobin::RoundRobin;
use crate::error::{Result, SwimError};
use crate::membership::table::MembershipTableHandle;
use crate::membership::types::Status;
use crate::protocol::WireMessage;
use crate::timer::spawn_after;
use crate::transport::Transport;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

const MAILBOX_SIZE: usize = 256;

enum Command {
    /// A period boundary, carrying the driver-assigned sequence number
    /// (spec §4.2 `tick`).
    Tick { seq: u64 },
    /// A decoded message arriving from the transport.
    Incoming { source: Node, msg: WireMessage },
    /// The deferred self-call scheduled by `tick` (spec §4.2 `onPingTimeout`).
    PingTimeout { seq: u64, target: Node },
}

/// A cheaply-cloneable handle to a running [`FailureDetector`] actor.
#[derive(Clone)]
pub struct FailureDetectorHandle {
    tx: mpsc::Sender<Command>,
}

impl FailureDetectorHandle {
    /// Hand a decoded inbound message to the detector. Called from the
    /// transport's receive loop.
    pub async fn deliver(&self, source: Node, msg: WireMessage) -> Result<()> {
        self.tx
            .send(Command::Incoming { source, msg })
            .await
            .map_err(|_| SwimError::MailboxClosed("failure detector"))
    }
}

/// Outstanding direct ping: at most one at a time (spec §4.2 testable
/// property "at most one outstanding direct ping").
struct OutstandingPing {
    target: Node,
    incarnation: Incarnation,
    seq: u64,
}

struct FailureDetector {
    local: Node,
    config: SwimConfig,
    table: MembershipTableHandle,
    transport: Arc<dyn Transport>,
    round_robin: RoundRobin,
    outstanding: Option<OutstandingPing>,
    /// `(target, seqNr) -> (originator, received_at)`, recorded on receipt
    /// of a `PingReq` we agreed to help with (spec §4.2). Entries are
    /// removed when a matching `Ack` is observed, or implicitly on period
    /// rollover if none ever arrives (spec §3 "Pending indirect pings").
    pending_indirect: HashMap<(Node, u64), (Node, Instant)>,
    rng: ThreadRng,
}

impl FailureDetector {
    /// Step 1-4 of spec §4.2 `tick`.
    async fn handle_tick(&mut self, seq: u64, self_tx: &mpsc::Sender<Command>) {
        // Step 0: prune pending indirect entries that outlived a full
        // period without a matching ack ever arriving (spec §3 "removed
        // ... implicitly on period rollover"). Without this an indirect
        // request whose target never acks leaks its entry forever.
        if let Some(cutoff) = Instant::now().checked_sub(self.config.period_timeout) {
            self.pending_indirect.retain(|_, (_, received_at)| *received_at >= cutoff);
        }

        // Step 1: an unresolved outstanding ping from the prior period is
        // now overdue for a full period plus its own ping_timeout — escalate
        // to Suspect before starting the new period.
        if let Some(ping) = self.outstanding.take() {
            debug!(target = %ping.target, seq = ping.seq, "prior probe unresolved, escalating to suspect");
            if let Err(e) = self
                .table
                .update(ping.target, Status::Suspect(ping.incarnation))
                .await
            {
                warn!(error = %e, "failed to escalate unresolved probe");
            }
        }

        // Step 2: pick the next round-robin target.
        let candidates = match self.table.members().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to snapshot members for probing");
                return;
            }
        };
        let Some((target, incarnation)) = self.round_robin.next(&candidates, &mut self.rng) else {
            trace!("no candidates to probe this period");
            return;
        };

        // Step 3: record the outstanding ping and send it.
        self.outstanding = Some(OutstandingPing {
            target,
            incarnation,
            seq,
        });
        if let Err(e) = self.transport.send(target, WireMessage::Ping { seq }).await {
            warn!(%target, error = %e, "direct ping send failed, will still time out naturally");
        }

        // Step 4: schedule the deferred onPingTimeout self-call.
        let tx = self_tx.clone();
        spawn_after(self.config.ping_timeout, async move {
            let _ = tx.send(Command::PingTimeout { seq, target }).await;
        });
    }

    /// spec §4.2 `onPingTimeout`: recruit helpers for indirect probing, but
    /// only if the direct ping is still the one outstanding.
    async fn handle_ping_timeout(&mut self, seq: u64, target: Node) {
        let still_outstanding =
            matches!(&self.outstanding, Some(p) if p.target == target && p.seq == seq);
        if !still_outstanding {
            return;
        }

        let candidates = match self.table.members().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to snapshot members for indirect probing");
                return;
            }
        };
        let helpers: Vec<Node> = candidates
            .into_iter()
            .map(|(node, _)| node)
            .filter(|&node| node != target && node != self.local)
            .collect();
        let k = self.config.ping_request_group_size.min(helpers.len());
        let chosen: Vec<Node> = helpers
            .choose_multiple(&mut self.rng, k)
            .copied()
            .collect();

        if chosen.is_empty() {
            trace!(%target, "no helpers available for indirect probe");
            return;
        }

        for helper in chosen {
            if let Err(e) = self
                .transport
                .send(helper, WireMessage::PingReq { seq, target })
                .await
            {
                warn!(%helper, error = %e, "ping-req send failed");
            }
        }
    }

    async fn handle_incoming(&mut self, source: Node, msg: WireMessage) {
        match msg {
            WireMessage::Ping { seq } => {
                let ack = WireMessage::Ack {
                    seq,
                    from: self.local,
                };
                if let Err(e) = self.transport.send(source, ack).await {
                    warn!(%source, error = %e, "ack send failed");
                }
            }
            WireMessage::PingReq { seq, target } => {
                self.pending_indirect
                    .insert((target, seq), (source, Instant::now()));
                if let Err(e) = self.transport.send(target, WireMessage::Ping { seq }).await {
                    warn!(%target, error = %e, "forwarded ping send failed");
                }
            }
            WireMessage::Ack { seq, from } => {
                self.handle_ack(seq, from).await;
            }
            WireMessage::Gossip { events } => {
                // Opaque to the detector beyond forwarding to the table
                // (spec §2, §6).
                for event in events {
                    if let Err(e) = self.table.update(event.node, event.status).await {
                        warn!(error = %e, "failed to apply piggybacked event");
                    }
                }
            }
        }
    }

    /// spec §4.2 `Ack` correlation: direct match (with no indirect request
    /// pending for the same key) takes priority, then indirect forwarding,
    /// then silent drop.
    async fn handle_ack(&mut self, seq: u64, from: Node) {
        let pending_key = (from, seq);
        let matches_direct =
            matches!(&self.outstanding, Some(p) if p.target == from && p.seq == seq);

        if matches_direct && !self.pending_indirect.contains_key(&pending_key) {
            if let Some(ping) = self.outstanding.take() {
                if let Err(e) = self.table.update(from, Status::Alive(ping.incarnation)).await {
                    warn!(error = %e, "failed to record alive ack");
                }
            }
            return;
        }

        if let Some((originator, _)) = self.pending_indirect.remove(&pending_key) {
            if let Err(e) = self
                .transport
                .send(originator, WireMessage::Ack { seq, from })
                .await
            {
                warn!(%originator, error = %e, "forwarded ack send failed");
            }
            return;
        }

        trace!(%from, seq, "dropping unmatched ack");
    }
}

/// Spawn a failure detector actor, plus its internal period driver
/// (spec §4.2 "a fresh monotonic 64-bit sequence number assigned by the
/// driver" — realized here as the actor's own `tokio::time::interval`
/// loop, in the same self-driving style as the teacher's
/// `SwimMembership::start` background task).
pub fn spawn(
    local: Node,
    config: SwimConfig,
    table: MembershipTableHandle,
    transport: Arc<dyn Transport>,
) -> FailureDetectorHandle {
    let (tx, mut rx) = mpsc::channel(MAILBOX_SIZE);
    let self_tx = tx.clone();
    let period = config.period_timeout;

    let mut detector = FailureDetector {
        local,
        config,
        table,
        transport,
        round_robin: RoundRobin::new(),
        outstanding: None,
        pending_indirect: HashMap::new(),
        rng: rand::rng(),
    };

    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Tick { seq } => detector.handle_tick(seq, &self_tx).await,
                Command::Incoming { source, msg } => detector.handle_incoming(source, msg).await,
                Command::PingTimeout { seq, target } => {
                    detector.handle_ping_timeout(seq, target).await
                }
            }
        }
    });

    let ticker_tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut seq: u64 = 0;
        loop {
            interval.tick().await;
            if ticker_tx.send(Command::Tick { seq }).await.is_err() {
                break;
            }
            seq = seq.wrapping_add(1);
        }
    });

    FailureDetectorHandle { tx }
}
