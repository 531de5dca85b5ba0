//! The membership table actor (spec §4.1).
//!
//! Modeled as a single-threaded cooperative actor owning its `HashMap` and
//! processing one [`Command`] at a time off its mailbox, in the style of
//! the teacher's `SwimMembership` background task in
//! `networking/membership/swim.rs` and the request/reply `ask` pattern in
//! `orchestration/actor.rs` — specialized here to one small message enum
//! instead of a type-erased envelope, since this actor's vocabulary never
//! grows beyond the four operations spec.md names.

use crate::common::{Incarnation, Node};
use crate::dissemination::DisseminationQueue;
use crate::error::{Result, SwimError};
use crate::membership::types::{reconcile, MembershipEvent, Status};
use crate::timer::spawn_after;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

const MAILBOX_SIZE: usize = 256;

/// Bound on how long a caller waits for a reply before giving up, mirroring
/// the `ask(..., timeout_duration)` pattern in the teacher's
/// `orchestration/actor.rs` — fixed here rather than caller-supplied, since
/// every reply this actor sends is produced synchronously off its own
/// mailbox loop and should never genuinely take long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

enum Command {
    Update {
        node: Node,
        claim: Status,
    },
    Members {
        reply: oneshot::Sender<Vec<(Node, Incarnation)>>,
    },
    Length {
        reply: oneshot::Sender<usize>,
    },
    Local {
        reply: oneshot::Sender<(Node, Incarnation)>,
    },
}

/// A cheaply-cloneable handle to a running [`MembershipTable`] actor.
#[derive(Clone)]
pub struct MembershipTableHandle {
    tx: mpsc::Sender<Command>,
}

impl MembershipTableHandle {
    /// Apply a status claim for `node` (spec §4.1 `update`). Idempotent for
    /// stale claims: a stale claim changes nothing and emits no event.
    pub async fn update(&self, node: Node, claim: Status) -> Result<()> {
        self.tx
            .send(Command::Update { node, claim })
            .await
            .map_err(|_| SwimError::MailboxClosed("membership table"))
    }

    /// Snapshot of current entries, status flattened to its incarnation
    /// (spec §4.1 `members`).
    pub async fn members(&self) -> Result<Vec<(Node, Incarnation)>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Members { reply })
            .await
            .map_err(|_| SwimError::MailboxClosed("membership table"))?;
        await_reply(rx).await
    }

    /// Count of entries in the active map (spec §4.1 `length`).
    pub async fn length(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Length { reply })
            .await
            .map_err(|_| SwimError::MailboxClosed("membership table"))?;
        await_reply(rx).await
    }

    /// The local node and its current incarnation (spec §4.1 `local`).
    pub async fn local(&self) -> Result<(Node, Incarnation)> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Local { reply })
            .await
            .map_err(|_| SwimError::MailboxClosed("membership table"))?;
        await_reply(rx).await
    }
}

/// Await a reply with a bound on how long to wait, distinguishing "the
/// actor is gone" (`MailboxClosed`) from "the actor is alive but didn't
/// reply in time" (`RequestTimeout`).
async fn await_reply<T>(rx: oneshot::Receiver<T>) -> Result<T> {
    match timeout(REQUEST_TIMEOUT, rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(SwimError::MailboxClosed("membership table")),
        Err(_) => Err(SwimError::RequestTimeout("membership table")),
    }
}

struct MembershipTable {
    local_node: Node,
    local_incarnation: Incarnation,
    members: HashMap<Node, Status>,
    dissemination: Arc<DisseminationQueue>,
    suspect_timeout: Duration,
}

impl MembershipTable {
    /// Apply an incoming claim. `self_tx` is this actor's own mailbox
    /// sender, needed to arm a suspect-expiry timer (spec §4.1 "schedule a
    /// deferred self-call").
    fn handle_update(&mut self, node: Node, claim: Status, self_tx: &mpsc::Sender<Command>) {
        if node == self.local_node {
            self.handle_self_claim(claim);
            return;
        }

        let current = self.members.get(&node).copied();
        let Some(new_status) = reconcile(current, claim) else {
            return; // stale claim: drop silently, no event (spec §7)
        };

        self.dissemination.push(MembershipEvent {
            node,
            status: new_status,
        });

        match new_status {
            Status::Dead(_) => {
                // Dead is terminal for this incarnation history; remove so
                // the entry starts fresh as `absent` if the node ever
                // rejoins (spec §9 open question: removal over tombstone).
                self.members.remove(&node);
            }
            Status::Suspect(i) => {
                self.members.insert(node, new_status);
                self.arm_suspect_timer(node, i, self_tx.clone());
            }
            Status::Alive(_) => {
                self.members.insert(node, new_status);
            }
        }
    }

    /// Self-refutation replaces ordinary reconciliation for claims made
    /// against the local node (spec §4.1).
    fn handle_self_claim(&mut self, claim: Status) {
        match claim {
            Status::Suspect(i) | Status::Dead(i) => {
                self.local_incarnation = self.local_incarnation.max(i) + 1;
                self.dissemination.push(MembershipEvent {
                    node: self.local_node,
                    status: Status::Alive(self.local_incarnation),
                });
            }
            Status::Alive(_) => {
                // An Alive claim about self carries no new information.
            }
        }
    }

    fn arm_suspect_timer(&self, node: Node, incarnation: Incarnation, self_tx: mpsc::Sender<Command>) {
        let suspect_timeout = self.suspect_timeout;
        spawn_after(suspect_timeout, async move {
            let _ = self_tx
                .send(Command::Update {
                    node,
                    claim: Status::Dead(incarnation),
                })
                .await;
        });
    }

    fn snapshot_members(&self) -> Vec<(Node, Incarnation)> {
        self.members
            .iter()
            .map(|(node, status)| (*node, status.incarnation()))
            .collect()
    }
}

/// Spawn a membership table actor, seeding it with `peers` as `Alive(0)`
/// entries (spec §3 "as a peer passed at construction").
pub fn spawn(
    local_node: Node,
    peers: Vec<Node>,
    dissemination: Arc<DisseminationQueue>,
    suspect_timeout: Duration,
) -> MembershipTableHandle {
    let (tx, mut rx) = mpsc::channel(MAILBOX_SIZE);
    let self_tx = tx.clone();

    let mut members = HashMap::with_capacity(peers.len());
    for peer in peers {
        if peer != local_node {
            members.insert(peer, Status::Alive(0));
        }
    }

    let mut table = MembershipTable {
        local_node,
        local_incarnation: 0,
        members,
        dissemination,
        suspect_timeout,
    };

    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Update { node, claim } => table.handle_update(node, claim, &self_tx),
                Command::Members { reply } => {
                    let _ = reply.send(table.snapshot_members());
                }
                Command::Length { reply } => {
                    let _ = reply.send(table.members.len());
                }
                Command::Local { reply } => {
                    let _ = reply.send((table.local_node, table.local_incarnation));
                }
            }
        }
    });

    MembershipTableHandle { tx }
}
