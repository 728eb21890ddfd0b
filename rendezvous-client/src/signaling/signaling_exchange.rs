use crate::error::RendezvousError;
use crate::media::MediaEngine;
use crate::signaling::session_event::SessionEvent;
use futures::StreamExt;
use rendezvous_core::{
    CandidateRecord, NegotiationRecord, Role, RoomRef, RoomStatus, SdpKind, SignalingStore,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Offer/answer/candidate exchange for one room, from one role's side.
///
/// The `send_*` steps run at most once per exchange; later calls are no-ops.
pub struct SignalingExchange {
    store: Arc<dyn SignalingStore>,
    engine: Arc<dyn MediaEngine>,
    room: RoomRef,
    role: Role,
    offer_sent: bool,
    answer_sent: bool,
    answer_applied: bool,
    seen_remote: HashSet<String>,
}

impl SignalingExchange {
    pub fn new(
        store: Arc<dyn SignalingStore>,
        engine: Arc<dyn MediaEngine>,
        room: RoomRef,
        role: Role,
    ) -> Self {
        Self {
            store,
            engine,
            room,
            role,
            offer_sent: false,
            answer_sent: false,
            answer_applied: false,
            seen_remote: HashSet::new(),
        }
    }

    pub fn room(&self) -> &RoomRef {
        &self.room
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn engine(&self) -> &Arc<dyn MediaEngine> {
        &self.engine
    }

    /// Route media engine callbacks into the session's event channel.
    pub fn attach_engine(&self, events: &EventSender) {
        let tx = events.clone();
        self.engine.on_local_candidate(Box::new(move |candidate| {
            let _ = tx.send(SessionEvent::LocalCandidate(candidate));
        }));

        let tx = events.clone();
        self.engine.on_connection_state_change(Box::new(move |state| {
            let _ = tx.send(SessionEvent::ConnectionStateChanged(state));
        }));
    }

    /// Caller: create, apply and publish the offer.
    pub async fn send_offer(&mut self) -> Result<(), RendezvousError> {
        if self.offer_sent {
            return Ok(());
        }
        self.offer_sent = true;

        let payload = self
            .engine
            .create_offer()
            .await
            .map_err(RendezvousError::negotiation)?;
        let offer = NegotiationRecord::offer(payload);
        self.engine
            .set_local_description(&offer)
            .await
            .map_err(RendezvousError::negotiation)?;
        self.store
            .set_value(&self.room.offer(), to_value(&offer)?)
            .await?;

        info!(room = %self.room.id, "offer published");
        Ok(())
    }

    /// Callee: apply the Caller's offer, then create, apply and publish the answer.
    pub async fn send_answer(&mut self, offer: &NegotiationRecord) -> Result<(), RendezvousError> {
        if self.answer_sent {
            return Ok(());
        }
        self.answer_sent = true;

        self.engine
            .set_remote_description(offer)
            .await
            .map_err(RendezvousError::negotiation)?;
        let payload = self
            .engine
            .create_answer()
            .await
            .map_err(RendezvousError::negotiation)?;
        let answer = NegotiationRecord::answer(payload);
        self.engine
            .set_local_description(&answer)
            .await
            .map_err(RendezvousError::negotiation)?;
        self.store
            .set_value(&self.room.answer(), to_value(&answer)?)
            .await?;

        info!(room = %self.room.id, "answer published");
        Ok(())
    }

    /// Caller: apply the Callee's answer. Returns false if one was already applied.
    pub async fn apply_answer(&mut self, answer: &NegotiationRecord) -> Result<bool, RendezvousError> {
        if self.answer_applied {
            return Ok(false);
        }
        self.answer_applied = true;

        self.engine
            .set_remote_description(answer)
            .await
            .map_err(RendezvousError::negotiation)?;
        debug!(room = %self.room.id, "answer applied");
        Ok(true)
    }

    pub async fn publish_candidate(&self, candidate: &CandidateRecord) -> Result<(), RendezvousError> {
        let key = self
            .store
            .push_child(&self.room.local_candidates(self.role), to_value(candidate)?)
            .await?;
        trace!(room = %self.room.id, %key, "local candidate published");
        Ok(())
    }

    /// Hand a remote candidate to the engine once per generated key. Returns false for
    /// duplicates.
    pub async fn deliver_candidate(
        &mut self,
        key: String,
        candidate: &CandidateRecord,
    ) -> Result<bool, RendezvousError> {
        if !self.seen_remote.insert(key) {
            return Ok(false);
        }
        self.engine
            .add_candidate(candidate)
            .await
            .map_err(RendezvousError::negotiation)?;
        Ok(true)
    }

    /// Follow the room's `status` for the life of the session.
    pub fn watch_status(&self, events: &EventSender) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let path = self.room.status();
        let tx = events.clone();

        tokio::spawn(async move {
            let mut updates = match store.subscribe_value(&path).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(SessionEvent::Failed(e.into()));
                    return;
                }
            };

            while let Some(snapshot) = updates.next().await {
                let event = match snapshot {
                    None => SessionEvent::RoomRemoved,
                    Some(value) => match RoomStatus::from_value(&value) {
                        Some(RoomStatus::Waiting) => continue,
                        Some(RoomStatus::Matched) => SessionEvent::RoomMatched,
                        Some(RoomStatus::Disconnected) => SessionEvent::PeerDisconnected,
                        None => SessionEvent::Malformed(format!("room status {value}")),
                    },
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::Failed(subscription_ended("room status")));
        })
    }

    /// Caller: deliver the first valid answer.
    pub fn watch_answer(&self, events: &EventSender) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let path = self.room.answer();
        let tx = events.clone();

        tokio::spawn(async move {
            let mut updates = match store.subscribe_value(&path).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(SessionEvent::Failed(e.into()));
                    return;
                }
            };

            while let Some(snapshot) = updates.next().await {
                let Some(value) = snapshot else { continue };
                let (event, done) = match parse_negotiation(value, SdpKind::Answer) {
                    Ok(answer) => (SessionEvent::AnswerReceived(answer), true),
                    Err(e) => (SessionEvent::Malformed(e.to_string()), false),
                };
                if tx.send(event).is_err() || done {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::Failed(subscription_ended("answer")));
        })
    }

    /// Deliver every entry of the peer's candidate list, existing ones first.
    pub fn watch_remote_candidates(&self, events: &EventSender) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let path = self.room.remote_candidates(self.role);
        let tx = events.clone();

        tokio::spawn(async move {
            let mut added = match store.subscribe_child_added(&path).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(SessionEvent::Failed(e.into()));
                    return;
                }
            };

            while let Some((key, value)) = added.next().await {
                let event = match parse_candidate(value) {
                    Ok(candidate) => SessionEvent::CandidateReceived { key, candidate },
                    Err(e) => SessionEvent::Malformed(e.to_string()),
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::Failed(subscription_ended("remote candidates")));
        })
    }

    /// Callee: read the offer in the background.
    pub fn fetch_offer(&self, wait: Duration, events: &EventSender) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let room = self.room.clone();
        let tx = events.clone();

        tokio::spawn(async move {
            let event = match await_offer(store.as_ref(), &room, wait).await {
                Ok(offer) => SessionEvent::OfferReceived(offer),
                Err(RendezvousError::MalformedSignalingRecord(reason)) => {
                    SessionEvent::Malformed(reason)
                }
                Err(e) => SessionEvent::Failed(e),
            };
            let _ = tx.send(event);
        })
    }
}

/// One-shot read of a room's offer: the current value, or the first one written within
/// `wait`. Missing after `wait` or present but invalid is `MalformedSignalingRecord`.
pub async fn await_offer(
    store: &dyn SignalingStore,
    room: &RoomRef,
    wait: Duration,
) -> Result<NegotiationRecord, RendezvousError> {
    let path = room.offer();
    if let Some(value) = store.get_value(&path).await? {
        return parse_negotiation(value, SdpKind::Offer);
    }

    debug!(room = %room.id, "offer not written yet, waiting up to {:?}", wait);
    let mut updates = store.subscribe_value(&path).await?;
    let first_present = async {
        while let Some(snapshot) = updates.next().await {
            if snapshot.is_some() {
                return snapshot;
            }
        }
        None
    };

    match tokio::time::timeout(wait, first_present).await {
        Ok(Some(value)) => parse_negotiation(value, SdpKind::Offer),
        Ok(None) => Err(RendezvousError::StoreUnavailable(
            "offer subscription ended".into(),
        )),
        Err(_) => Err(RendezvousError::malformed(format!(
            "room {} has no offer after {:?}",
            room.id, wait
        ))),
    }
}

pub fn parse_negotiation(value: Value, expected: SdpKind) -> Result<NegotiationRecord, RendezvousError> {
    let record: NegotiationRecord = serde_json::from_value(value)
        .map_err(|e| RendezvousError::malformed(format!("{expected:?} record: {e}")))?;
    if record.kind != expected {
        return Err(RendezvousError::malformed(format!(
            "expected {expected:?} record, found {:?}",
            record.kind
        )));
    }
    Ok(record)
}

pub fn parse_candidate(value: Value) -> Result<CandidateRecord, RendezvousError> {
    serde_json::from_value(value).map_err(|e| RendezvousError::malformed(format!("candidate: {e}")))
}

/// A live subscription stream only ends when the store connection is gone.
fn subscription_ended(what: &str) -> RendezvousError {
    RendezvousError::StoreUnavailable(format!("{what} subscription ended"))
}

fn to_value<T: Serialize>(record: &T) -> Result<Value, RendezvousError> {
    serde_json::to_value(record).map_err(|e| RendezvousError::Negotiation(e.to_string()))
}
