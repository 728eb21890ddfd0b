use crate::config::ClientConfig;
use crate::error::RendezvousError;
use crate::lifecycle::call_state::{CallState, EndReason, LifecycleSnapshot};
use crate::lifecycle::connection_lifecycle::ConnectionLifecycle;
use crate::media::{MediaConnectionState, MediaEngine};
use crate::signaling::{EventSender, SessionEvent, SignalingExchange};
use rendezvous_core::{Role, RoomRef, SignalingStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    after: Duration,
    waiting_for: &'static str,
}

/// One call from matchmaking result to teardown, driven by a single event loop.
pub(crate) struct Session {
    exchange: SignalingExchange,
    lifecycle: ConnectionLifecycle,
    config: ClientConfig,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    commands: mpsc::UnboundedReceiver<SessionEvent>,
    forwarders: Vec<JoinHandle<()>>,
    deadline: Option<Deadline>,
}

impl Session {
    pub(crate) fn new(
        store: Arc<dyn SignalingStore>,
        engine: Arc<dyn MediaEngine>,
        room: RoomRef,
        role: Role,
        config: ClientConfig,
        state_tx: Arc<watch::Sender<LifecycleSnapshot>>,
        commands: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let lifecycle =
            ConnectionLifecycle::new(Arc::clone(&store), room.clone(), role, state_tx, &config);
        let exchange = SignalingExchange::new(store, engine, room, role);

        Self {
            exchange,
            lifecycle,
            config,
            events_tx,
            events_rx,
            commands,
            forwarders: Vec::new(),
            deadline: None,
        }
    }

    pub(crate) async fn run(mut self) -> EndReason {
        let room = self.lifecycle.room().id.clone();
        let role = self.lifecycle.role();
        info!(%room, %role, "Session event loop started");

        self.start();

        let reason = loop {
            let deadline = self.deadline;
            let expired = async move {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d.at).await,
                    None => std::future::pending().await,
                }
            };

            let outcome = tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            info!(%room, "Command channel closed. Ending session.");
                            Ok(Some(EndReason::AppTeardown))
                        }
                    }
                }

                Some(event) = self.events_rx.recv() => self.handle_event(event).await,

                _ = expired => {
                    let d = deadline.map(|d| (d.after, d.waiting_for)).unwrap_or_default();
                    Err(RendezvousError::Timeout(d.0, d.1))
                }
            };

            match outcome {
                Ok(None) => {}
                Ok(Some(reason)) => break reason,
                Err(e) => {
                    warn!(%room, %role, "Session failed: {}", e);
                    break EndReason::from(&e);
                }
            }
        };

        self.finish(reason).await;
        info!(%room, ?reason, "Session event loop finished");
        reason
    }

    fn start(&mut self) {
        self.exchange.attach_engine(&self.events_tx);
        self.forwarders
            .push(self.exchange.watch_status(&self.events_tx));

        match self.exchange.role() {
            Role::Caller => {
                self.arm(self.config.match_timeout, "a peer to join");
            }
            Role::Callee => {
                self.forwarders
                    .push(self.exchange.watch_remote_candidates(&self.events_tx));
                self.forwarders
                    .push(self.exchange.fetch_offer(self.config.offer_wait, &self.events_tx));
                self.arm(self.config.negotiation_timeout, "the media connection");
            }
        }
    }

    fn arm(&mut self, after: Duration, waiting_for: &'static str) {
        self.deadline = Some(Deadline {
            at: Instant::now() + after,
            after,
            waiting_for,
        });
    }

    async fn handle_event(
        &mut self,
        event: SessionEvent,
    ) -> Result<Option<EndReason>, RendezvousError> {
        match event {
            SessionEvent::RoomMatched => {
                if self.exchange.role() != Role::Caller
                    || self.lifecycle.state() != CallState::Waiting
                {
                    return Ok(None);
                }
                self.lifecycle.advance(CallState::Matched);
                self.arm(self.config.negotiation_timeout, "the media connection");

                self.lifecycle.advance(CallState::Negotiating);
                self.exchange.send_offer().await?;
                self.forwarders
                    .push(self.exchange.watch_answer(&self.events_tx));
                self.forwarders
                    .push(self.exchange.watch_remote_candidates(&self.events_tx));
            }

            SessionEvent::OfferReceived(offer) => {
                self.lifecycle.advance(CallState::Negotiating);
                self.exchange.send_answer(&offer).await?;
            }

            SessionEvent::AnswerReceived(answer) => {
                self.exchange.apply_answer(&answer).await?;
            }

            SessionEvent::CandidateReceived { key, candidate } => {
                if let Err(e) = self.exchange.deliver_candidate(key, &candidate).await {
                    warn!("Failed to add remote candidate: {}", e);
                }
            }

            SessionEvent::LocalCandidate(candidate) => {
                self.exchange.publish_candidate(&candidate).await?;
            }

            SessionEvent::ConnectionStateChanged(state) => match state {
                MediaConnectionState::Connected => {
                    if self.lifecycle.advance(CallState::Connected) {
                        self.deadline = None;
                    }
                }
                MediaConnectionState::Disconnected => {
                    return Ok(Some(EndReason::MediaDisconnected));
                }
                MediaConnectionState::Failed => return Ok(Some(EndReason::MediaFailed)),
                MediaConnectionState::Closed => return Ok(Some(EndReason::MediaClosed)),
                MediaConnectionState::New | MediaConnectionState::Connecting => {
                    debug!(%state, "media connection progressing");
                }
            },

            SessionEvent::PeerDisconnected => return Ok(Some(EndReason::PeerDisconnected)),

            SessionEvent::RoomRemoved => {
                self.lifecycle.mark_room_removed();
                return Ok(Some(EndReason::RoomRemoved));
            }

            SessionEvent::Malformed(reason) => {
                return Err(RendezvousError::MalformedSignalingRecord(reason));
            }

            SessionEvent::Failed(e) => return Err(e),

            SessionEvent::LeaveRequested => return Ok(Some(EndReason::LocalHangUp)),
        }

        Ok(None)
    }

    async fn finish(&mut self, reason: EndReason) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        self.lifecycle
            .teardown(self.exchange.engine().as_ref(), reason)
            .await;
    }
}
