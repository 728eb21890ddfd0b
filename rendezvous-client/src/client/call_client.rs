use crate::config::ClientConfig;
use crate::error::RendezvousError;
use crate::lifecycle::{CallState, EndReason, LifecycleSnapshot, Session};
use crate::matchmaking::RoomMatchmaker;
use crate::media::MediaEngineFactory;
use crate::signaling::SessionEvent;
use rendezvous_core::{Role, RoomId, SignalingStore};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct ActiveSession {
    commands: mpsc::UnboundedSender<SessionEvent>,
    task: JoinHandle<EndReason>,
}

/// Entry point for a UI: join a call, hang up, and watch the call state.
///
/// Dropping the client ends any live session as an app teardown.
pub struct CallClient {
    store: Arc<dyn SignalingStore>,
    engines: Arc<dyn MediaEngineFactory>,
    config: ClientConfig,
    state_tx: Arc<watch::Sender<LifecycleSnapshot>>,
    active: Mutex<Option<ActiveSession>>,
}

impl CallClient {
    pub fn new(
        store: Arc<dyn SignalingStore>,
        engines: Arc<dyn MediaEngineFactory>,
        config: ClientConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(LifecycleSnapshot::idle());
        Self {
            store,
            engines,
            config,
            state_tx: Arc::new(state_tx),
            active: Mutex::new(None),
        }
    }

    /// Find or open a room and start negotiating in the background.
    pub async fn join(&self) -> Result<Role, RendezvousError> {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|s| !s.task.is_finished()) {
            return Err(RendezvousError::SessionActive);
        }

        let engine = self
            .engines
            .create()
            .await
            .map_err(|e| RendezvousError::MediaEngineInitFailure(format!("{e:#}")))?;

        let matchmaker = RoomMatchmaker::new(Arc::clone(&self.store), &self.config);
        let (room, role) = match matchmaker.join().await {
            Ok(matched) => matched,
            Err(e) => {
                warn!("Matchmaking failed: {}", e);
                let _ = engine.close().await;
                self.state_tx
                    .send_replace(LifecycleSnapshot::ended(EndReason::from(&e)));
                return Err(e);
            }
        };

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let session = Session::new(
            Arc::clone(&self.store),
            engine,
            room,
            role,
            self.config.clone(),
            Arc::clone(&self.state_tx),
            commands_rx,
        );
        let task = tokio::spawn(session.run());

        *active = Some(ActiveSession { commands, task });
        Ok(role)
    }

    /// Hang up and wait for teardown to finish. A no-op without a session.
    pub async fn leave(&self) {
        let Some(session) = self.active.lock().await.take() else {
            return;
        };

        let _ = session.commands.send(SessionEvent::LeaveRequested);
        match session.task.await {
            Ok(reason) => debug!(?reason, "session ended"),
            Err(e) => warn!("Session task failed: {}", e),
        }
        info!("left call");
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn state(&self) -> CallState {
        self.state_tx.borrow().state
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.state_tx.borrow().room_id.clone()
    }
}
