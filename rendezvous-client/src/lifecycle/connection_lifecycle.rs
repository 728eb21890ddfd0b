use crate::config::ClientConfig;
use crate::lifecycle::call_state::{CallState, EndReason, LifecycleSnapshot};
use crate::media::MediaEngine;
use rendezvous_core::{CasOutcome, Role, RoomRef, RoomStatus, SignalingStore, StoreError};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// State machine and cleanup policy for one room.
///
/// Transitions only move forward and are published to every `watch` subscriber. `teardown`
/// runs its side effects at most once, whatever triggers it.
pub struct ConnectionLifecycle {
    store: Arc<dyn SignalingStore>,
    room: RoomRef,
    role: Role,
    state_tx: Arc<watch::Sender<LifecycleSnapshot>>,
    teardown_write_timeout: Duration,
    torn_down: AtomicBool,
    room_removed: AtomicBool,
}

impl ConnectionLifecycle {
    /// Starts in `Waiting` for a Caller and `Matched` for a Callee.
    pub fn new(
        store: Arc<dyn SignalingStore>,
        room: RoomRef,
        role: Role,
        state_tx: Arc<watch::Sender<LifecycleSnapshot>>,
        config: &ClientConfig,
    ) -> Self {
        let initial = match role {
            Role::Caller => CallState::Waiting,
            Role::Callee => CallState::Matched,
        };
        state_tx.send_replace(LifecycleSnapshot {
            state: initial,
            room_id: Some(room.id.clone()),
            role: Some(role),
            reason: None,
        });

        Self {
            store,
            room,
            role,
            state_tx,
            teardown_write_timeout: config.teardown_write_timeout,
            torn_down: AtomicBool::new(false),
            room_removed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CallState {
        self.state_tx.borrow().state
    }

    pub fn room(&self) -> &RoomRef {
        &self.room
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Move to `next` if it is ahead of the current state. Returns whether anything changed.
    pub fn advance(&self, next: CallState) -> bool {
        if self.torn_down.load(Ordering::Acquire) {
            return false;
        }
        let changed = self.state_tx.send_if_modified(|snapshot| {
            if !snapshot.state.can_advance_to(next) {
                return false;
            }
            snapshot.state = next;
            true
        });
        if changed {
            info!(room = %self.room.id, role = %self.role, state = %next, "call state changed");
        }
        changed
    }

    /// The room record is gone; teardown must not write to it.
    pub fn mark_room_removed(&self) {
        self.room_removed.store(true, Ordering::Release);
    }

    /// Release the room, close the engine and publish the terminal state. Returns false if
    /// teardown already ran.
    pub async fn teardown(&self, engine: &dyn MediaEngine, reason: EndReason) -> bool {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            debug!(room = %self.room.id, ?reason, "teardown already done");
            return false;
        }
        info!(room = %self.room.id, role = %self.role, ?reason, "tearing down call");

        self.release_room().await;

        if let Err(e) = engine.close().await {
            warn!("Failed to close media engine: {:?}", e);
        }

        self.state_tx.send_replace(LifecycleSnapshot::ended(reason));
        true
    }

    async fn release_room(&self) {
        if self.room_removed.load(Ordering::Acquire) {
            debug!(room = %self.room.id, "room already removed, nothing to release");
            return;
        }

        if self.role == Role::Caller && self.state() == CallState::Waiting {
            let status = self.room.status();
            let unclaimed = self
                .bounded(self.store.compare_and_set(
                    &status,
                    Some(RoomStatus::Waiting.to_value()),
                    None,
                ))
                .await;

            match unclaimed {
                Ok(CasOutcome::Committed) => {
                    if let Err(e) = self.bounded(self.store.remove_value(self.room.path())).await {
                        warn!(room = %self.room.id, "Failed to remove abandoned room: {}", e);
                    }
                    info!(room = %self.room.id, "abandoned unclaimed room");
                    return;
                }
                Ok(CasOutcome::Aborted { current: None }) => return,
                Ok(CasOutcome::Aborted { .. }) => {
                    debug!(room = %self.room.id, "room was claimed during teardown");
                }
                Err(e) => {
                    warn!(room = %self.room.id, "Failed to abandon room: {}", e);
                    return;
                }
            }
        }

        let written = self
            .bounded(
                self.store
                    .set_value(&self.room.status(), RoomStatus::Disconnected.to_value()),
            )
            .await;
        if let Err(e) = written {
            warn!(room = %self.room.id, "Failed to mark room disconnected: {}", e);
        }
    }

    async fn bounded<T>(
        &self,
        write: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.teardown_write_timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::unavailable(format!(
                "teardown write timed out after {:?}",
                self.teardown_write_timeout
            ))),
        }
    }
}
