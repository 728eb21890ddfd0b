use crate::config::ClientConfig;
use crate::error::RendezvousError;
use rendezvous_core::{
    CasOutcome, Role, RoomId, RoomRef, RoomStatus, SignalingStore, StorePath, server_timestamp,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pairs a participant with the oldest waiting room, or opens a new one.
pub struct RoomMatchmaker {
    store: Arc<dyn SignalingStore>,
    rooms: StorePath,
    claim_attempts: u32,
}

impl RoomMatchmaker {
    pub fn new(store: Arc<dyn SignalingStore>, config: &ClientConfig) -> Self {
        Self {
            store,
            rooms: config.rooms_path.clone(),
            claim_attempts: config.claim_attempts,
        }
    }

    /// Claim a waiting room as Callee, or create one as Caller.
    pub async fn join(&self) -> Result<(RoomRef, Role), RendezvousError> {
        for attempt in 1..=self.claim_attempts {
            let Some(room) = self.find_waiting().await? else {
                break;
            };

            match self.claim(&room).await {
                Ok(()) => {
                    info!(room = %room.id, role = %Role::Callee, "claimed waiting room");
                    return Ok((room, Role::Callee));
                }
                Err(RendezvousError::RoomRaceLost) => {
                    debug!(room = %room.id, attempt, "lost claim race, retrying");
                }
                Err(e) => return Err(e),
            }

            if attempt == self.claim_attempts {
                warn!(
                    attempts = self.claim_attempts,
                    "giving up on waiting rooms, opening a new one"
                );
            }
        }

        let room = self.create_room().await?;
        info!(room = %room.id, role = %Role::Caller, "created room");
        Ok((room, Role::Caller))
    }

    async fn find_waiting(&self) -> Result<Option<RoomRef>, RendezvousError> {
        let found = self
            .store
            .query_first_child(&self.rooms, "status", &RoomStatus::Waiting.to_value())
            .await?;
        Ok(found.map(|(key, _)| RoomRef::new(&self.rooms, RoomId::from(key))))
    }

    /// Flip `waiting -> matched`; only one participant can win.
    async fn claim(&self, room: &RoomRef) -> Result<(), RendezvousError> {
        let outcome = self
            .store
            .compare_and_set(
                &room.status(),
                Some(RoomStatus::Waiting.to_value()),
                Some(RoomStatus::Matched.to_value()),
            )
            .await?;

        match outcome {
            CasOutcome::Committed => Ok(()),
            CasOutcome::Aborted { .. } => Err(RendezvousError::RoomRaceLost),
        }
    }

    async fn create_room(&self) -> Result<RoomRef, RendezvousError> {
        let record = json!({
            "status": RoomStatus::Waiting.to_value(),
            "created": server_timestamp(),
        });
        let key = self.store.push_child(&self.rooms, record).await?;
        Ok(RoomRef::new(&self.rooms, RoomId::from(key)))
    }
}
