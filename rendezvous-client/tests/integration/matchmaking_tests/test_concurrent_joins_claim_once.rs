use std::collections::HashMap;

use futures::future::join_all;
use rendezvous_core::{Role, RoomId, RoomStatus, SignalingStore};
use rendezvous_server::MemoryStore;

use crate::utils::{Participant, init_tracing, room_ref, test_config};

#[tokio::test]
async fn test_concurrent_joins_claim_once() {
    init_tracing();
    let shared = MemoryStore::new();
    let participants: Vec<Participant> = (0..6)
        .map(|i| Participant::new(&format!("p{i}"), &shared))
        .collect();

    let roles = join_all(participants.iter().map(|p| p.client.join())).await;

    let mut per_room: HashMap<RoomId, Vec<Role>> = HashMap::new();
    for (p, role) in participants.iter().zip(roles) {
        let role = role.expect("join failed");
        let room = p.client.room_id().expect("joined without a room");
        per_room.entry(room).or_default().push(role);
    }

    for (room, roles) in &per_room {
        let callers = roles.iter().filter(|r| **r == Role::Caller).count();
        let callees = roles.iter().filter(|r| **r == Role::Callee).count();
        assert_eq!(callers, 1, "room {room} has {callers} callers");
        assert!(callees <= 1, "room {room} was claimed {callees} times");

        let status = shared
            .get_value(&room_ref(&test_config(), room).status())
            .await
            .unwrap();
        let expected = if callees == 1 {
            RoomStatus::Matched
        } else {
            RoomStatus::Waiting
        };
        assert_eq!(status, Some(expected.to_value()));
    }
}
