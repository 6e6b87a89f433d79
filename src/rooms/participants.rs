use super::DecisionService;
use crate::error::{AppResult, Error};
use crate::types::*;

impl DecisionService {
    /// Join a room by its code. Idempotent: joining twice returns the same
    /// membership. Completed rooms stay joinable so results remain viewable.
    pub async fn join_room(&self, code: &str, user: &UserId) -> AppResult<Room> {
        let room = self
            .store()
            .room_by_code(code)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        self.enroll(&room, user).await?;
        Ok(room)
    }

    /// Enroll a user in a room, enforcing the participant cap.
    ///
    /// The count check is not linearized with the insert: two concurrent
    /// joins at the cap can overshoot it by one. The cap is a soft
    /// constraint, so that relaxation is accepted.
    pub(crate) async fn enroll(&self, room: &Room, user: &UserId) -> AppResult<Participant> {
        if self.store().is_participant(&room.id, user).await {
            return Ok(self.store().add_participant(&room.id, user).await);
        }

        if let Some(cap) = room.max_participants {
            let count = self.store().participant_count(&room.id).await;
            if count >= cap as usize {
                return Err(Error::CapacityExceeded("room is full".into()));
            }
        }

        let participant = self.store().add_participant(&room.id, user).await;
        tracing::debug!("User {} joined room {}", user, room.id);
        Ok(participant)
    }

    /// Owner check for owner-only actions
    pub(crate) fn require_owner(room: &Room, user: &UserId) -> AppResult<()> {
        if room.owner_id != *user {
            return Err(Error::PermissionDenied(
                "only the room owner may do this".into(),
            ));
        }
        Ok(())
    }

    /// Participant-or-owner check for room-scoped actions
    pub(crate) async fn require_member(&self, room: &Room, user: &UserId) -> AppResult<()> {
        if room.owner_id == *user || self.store().is_participant(&room.id, user).await {
            return Ok(());
        }
        Err(Error::PermissionDenied(
            "you are not a participant in this room".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::lifecycle::CreateRoom;
    use crate::store::memory::MemStore;
    use std::sync::Arc;

    fn service() -> DecisionService {
        DecisionService::new(Arc::new(MemStore::new()))
    }

    async fn room_with_cap(svc: &DecisionService, cap: Option<u32>) -> Room {
        svc.create_room(
            CreateRoom {
                title: "Movie night".to_string(),
                description: None,
                max_participants: cap,
                allow_participant_options: true,
            },
            &"owner".to_string(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let svc = service();
        let room = room_with_cap(&svc, None).await;

        svc.join_room(&room.code, &"u2".to_string()).await.unwrap();
        svc.join_room(&room.code, &"u2".to_string()).await.unwrap();

        assert_eq!(svc.store().participant_count(&room.id).await, 2);
    }

    #[tokio::test]
    async fn test_join_unknown_code() {
        let svc = service();
        let result = svc.join_room("NOPE42", &"u2".to_string()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_join_full_room() {
        let svc = service();
        // Owner occupies the only slot
        let room = room_with_cap(&svc, Some(1)).await;

        let result = svc.join_room(&room.code, &"u2".to_string()).await;
        assert!(matches!(result, Err(Error::CapacityExceeded(_))));

        // An existing member re-joining is not a capacity violation
        assert!(svc.join_room(&room.code, &"owner".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_join_completed_room_still_allowed() {
        let svc = service();
        let owner = "owner".to_string();
        let room = room_with_cap(&svc, None).await;
        let pizza = svc.add_option(&room.id, "Pizza", &owner).await.unwrap();
        svc.add_option(&room.id, "Tacos", &owner).await.unwrap();
        svc.open_voting(&room.id, &owner).await.unwrap();
        svc.cast_vote(&room.id, &pizza.id, &owner).await.unwrap();
        svc.complete_decision(&room.id, &owner, None).await.unwrap();

        let joined = svc.join_room(&room.code, &"latecomer".to_string()).await.unwrap();
        assert!(joined.is_completed());
    }
}
