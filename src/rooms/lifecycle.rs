use serde::Deserialize;

use super::DecisionService;
use crate::error::{AppResult, Error};
use crate::store::NewRoom;
use crate::types::*;

/// Input for room creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoom {
    pub title: String,
    pub description: Option<String>,
    pub max_participants: Option<u32>,
    #[serde(default = "default_allow_participant_options")]
    pub allow_participant_options: bool,
}

fn default_allow_participant_options() -> bool {
    true
}

impl DecisionService {
    /// Create a room owned by `owner`, auto-enrolling them as a participant
    pub async fn create_room(&self, input: CreateRoom, owner: &UserId) -> AppResult<Room> {
        if input.title.trim().is_empty() {
            return Err(Error::Validation("room title must not be empty".into()));
        }
        if input.max_participants == Some(0) {
            return Err(Error::Validation(
                "max_participants must be at least 1".into(),
            ));
        }

        let code = self.unique_room_code().await;
        let room = self
            .store()
            .insert_room(NewRoom {
                title: input.title.trim().to_string(),
                description: input.description,
                code,
                owner_id: owner.clone(),
                max_participants: input.max_participants,
                allow_participant_options: input.allow_participant_options,
            })
            .await;

        // The creator is always a participant of their own room
        self.store().add_participant(&room.id, owner).await;

        tracing::info!("Created room {} (code {}) for {}", room.id, room.code, owner);
        Ok(room)
    }

    /// Check if a phase transition is valid
    fn is_valid_phase_transition(from: RoomPhase, to: RoomPhase) -> bool {
        use RoomPhase::*;

        match (from, to) {
            // Normal forward flow
            (Waiting, Voting) => true,
            (Voting, Results) => true,
            (Results, Completed) => true,

            // Finalizing straight from Voting closes voting implicitly
            (Voting, Completed) => true,

            // No backward transitions, Completed is terminal
            _ => false,
        }
    }

    /// Validate preconditions for a phase transition
    async fn validate_phase_preconditions(&self, room: &Room, to: RoomPhase) -> AppResult<()> {
        if to == RoomPhase::Voting {
            let options = self.store().options_for_room(&room.id).await;
            if options.len() < 2 {
                return Err(Error::InvalidState(
                    "opening voting requires at least 2 options".into(),
                ));
            }
        }
        Ok(())
    }

    /// Transition a room's phase with validation. Owner-only.
    pub(crate) async fn transition_phase(
        &self,
        room_id: &RoomId,
        user: &UserId,
        to: RoomPhase,
    ) -> AppResult<Room> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        Self::require_owner(&room, user)?;

        if !Self::is_valid_phase_transition(room.phase, to) {
            return Err(Error::InvalidState(format!(
                "invalid phase transition from {:?} to {:?}",
                room.phase, to
            )));
        }

        self.validate_phase_preconditions(&room, to).await?;

        let updated = self
            .store()
            .set_phase(room_id, to)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        tracing::info!("Room {} moved to {:?}", room_id, to);
        Ok(updated)
    }

    /// Open voting. Owner-only; requires at least 2 options.
    pub async fn open_voting(&self, room_id: &RoomId, user: &UserId) -> AppResult<Room> {
        self.transition_phase(room_id, user, RoomPhase::Voting).await
    }

    /// Close voting for display of results. Owner-only.
    pub async fn close_voting(&self, room_id: &RoomId, user: &UserId) -> AppResult<Room> {
        self.transition_phase(room_id, user, RoomPhase::Results).await
    }

    /// Room detail, visible to participants and the owner
    pub async fn room_detail(&self, room_id: &RoomId, user: &UserId) -> AppResult<Room> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;
        self.require_member(&room, user).await?;
        Ok(room)
    }

    /// Look up a room by its join code. Not membership-gated: presenting the
    /// code is what grants the right to see the room in the join flow.
    pub async fn room_by_code(&self, code: &str) -> AppResult<Room> {
        self.store()
            .room_by_code(code)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))
    }

    /// Rooms the user participates in, most recently created first
    pub async fn rooms_for_user(&self, user: &UserId) -> Vec<Room> {
        self.store().rooms_for_user(user).await
    }

    /// Delete a room and everything in it. Owner-only, legal in any phase.
    pub async fn delete_room(&self, room_id: &RoomId, user: &UserId) -> AppResult<()> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        Self::require_owner(&room, user)?;

        self.store().delete_room(room_id).await;
        tracing::info!("Deleted room {} and its options, participants, votes", room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemStore;
    use std::sync::Arc;

    fn service() -> DecisionService {
        DecisionService::new(Arc::new(MemStore::new()))
    }

    fn create(title: &str) -> CreateRoom {
        CreateRoom {
            title: title.to_string(),
            description: None,
            max_participants: None,
            allow_participant_options: true,
        }
    }

    async fn user(svc: &DecisionService, id: &str) -> UserId {
        svc.store()
            .upsert_user(&id.to_string(), Some(id.to_string()))
            .await
            .id
    }

    #[tokio::test]
    async fn test_create_room_starts_waiting() {
        let svc = service();
        let owner = user(&svc, "u1").await;

        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();

        assert_eq!(room.phase, RoomPhase::Waiting);
        assert_eq!(room.code.len(), 6);
        assert!(svc.store().is_participant(&room.id, &owner).await);
    }

    #[tokio::test]
    async fn test_create_room_rejects_empty_title() {
        let svc = service();
        let owner = user(&svc, "u1").await;

        let result = svc.create_room(create("   "), &owner).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_open_voting_requires_two_options() {
        let svc = service();
        let owner = user(&svc, "u1").await;
        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();

        svc.add_option(&room.id, "Pizza", &owner).await.unwrap();

        let result = svc.open_voting(&room.id, &owner).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        svc.add_option(&room.id, "Tacos", &owner).await.unwrap();
        let room = svc.open_voting(&room.id, &owner).await.unwrap();
        assert_eq!(room.phase, RoomPhase::Voting);
    }

    #[tokio::test]
    async fn test_open_voting_is_owner_only() {
        let svc = service();
        let owner = user(&svc, "u1").await;
        let other = user(&svc, "u2").await;
        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();
        svc.add_option(&room.id, "Pizza", &owner).await.unwrap();
        svc.add_option(&room.id, "Tacos", &owner).await.unwrap();
        svc.join_room(&room.code, &other).await.unwrap();

        let result = svc.open_voting(&room.id, &other).await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_no_backward_transitions() {
        let svc = service();
        let owner = user(&svc, "u1").await;
        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();
        svc.add_option(&room.id, "Pizza", &owner).await.unwrap();
        svc.add_option(&room.id, "Tacos", &owner).await.unwrap();

        // Waiting -> Results skips Voting
        let result = svc.close_voting(&room.id, &owner).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        svc.open_voting(&room.id, &owner).await.unwrap();
        svc.close_voting(&room.id, &owner).await.unwrap();

        // Results -> Voting would go backward
        let result = svc.open_voting(&room.id, &owner).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_room_detail_requires_membership() {
        let svc = service();
        let owner = user(&svc, "u1").await;
        let outsider = user(&svc, "u2").await;
        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();

        assert!(svc.room_detail(&room.id, &owner).await.is_ok());
        let result = svc.room_detail(&room.id, &outsider).await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_delete_room_owner_only_and_cascades() {
        let svc = service();
        let owner = user(&svc, "u1").await;
        let other = user(&svc, "u2").await;
        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();
        svc.add_option(&room.id, "Pizza", &owner).await.unwrap();

        let result = svc.delete_room(&room.id, &other).await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));

        svc.delete_room(&room.id, &owner).await.unwrap();
        assert!(svc.store().room(&room.id).await.is_none());
        assert!(svc.store().options_for_room(&room.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_room_by_code() {
        let svc = service();
        let owner = user(&svc, "u1").await;
        let room = svc.create_room(create("Dinner"), &owner).await.unwrap();

        let found = svc.room_by_code(&room.code).await.unwrap();
        assert_eq!(found.id, room.id);

        let missing = svc.room_by_code("ZZZZ99").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
