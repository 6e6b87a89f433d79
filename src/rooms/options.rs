use super::DecisionService;
use crate::error::{AppResult, Error};
use crate::store::NewOption;
use crate::types::*;

impl DecisionService {
    /// Add a candidate option to a room.
    ///
    /// Participants may add options only while the room's flag allows it;
    /// the owner always may. Completed rooms accept no new options.
    pub async fn add_option(
        &self,
        room_id: &RoomId,
        text: &str,
        user: &UserId,
    ) -> AppResult<RoomOption> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        if room.is_completed() {
            return Err(Error::InvalidState(
                "this decision is already completed".into(),
            ));
        }

        self.require_member(&room, user).await?;

        if !room.allow_participant_options && room.owner_id != *user {
            return Err(Error::PermissionDenied(
                "only the room owner can add options".into(),
            ));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("option text must not be empty".into()));
        }

        let option = self
            .store()
            .insert_option(NewOption {
                room_id: room.id.clone(),
                text: text.to_string(),
                created_by: user.clone(),
            })
            .await;

        tracing::debug!("Option {} added to room {}", option.id, room_id);
        Ok(option)
    }

    /// Options of a room in creation order, visible to members
    pub async fn options_for_room(
        &self,
        room_id: &RoomId,
        user: &UserId,
    ) -> AppResult<Vec<RoomOption>> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;
        self.require_member(&room, user).await?;
        Ok(self.store().options_for_room(room_id).await)
    }
}
