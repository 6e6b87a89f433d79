use std::collections::HashMap;

use super::DecisionService;
use crate::error::{AppResult, Error};
use crate::types::*;

impl DecisionService {
    /// Cast (or replace) the user's vote in a room.
    ///
    /// Voting auto-enrolls the voter; if enrollment fails the vote is
    /// aborted, never leaving a vote without a membership behind it.
    pub async fn cast_vote(
        &self,
        room_id: &RoomId,
        option_id: &OptionId,
        user: &UserId,
    ) -> AppResult<Vote> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        match room.phase {
            RoomPhase::Voting => {}
            RoomPhase::Completed => {
                return Err(Error::InvalidState("voting is closed".into()));
            }
            _ => {
                return Err(Error::InvalidState(
                    "voting is not open in this room".into(),
                ));
            }
        }

        let option = self
            .store()
            .option(option_id)
            .await
            .ok_or_else(|| Error::NotFound("option not found".into()))?;
        if option.room_id != *room_id {
            return Err(Error::Validation(
                "option does not belong to this room".into(),
            ));
        }

        self.enroll(&room, user).await?;

        let vote = self.store().upsert_vote(room_id, user, option_id).await;
        tracing::debug!("User {} voted for {} in room {}", user, option_id, room_id);
        Ok(vote)
    }

    /// The user's current vote in a room, if any
    pub async fn my_vote(&self, room_id: &RoomId, user: &UserId) -> AppResult<Option<Vote>> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;
        self.require_member(&room, user).await?;
        Ok(self.store().vote_for_user(room_id, user).await)
    }

    /// Tally the room's votes: one entry per option (zero counts included),
    /// descending by count, ties in option creation order.
    ///
    /// Always recomputed from the current vote set; votes can be replaced,
    /// so nothing here is cached. Safe to call in any phase.
    pub async fn tally(&self, room_id: &RoomId) -> AppResult<Vec<TallyEntry>> {
        let options = {
            let room = self
                .store()
                .room(room_id)
                .await
                .ok_or_else(|| Error::NotFound("room not found".into()))?;
            self.store().options_for_room(&room.id).await
        };

        let mut counts: HashMap<OptionId, u32> = HashMap::new();
        for vote in self.store().votes_for_room(room_id).await {
            *counts.entry(vote.option_id).or_insert(0) += 1;
        }

        // Options arrive in creation order; the stable sort keeps that order
        // among equal counts
        let mut entries: Vec<TallyEntry> = options
            .into_iter()
            .map(|o| TallyEntry {
                vote_count: counts.get(&o.id).copied().unwrap_or(0),
                option_id: o.id,
            })
            .collect();
        entries.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
        Ok(entries)
    }
}
