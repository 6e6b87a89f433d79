//! In-memory store backed by `RwLock`-guarded tables.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CompleteOutcome, NewOption, NewRoom, Store};
use crate::types::*;

/// In-memory persistence. Ids are ulids (lexicographically ordered by
/// creation time), timestamps are RFC3339 strings.
#[derive(Default)]
pub struct MemStore {
    users: RwLock<HashMap<UserId, User>>,
    rooms: RwLock<HashMap<RoomId, Room>>,
    options: RwLock<HashMap<OptionId, RoomOption>>,
    participants: RwLock<HashMap<ParticipantId, Participant>>,
    votes: RwLock<HashMap<VoteId, Vote>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[async_trait]
impl Store for MemStore {
    async fn upsert_user(&self, id: &UserId, display_name: Option<String>) -> User {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) => {
                if display_name.is_some() {
                    user.display_name = display_name;
                }
                user.clone()
            }
            None => {
                let user = User {
                    id: id.clone(),
                    display_name,
                    created_at: now(),
                };
                users.insert(id.clone(), user.clone());
                user
            }
        }
    }

    async fn user(&self, id: &UserId) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    async fn insert_room(&self, room: NewRoom) -> Room {
        let room = Room {
            id: new_id(),
            title: room.title,
            description: room.description,
            code: room.code,
            owner_id: room.owner_id,
            max_participants: room.max_participants,
            allow_participant_options: room.allow_participant_options,
            phase: RoomPhase::Waiting,
            winning_option_id: None,
            tiebreaker_used: None,
            created_at: now(),
        };
        self.rooms
            .write()
            .await
            .insert(room.id.clone(), room.clone());
        room
    }

    async fn room(&self, id: &RoomId) -> Option<Room> {
        self.rooms.read().await.get(id).cloned()
    }

    async fn room_by_code(&self, code: &str) -> Option<Room> {
        self.rooms
            .read()
            .await
            .values()
            .find(|r| r.code == code)
            .cloned()
    }

    async fn rooms_for_user(&self, user_id: &UserId) -> Vec<Room> {
        let room_ids: Vec<RoomId> = {
            let participants = self.participants.read().await;
            participants
                .values()
                .filter(|p| p.user_id == *user_id)
                .map(|p| p.room_id.clone())
                .collect()
        };

        let rooms = self.rooms.read().await;
        let mut result: Vec<Room> = room_ids
            .iter()
            .filter_map(|id| rooms.get(id).cloned())
            .collect();
        // Most recent first
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    async fn set_phase(&self, id: &RoomId, phase: RoomPhase) -> Option<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(id)?;
        room.phase = phase;
        Some(room.clone())
    }

    async fn complete_room(
        &self,
        id: &RoomId,
        winning_option_id: &OptionId,
        tiebreaker_used: Option<TiebreakerMethod>,
    ) -> Option<CompleteOutcome> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(id)?;
        if room.phase == RoomPhase::Completed {
            return Some(CompleteOutcome::AlreadyCompleted(room.clone()));
        }
        room.phase = RoomPhase::Completed;
        room.winning_option_id = Some(winning_option_id.clone());
        room.tiebreaker_used = tiebreaker_used;
        Some(CompleteOutcome::Committed(room.clone()))
    }

    async fn delete_room(&self, id: &RoomId) -> bool {
        let removed = self.rooms.write().await.remove(id).is_some();
        if removed {
            self.options
                .write()
                .await
                .retain(|_, o| o.room_id != *id);
            self.participants
                .write()
                .await
                .retain(|_, p| p.room_id != *id);
            self.votes.write().await.retain(|_, v| v.room_id != *id);
        }
        removed
    }

    async fn insert_option(&self, option: NewOption) -> RoomOption {
        let option = RoomOption {
            id: new_id(),
            room_id: option.room_id,
            text: option.text,
            created_by: option.created_by,
            created_at: now(),
        };
        self.options
            .write()
            .await
            .insert(option.id.clone(), option.clone());
        option
    }

    async fn option(&self, id: &OptionId) -> Option<RoomOption> {
        self.options.read().await.get(id).cloned()
    }

    async fn options_for_room(&self, room_id: &RoomId) -> Vec<RoomOption> {
        let mut options: Vec<RoomOption> = self
            .options
            .read()
            .await
            .values()
            .filter(|o| o.room_id == *room_id)
            .cloned()
            .collect();
        // Ulids order by creation time, so the id is the tiebreaker for
        // options created within the same timestamp
        options.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        options
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Participant {
        let mut participants = self.participants.write().await;
        if let Some(existing) = participants
            .values()
            .find(|p| p.room_id == *room_id && p.user_id == *user_id)
        {
            return existing.clone();
        }

        let participant = Participant {
            id: new_id(),
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            joined_at: now(),
        };
        participants.insert(participant.id.clone(), participant.clone());
        participant
    }

    async fn participant_count(&self, room_id: &RoomId) -> usize {
        self.participants
            .read()
            .await
            .values()
            .filter(|p| p.room_id == *room_id)
            .count()
    }

    async fn is_participant(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.participants
            .read()
            .await
            .values()
            .any(|p| p.room_id == *room_id && p.user_id == *user_id)
    }

    async fn upsert_vote(&self, room_id: &RoomId, user_id: &UserId, option_id: &OptionId) -> Vote {
        // Delete-then-insert under one write lock so no reader sees zero or
        // two votes for this (room, user)
        let mut votes = self.votes.write().await;
        votes.retain(|_, v| !(v.room_id == *room_id && v.user_id == *user_id));

        let vote = Vote {
            id: new_id(),
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            option_id: option_id.clone(),
            ts: now(),
        };
        votes.insert(vote.id.clone(), vote.clone());
        vote
    }

    async fn vote_for_user(&self, room_id: &RoomId, user_id: &UserId) -> Option<Vote> {
        self.votes
            .read()
            .await
            .values()
            .find(|v| v.room_id == *room_id && v.user_id == *user_id)
            .cloned()
    }

    async fn votes_for_room(&self, room_id: &RoomId) -> Vec<Vote> {
        self.votes
            .read()
            .await
            .values()
            .filter(|v| v.room_id == *room_id)
            .cloned()
            .collect()
    }
}
