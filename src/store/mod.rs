//! Persistence abstraction for the decision core.
//!
//! The core is storage-agnostic: every query it needs is expressed on the
//! [`Store`] trait and the in-memory backend in [`memory`] is what the server
//! and the tests run against. A relational backend implements the same trait.

pub mod memory;

use async_trait::async_trait;

use crate::types::*;

/// Insert shape for a room; the store assigns id, timestamp, and the
/// initial `Waiting` phase.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub owner_id: UserId,
    pub max_participants: Option<u32>,
    pub allow_participant_options: bool,
}

/// Insert shape for an option; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewOption {
    pub room_id: RoomId,
    pub text: String,
    pub created_by: UserId,
}

/// Result of a compare-and-set completion attempt.
#[derive(Debug, Clone)]
pub enum CompleteOutcome {
    /// This call won the race and recorded the winner.
    Committed(Room),
    /// Someone finished first; the recorded result is returned untouched.
    AlreadyCompleted(Room),
}

/// Trait for persistence backends.
///
/// Mutations that must be atomic (vote replacement, completion
/// check-and-set, cascade delete) are single trait methods so a backend can
/// make them one transactional unit.
#[async_trait]
pub trait Store: Send + Sync {
    // User operations
    async fn upsert_user(&self, id: &UserId, display_name: Option<String>) -> User;
    async fn user(&self, id: &UserId) -> Option<User>;

    // Room operations
    async fn insert_room(&self, room: NewRoom) -> Room;
    async fn room(&self, id: &RoomId) -> Option<Room>;
    async fn room_by_code(&self, code: &str) -> Option<Room>;
    /// Rooms the user participates in, most recently created first
    async fn rooms_for_user(&self, user_id: &UserId) -> Vec<Room>;
    async fn set_phase(&self, id: &RoomId, phase: RoomPhase) -> Option<Room>;
    /// Record the winner and flip the room to `Completed` as one atomic
    /// check-and-set. A room that is already completed is returned unchanged.
    async fn complete_room(
        &self,
        id: &RoomId,
        winning_option_id: &OptionId,
        tiebreaker_used: Option<TiebreakerMethod>,
    ) -> Option<CompleteOutcome>;
    /// Delete the room and cascade to its options, participants, and votes.
    /// Returns false if the room did not exist.
    async fn delete_room(&self, id: &RoomId) -> bool;

    // Option operations
    async fn insert_option(&self, option: NewOption) -> RoomOption;
    async fn option(&self, id: &OptionId) -> Option<RoomOption>;
    /// Options of a room in creation order
    async fn options_for_room(&self, room_id: &RoomId) -> Vec<RoomOption>;

    // Participant operations
    /// Idempotent: joining twice returns the existing membership
    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Participant;
    async fn participant_count(&self, room_id: &RoomId) -> usize;
    async fn is_participant(&self, room_id: &RoomId, user_id: &UserId) -> bool;

    // Vote operations
    /// Replace any prior vote by this user in this room with the new one,
    /// as a single transactional unit (never zero or two votes visible).
    async fn upsert_vote(&self, room_id: &RoomId, user_id: &UserId, option_id: &OptionId) -> Vote;
    async fn vote_for_user(&self, room_id: &RoomId, user_id: &UserId) -> Option<Vote>;
    async fn votes_for_room(&self, room_id: &RoomId) -> Vec<Vote>;
}
