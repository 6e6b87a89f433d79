use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type UserId = String;
pub type RoomId = String;
pub type OptionId = String;
pub type ParticipantId = String;
pub type VoteId = String;

/// Lifecycle of a decision room. Linear, no backward transitions;
/// `Completed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Voting,
    Results,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TiebreakerMethod {
    Random,
    Dice,
    Coin,
    Spinner,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

/// How the tiebreaker animation should land, computed server-side so clients
/// only render a result they fetched. Always consistent with the winning
/// option: the die face / coin side / spinner angle maps onto the winner's
/// position within the tied set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum TiebreakerOutcome {
    Random,
    Dice { face: u8 },
    Coin { side: CoinSide },
    Spinner { angle: f64 },
}

/// Identity supplied by the upstream auth collaborator. Credentials live
/// there; this record only carries what the decision core needs to display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub title: String,
    pub description: Option<String>,
    /// Short join code, unique across rooms
    pub code: String,
    pub owner_id: UserId,
    /// Participant cap; None = unlimited
    pub max_participants: Option<u32>,
    /// When false, only the owner may add options
    pub allow_participant_options: bool,
    pub phase: RoomPhase,
    pub winning_option_id: Option<OptionId>,
    pub tiebreaker_used: Option<TiebreakerMethod>,
    pub created_at: String,
}

impl Room {
    pub fn is_completed(&self) -> bool {
        self.phase == RoomPhase::Completed
    }
}

/// A candidate choice within exactly one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomOption {
    pub id: OptionId,
    pub room_id: RoomId,
    pub text: String,
    pub created_by: UserId,
    pub created_at: String,
}

/// Membership of a user in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub joined_at: String,
}

/// One user's current choice in a room. At most one per (room, user);
/// a new vote replaces the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub option_id: OptionId,
    pub ts: String,
}

/// One row of a room's tally. Covers every option in the room, zero-vote
/// options included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TallyEntry {
    pub option_id: OptionId,
    pub vote_count: u32,
}
