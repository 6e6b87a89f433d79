mod lifecycle;
mod options;
mod participants;
mod tiebreaker;
mod votes;

pub use lifecycle::CreateRoom;
pub use tiebreaker::DecisionResult;

use std::sync::Arc;

use rand::Rng;

use crate::store::Store;

/// Safe character set for join codes (excludes 0/O and 1/I to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// Generate a random join code (6 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// The decision-resolution core: room lifecycle, participation guard, vote
/// tally, and tie resolution over an injected [`Store`].
#[derive(Clone)]
pub struct DecisionService {
    store: Arc<dyn Store>,
}

impl DecisionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Generate a join code no existing room uses (collision retry;
    /// extremely rare with ~1 billion combinations)
    pub(crate) async fn unique_room_code(&self) -> String {
        loop {
            let code = generate_room_code();
            if self.store.room_by_code(&code).await.is_none() {
                break code;
            }
        }
    }
}
