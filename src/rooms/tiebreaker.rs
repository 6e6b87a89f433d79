use rand::Rng;
use serde::Serialize;

use super::DecisionService;
use crate::error::{AppResult, Error};
use crate::store::CompleteOutcome;
use crate::types::*;

/// Tied options a dice roll can distinguish (faces 1-6)
const DICE_MAX_OPTIONS: usize = 6;
/// A coin maps heads to the first option and tails to the second
const COIN_OPTIONS: usize = 2;

/// The committed result of a finalization. `outcome` carries the animation
/// data for the call that actually resolved a tie; replayed finalizations
/// return the recorded room with no outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub room: Room,
    pub outcome: Option<TiebreakerOutcome>,
}

/// Options holding the maximum vote count, in creation order.
/// Empty only when the tally itself is empty.
fn tied_options(tally: &[TallyEntry]) -> Vec<OptionId> {
    let Some(max) = tally.iter().map(|e| e.vote_count).max() else {
        return Vec::new();
    };
    tally
        .iter()
        .filter(|e| e.vote_count == max)
        .map(|e| e.option_id.clone())
        .collect()
}

/// Enforce each method's cardinality constraint server-side. An invalid
/// request fails; it never falls back to another method.
fn validate_method(method: TiebreakerMethod, tied: usize) -> AppResult<()> {
    match method {
        TiebreakerMethod::Coin if tied != COIN_OPTIONS => Err(Error::Validation(format!(
            "coin flip requires exactly {} tied options, got {}",
            COIN_OPTIONS, tied
        ))),
        TiebreakerMethod::Dice if tied > DICE_MAX_OPTIONS => Err(Error::Validation(format!(
            "dice roll supports at most {} tied options, got {}",
            DICE_MAX_OPTIONS, tied
        ))),
        _ => Ok(()),
    }
}

/// Pick one winner uniformly among `tied` options and derive the
/// presentation for the chosen method.
///
/// Dice, coin, and spinner are render variants over the same uniform draw:
/// the winner index comes first, and the face / side / angle is derived from
/// it, so every tied option wins with probability 1/N no matter the method.
fn select_winner(tied: usize, method: TiebreakerMethod) -> (usize, TiebreakerOutcome) {
    let mut rng = rand::rng();
    let index = rng.random_range(0..tied);

    let outcome = match method {
        TiebreakerMethod::Random => TiebreakerOutcome::Random,
        TiebreakerMethod::Dice => TiebreakerOutcome::Dice {
            face: (index + 1) as u8,
        },
        TiebreakerMethod::Coin => TiebreakerOutcome::Coin {
            side: if index == 0 {
                CoinSide::Heads
            } else {
                CoinSide::Tails
            },
        },
        TiebreakerMethod::Spinner => {
            // A uniformly random angle within the winner's arc
            let arc = 360.0 / tied as f64;
            let angle = index as f64 * arc + rng.random_range(0.0..arc);
            TiebreakerOutcome::Spinner { angle }
        }
    };

    (index, outcome)
}

impl DecisionService {
    /// Finalize a room's decision. Owner-only; legal from `Voting` (closing
    /// it implicitly) or `Results`.
    ///
    /// The tally read, tie detection, random selection, and the completion
    /// write form one logical operation: the store's completion is a
    /// check-and-set, so of two racing finalizations exactly one commits and
    /// the other observes the already-recorded winner without re-rolling.
    pub async fn complete_decision(
        &self,
        room_id: &RoomId,
        user: &UserId,
        method: Option<TiebreakerMethod>,
    ) -> AppResult<DecisionResult> {
        let room = self
            .store()
            .room(room_id)
            .await
            .ok_or_else(|| Error::NotFound("room not found".into()))?;

        Self::require_owner(&room, user)?;

        // Replayed finalization: return the recorded result, never re-roll
        if room.is_completed() {
            return Ok(DecisionResult {
                room,
                outcome: None,
            });
        }

        if !matches!(room.phase, RoomPhase::Voting | RoomPhase::Results) {
            return Err(Error::InvalidState(
                "voting has not been opened in this room".into(),
            ));
        }

        let tally = self.tally(room_id).await?;
        let total: u32 = tally.iter().map(|e| e.vote_count).sum();
        if total == 0 {
            return Err(Error::InvalidState("no votes have been cast yet".into()));
        }

        let tied = tied_options(&tally);
        let (winner, method_used, outcome) = if tied.len() == 1 {
            (tied[0].clone(), None, None)
        } else {
            let method = method.unwrap_or(TiebreakerMethod::Random);
            validate_method(method, tied.len())?;
            let (index, outcome) = select_winner(tied.len(), method);
            (tied[index].clone(), Some(method), Some(outcome))
        };

        match self.store().complete_room(room_id, &winner, method_used).await {
            Some(CompleteOutcome::Committed(room)) => {
                tracing::info!(
                    "Room {} completed, winner {} (tiebreaker {:?})",
                    room_id,
                    winner,
                    method_used
                );
                Ok(DecisionResult { room, outcome })
            }
            // Lost the completion race: hand back what was recorded
            Some(CompleteOutcome::AlreadyCompleted(room)) => Ok(DecisionResult {
                room,
                outcome: None,
            }),
            None => Err(Error::NotFound("room not found".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::lifecycle::CreateRoom;
    use crate::store::memory::MemStore;
    use std::sync::Arc;

    fn entry(option_id: &str, vote_count: u32) -> TallyEntry {
        TallyEntry {
            option_id: option_id.to_string(),
            vote_count,
        }
    }

    #[test]
    fn test_tied_options_detection() {
        let tally = vec![entry("a", 3), entry("b", 3), entry("c", 1)];
        assert_eq!(tied_options(&tally), vec!["a", "b"]);

        let tally = vec![entry("a", 5)];
        assert_eq!(tied_options(&tally), vec!["a"]);

        assert!(tied_options(&[]).is_empty());
    }

    #[test]
    fn test_zero_count_ties_detected() {
        // No votes at all: everything ties at zero
        let tally = vec![entry("a", 0), entry("b", 0)];
        assert_eq!(tied_options(&tally), vec!["a", "b"]);
    }

    #[test]
    fn test_method_validity() {
        assert!(validate_method(TiebreakerMethod::Coin, 3).is_err());
        assert!(validate_method(TiebreakerMethod::Coin, 2).is_ok());
        assert!(validate_method(TiebreakerMethod::Dice, 7).is_err());
        assert!(validate_method(TiebreakerMethod::Dice, 6).is_ok());
        for n in 2..=10 {
            assert!(validate_method(TiebreakerMethod::Random, n).is_ok());
            assert!(validate_method(TiebreakerMethod::Spinner, n).is_ok());
        }
    }

    #[test]
    fn test_select_winner_outcome_matches_index() {
        for _ in 0..50 {
            let (index, outcome) = select_winner(4, TiebreakerMethod::Dice);
            assert!(index < 4);
            assert_eq!(outcome, TiebreakerOutcome::Dice {
                face: (index + 1) as u8
            });

            let (index, outcome) = select_winner(2, TiebreakerMethod::Coin);
            let expected = if index == 0 {
                CoinSide::Heads
            } else {
                CoinSide::Tails
            };
            assert_eq!(outcome, TiebreakerOutcome::Coin { side: expected });

            let (index, outcome) = select_winner(3, TiebreakerMethod::Spinner);
            match outcome {
                TiebreakerOutcome::Spinner { angle } => {
                    let arc = 360.0 / 3.0;
                    assert!(angle >= index as f64 * arc);
                    assert!(angle < (index + 1) as f64 * arc);
                }
                other => panic!("expected spinner outcome, got {:?}", other),
            }
        }
    }

    // Service-level finalization tests

    struct Fixture {
        svc: DecisionService,
        owner: UserId,
        room: Room,
        pizza: RoomOption,
        tacos: RoomOption,
    }

    async fn voting_room() -> Fixture {
        let svc = DecisionService::new(Arc::new(MemStore::new()));
        let owner = "owner".to_string();
        let room = svc
            .create_room(
                CreateRoom {
                    title: "Lunch".to_string(),
                    description: None,
                    max_participants: None,
                    allow_participant_options: true,
                },
                &owner,
            )
            .await
            .unwrap();
        let pizza = svc.add_option(&room.id, "Pizza", &owner).await.unwrap();
        let tacos = svc.add_option(&room.id, "Tacos", &owner).await.unwrap();
        svc.open_voting(&room.id, &owner).await.unwrap();
        Fixture {
            svc,
            owner,
            room,
            pizza,
            tacos,
        }
    }

    #[tokio::test]
    async fn test_unique_max_records_no_tiebreaker() {
        let f = voting_room().await;
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u2".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &f.tacos.id, &"u3".to_string()).await.unwrap();

        let result = f
            .svc
            .complete_decision(&f.room.id, &f.owner, None)
            .await
            .unwrap();

        assert_eq!(result.room.winning_option_id.as_ref(), Some(&f.pizza.id));
        assert!(result.room.tiebreaker_used.is_none());
        assert!(result.outcome.is_none());
        assert!(result.room.is_completed());
    }

    #[tokio::test]
    async fn test_tie_uses_requested_method() {
        let f = voting_room().await;
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &f.tacos.id, &"u2".to_string()).await.unwrap();

        let result = f
            .svc
            .complete_decision(&f.room.id, &f.owner, Some(TiebreakerMethod::Coin))
            .await
            .unwrap();

        assert_eq!(result.room.tiebreaker_used, Some(TiebreakerMethod::Coin));
        let winner = result.room.winning_option_id.clone().unwrap();
        assert!(winner == f.pizza.id || winner == f.tacos.id);
        assert!(matches!(
            result.outcome,
            Some(TiebreakerOutcome::Coin { .. })
        ));
    }

    #[tokio::test]
    async fn test_coin_rejected_for_three_way_tie() {
        let f = voting_room().await;
        let sushi = f
            .svc
            .add_option(&f.room.id, "Sushi", &f.owner)
            .await
            .unwrap();
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &f.tacos.id, &"u2".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &sushi.id, &"u3".to_string()).await.unwrap();

        let result = f
            .svc
            .complete_decision(&f.room.id, &f.owner, Some(TiebreakerMethod::Coin))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        // The failed request must not have completed the room
        let room = f.svc.store().room(&f.room.id).await.unwrap();
        assert!(!room.is_completed());

        // Random handles any tie size
        let result = f
            .svc
            .complete_decision(&f.room.id, &f.owner, Some(TiebreakerMethod::Random))
            .await
            .unwrap();
        assert_eq!(result.room.tiebreaker_used, Some(TiebreakerMethod::Random));
    }

    #[tokio::test]
    async fn test_finalization_is_idempotent() {
        let f = voting_room().await;
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &f.tacos.id, &"u2".to_string()).await.unwrap();

        let first = f
            .svc
            .complete_decision(&f.room.id, &f.owner, Some(TiebreakerMethod::Random))
            .await
            .unwrap();
        let second = f
            .svc
            .complete_decision(&f.room.id, &f.owner, Some(TiebreakerMethod::Dice))
            .await
            .unwrap();

        // The second call returns the recorded result; no re-roll, no
        // method overwrite
        assert_eq!(
            first.room.winning_option_id,
            second.room.winning_option_id
        );
        assert_eq!(second.room.tiebreaker_used, Some(TiebreakerMethod::Random));
        assert!(second.outcome.is_none());
    }

    #[tokio::test]
    async fn test_finalization_requires_votes() {
        let f = voting_room().await;
        let result = f.svc.complete_decision(&f.room.id, &f.owner, None).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_finalization_owner_only() {
        let f = voting_room().await;
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();

        let result = f
            .svc
            .complete_decision(&f.room.id, &"u1".to_string(), None)
            .await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_finalization_from_waiting_fails() {
        let svc = DecisionService::new(Arc::new(MemStore::new()));
        let owner = "owner".to_string();
        let room = svc
            .create_room(
                CreateRoom {
                    title: "Lunch".to_string(),
                    description: None,
                    max_participants: None,
                    allow_participant_options: true,
                },
                &owner,
            )
            .await
            .unwrap();

        let result = svc.complete_decision(&room.id, &owner, None).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_finalization_from_results_phase() {
        let f = voting_room().await;
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();
        f.svc.close_voting(&f.room.id, &f.owner).await.unwrap();

        let result = f
            .svc
            .complete_decision(&f.room.id, &f.owner, None)
            .await
            .unwrap();
        assert!(result.room.is_completed());
        assert_eq!(result.room.winning_option_id.as_ref(), Some(&f.pizza.id));
    }

    #[tokio::test]
    async fn test_dice_outcome_face_matches_winner() {
        let f = voting_room().await;
        f.svc.cast_vote(&f.room.id, &f.pizza.id, &"u1".to_string()).await.unwrap();
        f.svc.cast_vote(&f.room.id, &f.tacos.id, &"u2".to_string()).await.unwrap();

        let result = f
            .svc
            .complete_decision(&f.room.id, &f.owner, Some(TiebreakerMethod::Dice))
            .await
            .unwrap();

        let winner = result.room.winning_option_id.clone().unwrap();
        match result.outcome {
            Some(TiebreakerOutcome::Dice { face }) => {
                // Tied set is [pizza, tacos] in creation order
                let expected = if winner == f.pizza.id { 1 } else { 2 };
                assert_eq!(face, expected);
            }
            other => panic!("expected dice outcome, got {:?}", other),
        }
    }
}
