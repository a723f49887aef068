//! Property-based tests for scoring invariants
//!
//! Random delivery streams (legal balls, boundaries, extras, wickets) must
//! leave every aggregate consistent with every other.

use proptest::prelude::*;
use scoring_engine::types::*;
use scoring_engine::{Config, Engine, RawDelivery};
use uuid::Uuid;

const OPENERS: [u128; 2] = [1, 2];
const BOWLERS: [u128; 2] = [1001, 1002];

/// Batting pair; a dismissed batsman is replaced by a fresh player.
struct Crease {
  pair: [u128; 2],
  next_in: u128,
}

impl Crease {
  fn new() -> Self {
    Self {
      pair: OPENERS,
      next_in: 3,
    }
  }

  fn striker(&self, step: usize) -> u128 {
    self.pair[step % 2]
  }

  fn dismiss(&mut self, step: usize) {
    self.pair[step % 2] = self.next_in;
    self.next_in += 1;
  }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
  Bat(u8),
  Wide(u32),
  NoBall(u8),
  Byes(u32),
  LegByes(u32),
  Wicket,
}

fn kind() -> impl Strategy<Value = Kind> {
  prop_oneof![
    4 => (0u8..=6).prop_map(Kind::Bat),
    1 => (0u32..=4).prop_map(Kind::Wide),
    1 => (0u8..=6).prop_map(Kind::NoBall),
    1 => (1u32..=4).prop_map(Kind::Byes),
    1 => (1u32..=4).prop_map(Kind::LegByes),
    1 => Just(Kind::Wicket),
  ]
}

fn to_raw(match_id: MatchId, innings: u8, step: usize, striker: u128, kind: Kind) -> RawDelivery {
  let base = RawDelivery {
    match_id: Some(match_id),
    innings: Some(innings),
    batsman_id: Some(Uuid::from_u128(striker)),
    bowler_id: Some(Uuid::from_u128(BOWLERS[(step / 6) % 2])),
    ..Default::default()
  };
  match kind {
    Kind::Bat(runs) => RawDelivery {
      runs_off_bat: Some(runs),
      is_four: Some(runs == 4),
      is_six: Some(runs == 6),
      ..base
    },
    Kind::Wide(ran) => RawDelivery {
      is_wide: Some(true),
      byes: Some(ran),
      ..base
    },
    Kind::NoBall(runs) => RawDelivery {
      is_no_ball: Some(true),
      runs_off_bat: Some(runs),
      ..base
    },
    Kind::Byes(n) => RawDelivery {
      byes: Some(n),
      ..base
    },
    Kind::LegByes(n) => RawDelivery {
      leg_byes: Some(n),
      ..base
    },
    Kind::Wicket => RawDelivery {
      is_wicket: Some(true),
      dismissed_batsman_id: base.batsman_id,
      dismissal: Some("caught".into()),
      ..base
    },
  }
}

proptest! {
  /// Property: balls faced and balls bowled both sum to the legal balls of
  /// each innings, and the score is bat runs plus extras.
  #[test]
  fn ball_counts_are_conserved(kinds in prop::collection::vec(kind(), 1..200)) {
    let match_id = Uuid::from_u128(99);
    let engine = Engine::in_memory(Config::default());
    engine.schedule_match(Fixture::new(match_id, 5)).unwrap();

    let mut crease = Crease::new();
    let mut legal = 0u32;
    let mut bat_runs = 0u32;
    for (step, k) in kinds.iter().enumerate() {
      let Some(next) = engine.next_position(match_id).unwrap() else { break };
      let raw = to_raw(match_id, next.innings.as_u8(), step, crease.striker(step), *k);
      let out = engine.record_delivery(match_id, &raw).unwrap();
      if out.delivery.ball.is_wicket() {
        crease.dismiss(step);
      }

      prop_assert_eq!(out.delivery.position, next.position);
      prop_assert_eq!(out.delivery.seq, step as u64 + 1);
      if out.delivery.ball.is_legal() {
        legal += 1;
      }
      bat_runs += out.delivery.ball.runs_off_bat as u32;
    }

    let card = engine.scorecard(match_id).unwrap();
    let faced: u32 = card.players.iter().map(|p| p.batting.balls_faced).sum();
    let bowled: u32 = card.players.iter().map(|p| p.bowling.balls_bowled).sum();
    let innings_legal: u32 = card.innings.iter().map(|i| i.legal_balls_bowled).sum();
    let score: u32 = card.innings.iter().map(|i| i.score).sum();
    let extras: u32 = card.innings.iter().map(|i| i.extras.total()).sum();

    prop_assert_eq!(faced, legal);
    prop_assert_eq!(bowled, legal);
    prop_assert_eq!(innings_legal, legal);
    prop_assert_eq!(score, bat_runs + extras);
    for line in &card.innings {
      prop_assert!(line.legal_balls_bowled <= 5 * 6);
    }
  }

  /// Property: the bowler is never charged byes or leg-byes.
  #[test]
  fn bowlers_never_charged_byes(kinds in prop::collection::vec(kind(), 1..60)) {
    let match_id = Uuid::from_u128(98);
    let engine = Engine::in_memory(Config::default());
    engine.schedule_match(Fixture::new(match_id, 20)).unwrap();

    let mut crease = Crease::new();
    for (step, k) in kinds.iter().enumerate() {
      let Some(next) = engine.next_position(match_id).unwrap() else { break };
      let raw = to_raw(match_id, next.innings.as_u8(), step, crease.striker(step), *k);
      if engine.record_delivery(match_id, &raw).unwrap().delivery.ball.is_wicket() {
        crease.dismiss(step);
      }
    }

    let card = engine.scorecard(match_id).unwrap();
    let given: u32 = card.players.iter().map(|p| p.bowling.runs_given).sum();
    let score: u32 = card.innings.iter().map(|i| i.score).sum();
    let byes: u32 = card.innings.iter().map(|i| i.extras.byes + i.extras.leg_byes).sum();
    prop_assert_eq!(given, score - byes);
  }
}
