//! Over/ball progression and the innings lifecycle for one match.
//!
//! The tracker is the ordering authority: it owns the next expected slot and
//! is persisted with the match, so positions are never inferred from history.

use uuid::Uuid;

use crate::error::ScoringError;
use crate::types::{BallPosition, InningsNumber, InningsPhase, Slot, BALLS_PER_OVER};

/// What one delivery did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
  /// Where the delivery was recorded.
  pub recorded_at: Slot,
  pub over_completed: bool,
  /// The over limit was reached on this delivery.
  pub innings_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverTracker {
  match_id: Uuid,
  phase: InningsPhase,
  /// 0-based.
  over: u32,
  /// 1-based, 1..=6. Position of the next delivery.
  ball: u8,
  max_overs: u32,
}

impl OverTracker {
  pub fn new(match_id: Uuid, max_overs: u32) -> Self {
    Self {
      match_id,
      phase: InningsPhase::NotStarted,
      over: 0,
      ball: 1,
      max_overs,
    }
  }

  pub fn phase(&self) -> InningsPhase {
    self.phase
  }

  pub fn max_overs(&self) -> u32 {
    self.max_overs
  }

  /// Innings the next delivery belongs to, or None once the match is complete.
  pub fn current_innings(&self) -> Option<InningsNumber> {
    match self.phase {
      InningsPhase::NotStarted => Some(InningsNumber::First),
      InningsPhase::InProgress(n) => Some(n),
      InningsPhase::Complete => None,
    }
  }

  pub fn expected(&self) -> Option<Slot> {
    self
      .current_innings()
      .map(|n| Slot::new(n, BallPosition::new(self.over, self.ball)))
  }

  /// Resolve the slot for a submission, rejecting anything that is not the
  /// next expected ball. An absent position takes the expected one.
  pub fn check(
    &self,
    innings: InningsNumber,
    position: Option<BallPosition>,
  ) -> Result<Slot, ScoringError> {
    let expected = self.expected().ok_or(ScoringError::MatchComplete {
      match_id: self.match_id,
      innings,
    })?;

    if innings < expected.innings {
      return Err(ScoringError::MatchComplete {
        match_id: self.match_id,
        innings,
      });
    }

    let got = Slot::new(innings, position.unwrap_or(expected.position));
    if got != expected {
      return Err(ScoringError::Sequence { expected, got });
    }
    Ok(expected)
  }

  /// Apply one delivery. Only legal deliveries move the ball counter; a wide
  /// or no-ball is recorded at the current position and re-bowled.
  ///
  /// Call `check` first; the tracker must not be complete.
  pub fn advance(&mut self, legal: bool) -> Advance {
    let innings = self.current_innings().unwrap_or(InningsNumber::Second);
    let recorded_at = Slot::new(innings, BallPosition::new(self.over, self.ball));
    if self.phase == InningsPhase::NotStarted {
      self.phase = InningsPhase::InProgress(InningsNumber::First);
    }

    let mut over_completed = false;
    if legal {
      if self.ball == BALLS_PER_OVER {
        self.over += 1;
        self.ball = 1;
        over_completed = true;
      } else {
        self.ball += 1;
      }
    }

    Advance {
      recorded_at,
      over_completed,
      innings_completed: over_completed && self.is_innings_complete(),
    }
  }

  /// True once the over limit has been bowled in the current innings.
  pub fn is_innings_complete(&self) -> bool {
    self.over >= self.max_overs && self.ball == 1
  }

  /// Close the current innings: innings 1 hands over to innings 2 at 0.1,
  /// innings 2 completes the match. Returns the innings that was closed.
  pub fn close_innings(&mut self) -> Option<InningsNumber> {
    let closing = match self.phase {
      InningsPhase::NotStarted => InningsNumber::First,
      InningsPhase::InProgress(n) => n,
      InningsPhase::Complete => return None,
    };
    self.phase = match closing.next() {
      Some(next) => InningsPhase::InProgress(next),
      None => InningsPhase::Complete,
    };
    self.over = 0;
    self.ball = 1;
    Some(closing)
  }
}
