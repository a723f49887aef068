//! Validate raw delivery payloads and normalize them into canonical Balls.

use chrono::{DateTime, Utc};

use crate::error::ScoringError;
use crate::types::*;

/// Highest number of runs a batsman can score off one ball.
const MAX_RUNS_OFF_BAT: u8 = 6;

/// Highest number of byes or leg-byes (including overthrows) off one ball.
const MAX_EXTRA_RUNS: u32 = 7;

/// Parse and validate a RawDelivery.
///
/// Absent numeric fields become 0 and absent flags become false here, so no
/// later stage has to default them again.
pub fn normalize(raw: &RawDelivery) -> Result<Submission, ScoringError> {
  // Required identifiers
  let match_id = raw
    .match_id
    .ok_or_else(|| ScoringError::validation("match_id", "is required"))?;
  let batsman_id = raw
    .batsman_id
    .ok_or_else(|| ScoringError::validation("batsman_id", "is required"))?;
  let bowler_id = raw
    .bowler_id
    .ok_or_else(|| ScoringError::validation("bowler_id", "is required"))?;
  let innings = raw
    .innings
    .ok_or_else(|| ScoringError::validation("innings", "is required"))?;
  let innings = InningsNumber::try_from(innings)
    .map_err(|reason| ScoringError::validation("innings", &reason))?;

  if batsman_id == bowler_id {
    return Err(ScoringError::validation(
      "bowler_id",
      "must differ from batsman_id",
    ));
  }

  // Explicit defaults
  let runs_off_bat = raw.runs_off_bat.unwrap_or(0);
  let byes = raw.byes.unwrap_or(0);
  let leg_byes = raw.leg_byes.unwrap_or(0);
  let is_wide = raw.is_wide.unwrap_or(false);
  let is_no_ball = raw.is_no_ball.unwrap_or(false);
  let is_four = raw.is_four.unwrap_or(false);
  let is_six = raw.is_six.unwrap_or(false);
  let is_wicket = raw.is_wicket.unwrap_or(false);

  if runs_off_bat > MAX_RUNS_OFF_BAT {
    return Err(ScoringError::validation("runs_off_bat", "must be 0..=6"));
  }
  if byes > MAX_EXTRA_RUNS {
    return Err(ScoringError::validation("byes", "must be 0..=7"));
  }
  if leg_byes > MAX_EXTRA_RUNS {
    return Err(ScoringError::validation("leg_byes", "must be 0..=7"));
  }
  if is_four && is_six {
    return Err(ScoringError::validation(
      "is_six",
      "is_four and is_six are mutually exclusive",
    ));
  }
  if is_four && runs_off_bat != 4 {
    return Err(ScoringError::validation("is_four", "requires runs_off_bat = 4"));
  }
  if is_six && runs_off_bat != 6 {
    return Err(ScoringError::validation("is_six", "requires runs_off_bat = 6"));
  }
  if is_wide && is_no_ball {
    return Err(ScoringError::validation(
      "is_no_ball",
      "a delivery cannot be both a wide and a no-ball",
    ));
  }
  if byes > 0 && leg_byes > 0 {
    return Err(ScoringError::validation(
      "leg_byes",
      "byes and leg_byes cannot both be set",
    ));
  }
  if (byes > 0 || leg_byes > 0) && runs_off_bat > 0 {
    return Err(ScoringError::validation(
      "runs_off_bat",
      "must be 0 on a bye or leg-bye",
    ));
  }
  if is_wide && runs_off_bat > 0 {
    return Err(ScoringError::validation(
      "runs_off_bat",
      "cannot score off the bat on a wide",
    ));
  }
  if is_wide && leg_byes > 0 {
    return Err(ScoringError::validation(
      "leg_byes",
      "leg-byes cannot be scored on a wide",
    ));
  }

  // Wicket fields must agree
  let wicket = match (is_wicket, raw.dismissed_batsman_id) {
    (true, Some(dismissed_batsman_id)) => {
      if dismissed_batsman_id == bowler_id {
        return Err(ScoringError::validation(
          "dismissed_batsman_id",
          "must differ from bowler_id",
        ));
      }
      let kind = match raw.dismissal.as_deref() {
        Some(s) => DismissalKind::from_str_loose(s).ok_or_else(|| {
          ScoringError::validation("dismissal", &format!("unknown dismissal kind {:?}", s))
        })?,
        None => DismissalKind::Unspecified,
      };
      Some(Wicket {
        dismissed_batsman_id,
        kind,
        fielder_id: raw.fielder_id,
      })
    }
    (true, None) => {
      return Err(ScoringError::validation(
        "dismissed_batsman_id",
        "is required when is_wicket is true",
      ))
    }
    (false, Some(_)) => {
      return Err(ScoringError::validation(
        "dismissed_batsman_id",
        "must be absent unless is_wicket is true",
      ))
    }
    (false, None) => None,
  };

  let position = parse_position(raw)?;

  let timestamp = match &raw.timestamp {
    Some(t) => Some(
      DateTime::parse_from_rfc3339(t)
        .map_err(|e| ScoringError::validation("timestamp", &format!("invalid RFC3339: {}", e)))?
        .with_timezone(&Utc),
    ),
    None => None,
  };

  Ok(Submission {
    ball: Ball {
      match_id,
      innings,
      batsman_id,
      bowler_id,
      runs_off_bat,
      byes,
      leg_byes,
      is_wide,
      is_no_ball,
      is_four,
      is_six,
      wicket,
      timestamp,
    },
    position,
  })
}

/// Position from either `over` + `ball` or `ball_no` ("over.ball"). Both
/// forms may be given only if they agree; neither means "next ball".
fn parse_position(raw: &RawDelivery) -> Result<Option<BallPosition>, ScoringError> {
  let explicit = match (raw.over, raw.ball) {
    (Some(over), Some(ball)) => {
      if !(1..=BALLS_PER_OVER).contains(&ball) {
        return Err(ScoringError::validation("ball", "must be 1..=6"));
      }
      Some(BallPosition::new(over, ball))
    }
    (Some(_), None) => return Err(ScoringError::validation("ball", "is required with over")),
    (None, Some(_)) => return Err(ScoringError::validation("over", "is required with ball")),
    (None, None) => None,
  };

  let notated = match &raw.ball_no {
    Some(s) => Some(
      s.parse::<BallPosition>()
        .map_err(|reason| ScoringError::validation("ball_no", &reason))?,
    ),
    None => None,
  };

  match (explicit, notated) {
    (Some(a), Some(b)) if a != b => Err(ScoringError::validation(
      "ball_no",
      "disagrees with over and ball",
    )),
    (a, b) => Ok(a.or(b)),
  }
}
