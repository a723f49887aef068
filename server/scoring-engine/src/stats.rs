//! Per-player match figures: batting and bowling updates, derived rates.

use crate::config::Config;
use crate::types::*;

/// Round for display; full precision stays in the inputs.
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

/// Runs per 100 balls faced; 0 before the first ball faced.
pub fn strike_rate(b: &BattingFigures) -> f64 {
  if b.balls_faced > 0 {
    b.runs as f64 / b.balls_faced as f64 * 100.0
  } else {
    0.0
  }
}

/// Runs conceded per 6 legal balls; 0 before the first legal ball.
pub fn economy(b: &BowlingFigures) -> f64 {
  if b.balls_bowled > 0 {
    b.runs_given as f64 / b.balls_bowled as f64 * BALLS_PER_OVER as f64
  } else {
    0.0
  }
}

/// Overs in cricket notation: 15 legal balls is "2.3".
pub fn overs_notation(legal_balls: u32) -> String {
  let per_over = BALLS_PER_OVER as u32;
  format!("{}.{}", legal_balls / per_over, legal_balls % per_over)
}

/// Runs charged to the bowler for one ball.
///
/// Byes and leg-byes are never charged. Wides and no-balls carry their
/// penalty; runs taken on a wide are wides and are charged as well.
pub fn runs_conceded(ball: &Ball, config: &Config) -> u32 {
  let mut runs = ball.runs_off_bat as u32;
  if ball.is_wide {
    runs += config.wide_penalty + ball.byes;
  }
  if ball.is_no_ball {
    runs += config.no_ball_penalty;
  }
  runs
}

/// Apply one ball to the striker's batting figures.
pub fn record_batting(stat: &mut PlayerMatchStat, ball: &Ball) {
  let b = &mut stat.batting;
  b.runs += ball.runs_off_bat as u32;
  // No-balls are not counted as balls faced.
  if ball.is_legal() {
    b.balls_faced += 1;
  }
  if ball.is_four {
    b.fours += 1;
  }
  if ball.is_six {
    b.sixes += 1;
  }
  if b.dismissal.is_none() {
    b.not_out = true;
  }
}

/// Apply one ball to the bowler's figures. `over_completed` tells whether this ball
/// closed the over, for maiden detection.
pub fn record_bowling(
  stat: &mut PlayerMatchStat,
  ball: &Ball,
  recorded_at: Slot,
  over_completed: bool,
  config: &Config,
) {
  let conceded = runs_conceded(ball, config);
  let b = &mut stat.bowling;

  if ball.is_legal() {
    b.balls_bowled += 1;
  }
  b.runs_given += conceded;
  if ball.wicket.as_ref().is_some_and(|w| w.kind.credits_bowler()) {
    b.wickets_taken += 1;
  }
  if ball.is_wide {
    b.wides_bowled += 1;
  }
  if ball.is_no_ball {
    b.no_balls += 1;
  }

  // Track the over in hand; a change of over or innings starts a fresh one.
  let open = match b.open_over {
    Some(o) if o.innings == recorded_at.innings && o.over == recorded_at.position.over => o,
    _ => OpenOver {
      innings: recorded_at.innings,
      over: recorded_at.position.over,
      legal_balls: 0,
      runs_conceded: 0,
    },
  };
  let open = OpenOver {
    legal_balls: open.legal_balls + u8::from(ball.is_legal()),
    runs_conceded: open.runs_conceded + conceded,
    ..open
  };

  if over_completed {
    // A maiden needs the whole over from this bowler.
    if open.legal_balls == BALLS_PER_OVER && open.runs_conceded == 0 {
      b.maiden_overs += 1;
    }
    b.open_over = None;
  } else {
    b.open_over = Some(open);
  }
}

/// Record the dismissal on the dismissed batsman's row.
pub fn record_dismissal(stat: &mut PlayerMatchStat, ball: &Ball, wicket: &Wicket, at: Slot) {
  stat.batting.not_out = false;
  stat.batting.dismissal = Some(DismissalRecord {
    kind: wicket.kind,
    bowler_id: wicket.kind.credits_bowler().then_some(ball.bowler_id),
    fielder_id: wicket.fielder_id,
    at,
  });
}

impl From<&PlayerMatchStat> for StatLine {
  fn from(stat: &PlayerMatchStat) -> Self {
    let b = &stat.batting;
    let w = &stat.bowling;
    StatLine {
      player_id: stat.player_id,
      role: stat.role.clone(),
      batting: BattingLine {
        runs: b.runs,
        balls_faced: b.balls_faced,
        fours: b.fours,
        sixes: b.sixes,
        strike_rate: round2(strike_rate(b)),
        not_out: b.not_out,
        dismissal: b.dismissal.clone(),
      },
      bowling: BowlingLine {
        balls_bowled: w.balls_bowled,
        overs: overs_notation(w.balls_bowled),
        runs_given: w.runs_given,
        wickets_taken: w.wickets_taken,
        wides_bowled: w.wides_bowled,
        no_balls: w.no_balls,
        maiden_overs: w.maiden_overs,
        economy: round2(economy(w)),
      },
    }
  }
}
