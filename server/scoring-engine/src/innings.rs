//! Per-innings totals: score, wickets, legal balls and extras.

use crate::config::Config;
use crate::stats::{overs_notation, round2};
use crate::types::*;

/// Apply one ball to its innings aggregate.
///
/// The score carries runs off the bat plus all extras: byes, leg-byes, and
/// the wide/no-ball penalties (runs taken on a wide count as wides).
pub fn record_ball(agg: &mut InningsAggregate, ball: &Ball, config: &Config) {
  let mut extras = Extras::default();
  if ball.is_wide {
    extras.wides = config.wide_penalty + ball.byes;
  } else {
    extras.byes = ball.byes;
  }
  extras.leg_byes = ball.leg_byes;
  if ball.is_no_ball {
    extras.no_balls = config.no_ball_penalty;
  }

  agg.score += ball.runs_off_bat as u32 + extras.total();
  agg.extras.byes += extras.byes;
  agg.extras.leg_byes += extras.leg_byes;
  agg.extras.wides += extras.wides;
  agg.extras.no_balls += extras.no_balls;

  if ball.is_legal() {
    agg.legal_balls_bowled += 1;
  }
  if ball.is_wicket() {
    agg.wickets += 1;
  }
}

/// Runs per over so far.
pub fn run_rate(agg: &InningsAggregate) -> f64 {
  if agg.legal_balls_bowled > 0 {
    agg.score as f64 / agg.legal_balls_bowled as f64 * BALLS_PER_OVER as f64
  } else {
    0.0
  }
}

impl From<&InningsAggregate> for InningsLine {
  fn from(agg: &InningsAggregate) -> Self {
    InningsLine {
      innings: agg.innings,
      score: agg.score,
      wickets: agg.wickets,
      legal_balls_bowled: agg.legal_balls_bowled,
      overs: overs_notation(agg.legal_balls_bowled),
      run_rate: round2(run_rate(agg)),
      extras: agg.extras,
      closed: agg.closed,
    }
  }
}
