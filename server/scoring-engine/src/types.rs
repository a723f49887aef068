//! Core types for the scoring engine (JSON contracts + internal models).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MatchId = Uuid;
pub type PlayerId = Uuid;

/// Balls in one over.
pub const BALLS_PER_OVER: u8 = 6;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the caller sends)
// ---------------------------------------------------------------------------

/// One raw delivery payload. Every field is optional at this layer so the
/// validator can name exactly which one is missing. Unknown fields are ignored.
///
/// Without `over`/`ball` or `ball_no` the delivery is recorded at the next
/// expected position, so a resubmission is recorded again. Send the position
/// to make resubmission fail with a sequence error instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDelivery {
  pub match_id: Option<MatchId>,
  pub innings: Option<u8>,
  pub over: Option<u32>,
  pub ball: Option<u8>,
  /// Position in "over.ball" notation, e.g. "3.4". Alternative to over + ball.
  pub ball_no: Option<String>,
  pub batsman_id: Option<PlayerId>,
  pub bowler_id: Option<PlayerId>,
  pub runs_off_bat: Option<u8>,
  pub is_wicket: Option<bool>,
  pub dismissed_batsman_id: Option<PlayerId>,
  pub dismissal: Option<String>,
  pub fielder_id: Option<PlayerId>,
  pub byes: Option<u32>,
  pub leg_byes: Option<u32>,
  pub is_wide: Option<bool>,
  pub is_no_ball: Option<bool>,
  pub is_four: Option<bool>,
  pub is_six: Option<bool>,
  pub timestamp: Option<String>,
}

/// Match scheduling input: format plus optional squads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
  pub match_id: MatchId,
  /// Overs per innings for the format (20 for T20, 50 for ODI).
  pub max_overs: u32,
  /// Bats first.
  #[serde(default)]
  pub home_squad: Vec<PlayerId>,
  #[serde(default)]
  pub away_squad: Vec<PlayerId>,
}

impl Fixture {
  pub fn new(match_id: MatchId, max_overs: u32) -> Self {
    Self {
      match_id,
      max_overs,
      home_squad: Vec::new(),
      away_squad: Vec::new(),
    }
  }

  pub fn with_squads(mut self, home: Vec<PlayerId>, away: Vec<PlayerId>) -> Self {
    self.home_squad = home;
    self.away_squad = away;
    self
  }

  pub fn batting_squad(&self, innings: InningsNumber) -> &[PlayerId] {
    match innings {
      InningsNumber::First => &self.home_squad,
      InningsNumber::Second => &self.away_squad,
    }
  }

  pub fn bowling_squad(&self, innings: InningsNumber) -> &[PlayerId] {
    match innings {
      InningsNumber::First => &self.away_squad,
      InningsNumber::Second => &self.home_squad,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
  pub player_id: PlayerId,
  pub specialization: String,
}

// ---------------------------------------------------------------------------
// Innings / position
// ---------------------------------------------------------------------------

/// Exactly two innings per match. Serialized as 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum InningsNumber {
  First,
  Second,
}

impl InningsNumber {
  pub fn next(self) -> Option<Self> {
    match self {
      Self::First => Some(Self::Second),
      Self::Second => None,
    }
  }

  pub fn as_u8(self) -> u8 {
    match self {
      Self::First => 1,
      Self::Second => 2,
    }
  }
}

impl TryFrom<u8> for InningsNumber {
  type Error = String;

  fn try_from(n: u8) -> Result<Self, Self::Error> {
    match n {
      1 => Ok(Self::First),
      2 => Ok(Self::Second),
      other => Err(format!("innings must be 1 or 2, got {}", other)),
    }
  }
}

impl From<InningsNumber> for u8 {
  fn from(n: InningsNumber) -> u8 {
    n.as_u8()
  }
}

impl fmt::Display for InningsNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_u8())
  }
}

/// Over (0-based) and ball within the over (1..=6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallPosition {
  pub over: u32,
  pub ball: u8,
}

impl BallPosition {
  pub const OPENING: Self = Self { over: 0, ball: 1 };

  pub fn new(over: u32, ball: u8) -> Self {
    Self { over, ball }
  }
}

impl fmt::Display for BallPosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.over, self.ball)
  }
}

impl FromStr for BallPosition {
  type Err = String;

  /// Parse "over.ball" notation. The ball digit is 1..=6.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (over, ball) = s
      .trim()
      .split_once('.')
      .ok_or_else(|| format!("expected over.ball, got {:?}", s))?;
    let over: u32 = over
      .parse()
      .map_err(|_| format!("invalid over in {:?}", s))?;
    let ball: u8 = ball
      .parse()
      .map_err(|_| format!("invalid ball in {:?}", s))?;
    if !(1..=BALLS_PER_OVER).contains(&ball) {
      return Err(format!("ball must be 1..=6, got {}", ball));
    }
    Ok(Self { over, ball })
  }
}

/// A fully-qualified position: innings plus over.ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
  pub innings: InningsNumber,
  pub position: BallPosition,
}

impl Slot {
  pub fn new(innings: InningsNumber, position: BallPosition) -> Self {
    Self { innings, position }
  }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "innings {} ball {}", self.innings, self.position)
  }
}

/// Innings lifecycle. No state is skipped; `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "innings", rename_all = "snake_case")]
pub enum InningsPhase {
  NotStarted,
  InProgress(InningsNumber),
  Complete,
}

// ---------------------------------------------------------------------------
// Dismissals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalKind {
  Bowled,
  Caught,
  Lbw,
  Stumped,
  RunOut,
  HitWicket,
  RetiredOut,
  ObstructingTheField,
  Unspecified,
}

impl DismissalKind {
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
      "bowled" | "b" => Some(Self::Bowled),
      "caught" | "c" | "caught_and_bowled" => Some(Self::Caught),
      "lbw" => Some(Self::Lbw),
      "stumped" | "st" => Some(Self::Stumped),
      "run_out" | "runout" => Some(Self::RunOut),
      "hit_wicket" => Some(Self::HitWicket),
      "retired_out" | "retired" => Some(Self::RetiredOut),
      "obstructing_the_field" | "obstructing" => Some(Self::ObstructingTheField),
      "unspecified" | "" => Some(Self::Unspecified),
      _ => None,
    }
  }

  /// Whether the bowler is credited with the wicket.
  pub fn credits_bowler(self) -> bool {
    !matches!(
      self,
      Self::RunOut | Self::RetiredOut | Self::ObstructingTheField
    )
  }
}

// ---------------------------------------------------------------------------
// Internal normalized types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wicket {
  pub dismissed_batsman_id: PlayerId,
  pub kind: DismissalKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fielder_id: Option<PlayerId>,
}

/// A validated ball, before the engine assigns its position and identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ball {
  pub match_id: MatchId,
  pub innings: InningsNumber,
  pub batsman_id: PlayerId,
  pub bowler_id: PlayerId,
  pub runs_off_bat: u8,
  pub byes: u32,
  pub leg_byes: u32,
  pub is_wide: bool,
  pub is_no_ball: bool,
  pub is_four: bool,
  pub is_six: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub wicket: Option<Wicket>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<DateTime<Utc>>,
}

impl Ball {
  /// Legal iff neither a wide nor a no-ball.
  pub fn is_legal(&self) -> bool {
    !self.is_wide && !self.is_no_ball
  }

  pub fn is_wicket(&self) -> bool {
    self.wicket.is_some()
  }
}

/// Validator output: the ball plus the position the caller claims, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
  pub ball: Ball,
  pub position: Option<BallPosition>,
}

/// One stored delivery. Append-only; never modified after commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
  pub id: String,
  /// 1-based sequence within the match.
  pub seq: u64,
  pub position: BallPosition,
  #[serde(flatten)]
  pub ball: Ball,
}

impl Delivery {
  pub fn slot(&self) -> Slot {
    Slot::new(self.ball.innings, self.position)
  }
}

// ---------------------------------------------------------------------------
// Aggregates (per match, persisted)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DismissalRecord {
  pub kind: DismissalKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bowler_id: Option<PlayerId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fielder_id: Option<PlayerId>,
  pub at: Slot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattingFigures {
  pub runs: u32,
  pub balls_faced: u32,
  pub fours: u32,
  pub sixes: u32,
  pub not_out: bool,
  pub dismissal: Option<DismissalRecord>,
}

/// The over a bowler is currently bowling, for maiden detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOver {
  pub innings: InningsNumber,
  pub over: u32,
  pub legal_balls: u8,
  pub runs_conceded: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BowlingFigures {
  pub balls_bowled: u32,
  pub runs_given: u32,
  pub wickets_taken: u32,
  pub wides_bowled: u32,
  pub no_balls: u32,
  pub maiden_overs: u32,
  pub open_over: Option<OpenOver>,
}

/// One row per (match, player), holding both batting and bowling figures.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMatchStat {
  pub match_id: MatchId,
  pub player_id: PlayerId,
  pub role: String,
  pub batting: BattingFigures,
  pub bowling: BowlingFigures,
  /// Bumped on every committed mutation.
  pub version: u64,
}

impl PlayerMatchStat {
  pub fn new(match_id: MatchId, player_id: PlayerId, role: impl Into<String>) -> Self {
    Self {
      match_id,
      player_id,
      role: role.into(),
      batting: BattingFigures::default(),
      bowling: BowlingFigures::default(),
      version: 0,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Extras {
  pub byes: u32,
  pub leg_byes: u32,
  pub wides: u32,
  pub no_balls: u32,
}

impl Extras {
  pub fn total(&self) -> u32 {
    self.byes + self.leg_byes + self.wides + self.no_balls
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InningsAggregate {
  pub match_id: MatchId,
  pub innings: InningsNumber,
  pub score: u32,
  pub wickets: u32,
  pub legal_balls_bowled: u32,
  pub extras: Extras,
  pub closed: bool,
  pub version: u64,
}

impl InningsAggregate {
  pub fn new(match_id: MatchId, innings: InningsNumber) -> Self {
    Self {
      match_id,
      innings,
      score: 0,
      wickets: 0,
      legal_balls_bowled: 0,
      extras: Extras::default(),
      closed: false,
      version: 0,
    }
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattingLine {
  pub runs: u32,
  pub balls_faced: u32,
  pub fours: u32,
  pub sixes: u32,
  /// Rounded to 2 decimal places.
  pub strike_rate: f64,
  pub not_out: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dismissal: Option<DismissalRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BowlingLine {
  pub balls_bowled: u32,
  pub overs: String,
  pub runs_given: u32,
  pub wickets_taken: u32,
  pub wides_bowled: u32,
  pub no_balls: u32,
  pub maiden_overs: u32,
  /// Rounded to 2 decimal places.
  pub economy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLine {
  pub player_id: PlayerId,
  pub role: String,
  pub batting: BattingLine,
  pub bowling: BowlingLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InningsLine {
  pub innings: InningsNumber,
  pub score: u32,
  pub wickets: u32,
  pub legal_balls_bowled: u32,
  pub overs: String,
  pub run_rate: f64,
  pub extras: Extras,
  pub closed: bool,
}

/// Everything one recorded delivery touched.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
  pub delivery: Delivery,
  pub batsman: StatLine,
  pub bowler: StatLine,
  /// Present when the dismissed batsman is not the striker (e.g. a run-out at the other end).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dismissed: Option<StatLine>,
  pub innings: InningsLine,
  pub over_completed: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub innings_closed: Option<InningsNumber>,
  pub phase: InningsPhase,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next: Option<Slot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
  pub match_id: MatchId,
  pub max_overs: u32,
  pub phase: InningsPhase,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next: Option<Slot>,
  pub innings: Vec<InningsLine>,
  pub players: Vec<StatLine>,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for rejected input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub kind: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
  pub retryable: bool,
}

impl ErrorOutput {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      error: true,
      kind: kind.into(),
      message: message.into(),
      field: None,
      retryable: false,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }

  pub fn retryable(mut self, retryable: bool) -> Self {
    self.retryable = retryable;
    self
  }
}

impl From<&crate::error::ScoringError> for ErrorOutput {
  fn from(e: &crate::error::ScoringError) -> Self {
    let out = Self::new(e.kind(), e.to_string()).retryable(e.is_retryable());
    match e {
      crate::error::ScoringError::Validation { field, .. } => out.with_field(field.clone()),
      _ => out,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ball_position_parses_over_ball_notation() {
    assert_eq!("3.4".parse::<BallPosition>(), Ok(BallPosition::new(3, 4)));
    assert_eq!(" 0.1 ".parse::<BallPosition>(), Ok(BallPosition::OPENING));
    assert!("3.7".parse::<BallPosition>().is_err());
    assert!("3.0".parse::<BallPosition>().is_err());
    assert!("34".parse::<BallPosition>().is_err());
    assert!("x.1".parse::<BallPosition>().is_err());
  }

  #[test]
  fn innings_number_serializes_as_integer() {
    assert_eq!(serde_json::to_string(&InningsNumber::Second).unwrap(), "2");
    let n: InningsNumber = serde_json::from_str("1").unwrap();
    assert_eq!(n, InningsNumber::First);
    assert!(serde_json::from_str::<InningsNumber>("3").is_err());
  }

  #[test]
  fn phase_serializes_with_innings() {
    let json = serde_json::to_value(InningsPhase::InProgress(InningsNumber::Second)).unwrap();
    assert_eq!(json["state"], "in_progress");
    assert_eq!(json["innings"], 2);
    let json = serde_json::to_value(InningsPhase::Complete).unwrap();
    assert_eq!(json["state"], "complete");
  }

  #[test]
  fn run_out_does_not_credit_bowler() {
    assert!(!DismissalKind::RunOut.credits_bowler());
    assert!(DismissalKind::Caught.credits_bowler());
    assert!(DismissalKind::Unspecified.credits_bowler());
    assert_eq!(DismissalKind::from_str_loose("Run Out"), Some(DismissalKind::RunOut));
    assert_eq!(DismissalKind::from_str_loose("hit-wicket"), Some(DismissalKind::HitWicket));
    assert_eq!(DismissalKind::from_str_loose("timed_out"), None);
  }

  #[test]
  fn squads_swap_between_innings() {
    let home = vec![Uuid::from_u128(1)];
    let away = vec![Uuid::from_u128(2)];
    let fixture = Fixture::new(Uuid::nil(), 20).with_squads(home.clone(), away.clone());
    assert_eq!(fixture.batting_squad(InningsNumber::First), &home[..]);
    assert_eq!(fixture.bowling_squad(InningsNumber::First), &away[..]);
    assert_eq!(fixture.batting_squad(InningsNumber::Second), &away[..]);
  }
}
