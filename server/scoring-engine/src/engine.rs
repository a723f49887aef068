//! Core engine: validates deliveries and applies them to every dependent
//! aggregate in one store transaction.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ScoringError;
use crate::innings;
use crate::normalize;
use crate::stats;
use crate::store::{InMemoryStore, MatchBook, MatchLookup, MatchTxn, PlayerLookup, ScoreStore};
use crate::types::*;

/// Role label for players without a profile.
const UNKNOWN_ROLE: &str = "unknown";

/// The scoring engine. Shared by reference across threads; all match state
/// lives in the store.
pub struct Engine<S> {
  config: Config,
  store: S,
}

impl Engine<InMemoryStore> {
  pub fn in_memory(config: Config) -> Self {
    let store = InMemoryStore::new(&config);
    Self::new(config, store)
  }

  pub fn with_defaults() -> Self {
    Self::in_memory(Config::default())
  }
}

/// Role labels resolved before the transaction starts.
struct Roles {
  batsman: String,
  bowler: String,
  dismissed: Option<String>,
}

impl<S> Engine<S>
where
  S: MatchLookup + PlayerLookup + ScoreStore,
{
  pub fn new(config: Config, store: S) -> Self {
    Self { config, store }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Create the match book for a fixture: both innings rows plus a stat row
  /// for every squad player. A `max_overs` of 0 takes the configured default.
  pub fn schedule_match(&self, mut fixture: Fixture) -> Result<(), ScoringError> {
    if fixture.max_overs == 0 {
      fixture.max_overs = self.config.default_max_overs;
    }
    if let Some(p) = fixture.home_squad.iter().find(|p| fixture.away_squad.contains(p)) {
      return Err(ScoringError::validation(
        "away_squad",
        &format!("player {} is in both squads", p),
      ));
    }

    let mut book = MatchBook::new(fixture.clone());
    for player_id in fixture.home_squad.iter().chain(&fixture.away_squad) {
      book.seed_stat(*player_id, self.role_for(*player_id)?);
    }
    self.store.create(book)?;

    info!(
      match_id = %fixture.match_id,
      max_overs = fixture.max_overs,
      squad_players = fixture.home_squad.len() + fixture.away_squad.len(),
      "match scheduled"
    );
    Ok(())
  }

  /// Record one delivery for `match_id`.
  ///
  /// Either every aggregate the ball touches is updated and the delivery is
  /// appended, or nothing changes and an error is returned.
  pub fn record_delivery(
    &self,
    match_id: MatchId,
    raw: &RawDelivery,
  ) -> Result<DeliveryOutcome, ScoringError> {
    let result = self.try_record(match_id, raw);
    match &result {
      Ok(outcome) => {
        info!(
          %match_id,
          innings = %outcome.delivery.ball.innings,
          position = %outcome.delivery.position,
          seq = outcome.delivery.seq,
          score = outcome.innings.score,
          wickets = outcome.innings.wickets,
          "delivery recorded"
        );
        if let Some(closed) = outcome.innings_closed {
          info!(%match_id, innings = %closed, score = outcome.innings.score, "innings closed");
        }
      }
      Err(e) if e.is_retryable() => warn!(%match_id, error = %e, "delivery not recorded"),
      Err(e) => debug!(%match_id, kind = e.kind(), error = %e, "delivery rejected"),
    }
    result
  }

  fn try_record(&self, match_id: MatchId, raw: &RawDelivery) -> Result<DeliveryOutcome, ScoringError> {
    let sub = normalize::normalize(raw)?;
    if sub.ball.match_id != match_id {
      return Err(ScoringError::validation(
        "match_id",
        &format!("payload is for match {}, not {}", sub.ball.match_id, match_id),
      ));
    }

    let fixture = self.store.fixture(match_id)?;
    check_squads(&fixture, &sub.ball)?;

    let ball = &sub.ball;
    let roles = Roles {
      batsman: self.role_for(ball.batsman_id)?,
      bowler: self.role_for(ball.bowler_id)?,
      dismissed: match &ball.wicket {
        Some(w) if w.dismissed_batsman_id != ball.batsman_id => {
          Some(self.role_for(w.dismissed_batsman_id)?)
        }
        _ => None,
      },
    };

    self
      .store
      .transact(match_id, |txn| self.apply(txn, &sub, roles))
  }

  fn apply(
    &self,
    txn: &mut MatchTxn<'_>,
    sub: &Submission,
    roles: Roles,
  ) -> Result<DeliveryOutcome, ScoringError> {
    let ball = &sub.ball;
    let slot = txn.tracker().check(ball.innings, sub.position)?;
    check_not_out(txn, ball)?;
    let advance = txn.tracker_mut().advance(ball.is_legal());

    stats::record_batting(txn.stat_mut(ball.batsman_id, || roles.batsman), ball);
    stats::record_bowling(
      txn.stat_mut(ball.bowler_id, || roles.bowler),
      ball,
      slot,
      advance.over_completed,
      &self.config,
    );
    if let Some(wicket) = &ball.wicket {
      let role = roles.dismissed;
      let row = txn.stat_mut(wicket.dismissed_batsman_id, || {
        role.unwrap_or_else(|| UNKNOWN_ROLE.to_string())
      });
      stats::record_dismissal(row, ball, wicket, slot);
    }

    let agg = txn.innings_mut(ball.innings)?;
    innings::record_ball(agg, ball, &self.config);
    // 0 disables the all-out rule.
    let all_out = self.config.all_out_wickets > 0 && agg.wickets >= self.config.all_out_wickets;
    let closing = advance.innings_completed || all_out;
    if closing {
      agg.closed = true;
    }
    let innings_line = InningsLine::from(&*agg);
    let innings_closed = if closing {
      txn.tracker_mut().close_innings()
    } else {
      None
    };

    let seq = txn.next_seq();
    let delivery = Delivery {
      id: delivery_id(ball.match_id, slot, seq),
      seq,
      position: slot.position,
      ball: ball.clone(),
    };
    txn.append(delivery.clone());

    let dismissed = match &ball.wicket {
      Some(w) if w.dismissed_batsman_id != ball.batsman_id => {
        Some(stat_line(txn, w.dismissed_batsman_id)?)
      }
      _ => None,
    };

    Ok(DeliveryOutcome {
      delivery,
      batsman: stat_line(txn, ball.batsman_id)?,
      bowler: stat_line(txn, ball.bowler_id)?,
      dismissed,
      innings: innings_line,
      over_completed: advance.over_completed,
      innings_closed,
      phase: txn.tracker().phase(),
      next: txn.tracker().expected(),
    })
  }

  /// Most recently recorded delivery, if any.
  pub fn last_delivery(&self, match_id: MatchId) -> Result<Option<Delivery>, ScoringError> {
    self
      .store
      .read(match_id, |book| book.last_delivery().cloned())
  }

  /// Where the next delivery must be bowled; None once the match is complete.
  pub fn next_position(&self, match_id: MatchId) -> Result<Option<Slot>, ScoringError> {
    self.store.read(match_id, |book| book.tracker().expected())
  }

  pub fn scorecard(&self, match_id: MatchId) -> Result<Scorecard, ScoringError> {
    self.store.read(match_id, |book| Scorecard {
      match_id,
      max_overs: book.fixture().max_overs,
      phase: book.tracker().phase(),
      next: book.tracker().expected(),
      innings: book.innings_rows().map(InningsLine::from).collect(),
      players: book.stats().map(StatLine::from).collect(),
    })
  }

  pub fn player_stat(&self, match_id: MatchId, player_id: PlayerId) -> Result<StatLine, ScoringError> {
    self
      .store
      .read(match_id, |book| book.stat(player_id).map(StatLine::from))?
      .ok_or_else(|| ScoringError::not_found("player_match_stat", player_id))
  }

  fn role_for(&self, player_id: PlayerId) -> Result<String, ScoringError> {
    Ok(
      self
        .store
        .profile(player_id)?
        .map(|p| p.specialization)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
    )
  }
}

/// Batsmen must come from the batting side and the bowler from the fielding
/// side. Skipped for a side whose squad was not given.
fn check_squads(fixture: &Fixture, ball: &Ball) -> Result<(), ScoringError> {
  let batting = fixture.batting_squad(ball.innings);
  let bowling = fixture.bowling_squad(ball.innings);

  let mut batsmen = vec![("batsman_id", ball.batsman_id)];
  if let Some(w) = &ball.wicket {
    batsmen.push(("dismissed_batsman_id", w.dismissed_batsman_id));
  }
  if !batting.is_empty() {
    for (field, player) in batsmen {
      if !batting.contains(&player) {
        return Err(ScoringError::validation(
          field,
          &format!("player {} is not in the batting squad for innings {}", player, ball.innings),
        ));
      }
    }
  }
  if !bowling.is_empty() && !bowling.contains(&ball.bowler_id) {
    return Err(ScoringError::validation(
      "bowler_id",
      &format!("player {} is not in the bowling squad for innings {}", ball.bowler_id, ball.innings),
    ));
  }
  Ok(())
}

/// A batsman already dismissed in this innings can neither face nor be out again.
fn check_not_out(txn: &MatchTxn<'_>, ball: &Ball) -> Result<(), ScoringError> {
  let mut batsmen = vec![("batsman_id", ball.batsman_id)];
  if let Some(w) = &ball.wicket {
    batsmen.push(("dismissed_batsman_id", w.dismissed_batsman_id));
  }
  for (field, player) in batsmen {
    let dismissal = txn.stat(player).and_then(|s| s.batting.dismissal.as_ref());
    if let Some(d) = dismissal.filter(|d| d.at.innings == ball.innings) {
      return Err(ScoringError::validation(
        field,
        &format!("player {} was already dismissed at {}", player, d.at),
      ));
    }
  }
  Ok(())
}

/// Stable delivery id: hash of match + slot + sequence.
fn delivery_id(match_id: MatchId, slot: Slot, seq: u64) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(match_id.as_bytes());
  hasher.update(b"|");
  hasher.update(&[slot.innings.as_u8()]);
  hasher.update(b"|");
  hasher.update(slot.position.to_string().as_bytes());
  hasher.update(b"|");
  hasher.update(&seq.to_le_bytes());
  let hex = hasher.finalize().to_hex();
  format!("dlv-{}", &hex[..16])
}

fn stat_line(txn: &MatchTxn<'_>, player_id: PlayerId) -> Result<StatLine, ScoringError> {
  txn
    .stat(player_id)
    .map(StatLine::from)
    .ok_or_else(|| ScoringError::not_found("player_match_stat", player_id))
}
