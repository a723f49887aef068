//! Binary entrypoint: read JSON command lines from stdin, write JSON lines to stdout.
//!
//! Each input line is a command tagged by `op`:
//! - `register_player`, `schedule_match`: set up a match
//! - `record_delivery`: a raw delivery, answered with its DeliveryOutcome
//! - `scorecard`, `next_position`, `last_delivery`, `player_stat`: reads
//!
//! Every command produces exactly one output line, either its result or an
//! ErrorOutput. Logs go to stderr (`RUST_LOG`, default `info`).

use std::io::{self, BufRead, Write};
use std::process;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use scoring_engine::store::InMemoryStore;
use scoring_engine::types::{ErrorOutput, MatchId, PlayerId, PlayerProfile};
use scoring_engine::{Config, Engine, Fixture, RawDelivery, ScoringError};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
  RegisterPlayer(PlayerProfile),
  ScheduleMatch(Fixture),
  RecordDelivery(RawDelivery),
  Scorecard { match_id: MatchId },
  NextPosition { match_id: MatchId },
  LastDelivery { match_id: MatchId },
  PlayerStat { match_id: MatchId, player_id: PlayerId },
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let config = match Config::from_env() {
    Ok(c) => c,
    Err(e) => {
      error!(error = %e, "invalid configuration");
      process::exit(2);
    }
  };
  info!(?config, "scoring-engine starting");
  let engine = Engine::in_memory(config);

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        error!(error = %e, "stdin read failed");
        process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let result = serde_json::from_str::<Command>(trimmed)
      .map_err(ScoringError::from)
      .and_then(|cmd| run(&engine, cmd));

    let written = match result {
      Ok(value) => emit(&mut out, &value),
      Err(e) => emit(&mut out, &ErrorOutput::from(&e)),
    };
    if let Err(e) = written.and_then(|_| out.flush()) {
      error!(error = %e, "stdout write failed");
      process::exit(1);
    }
  }
}

fn run(engine: &Engine<InMemoryStore>, cmd: Command) -> Result<serde_json::Value, ScoringError> {
  let value = match cmd {
    Command::RegisterPlayer(profile) => {
      let player_id = profile.player_id;
      engine.store().register_player(profile);
      json!({ "ok": true, "player_id": player_id })
    }
    Command::ScheduleMatch(fixture) => {
      let match_id = fixture.match_id;
      engine.schedule_match(fixture)?;
      json!({ "ok": true, "match_id": match_id })
    }
    Command::RecordDelivery(raw) => {
      // A payload without match_id fails validation before the target is used.
      let match_id = raw.match_id.unwrap_or_default();
      serde_json::to_value(engine.record_delivery(match_id, &raw)?)?
    }
    Command::Scorecard { match_id } => serde_json::to_value(engine.scorecard(match_id)?)?,
    Command::NextPosition { match_id } => {
      json!({ "match_id": match_id, "next": engine.next_position(match_id)? })
    }
    Command::LastDelivery { match_id } => {
      json!({ "match_id": match_id, "delivery": engine.last_delivery(match_id)? })
    }
    Command::PlayerStat {
      match_id,
      player_id,
    } => serde_json::to_value(engine.player_stat(match_id, player_id)?)?,
  };
  Ok(value)
}

fn emit(out: &mut impl Write, value: &impl Serialize) -> io::Result<()> {
  serde_json::to_writer(&mut *out, value)?;
  writeln!(out)
}
