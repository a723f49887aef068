//! Persistence gateway: collaborator traits plus an in-memory implementation.
//!
//! Every mutation for one delivery goes through [`ScoreStore::transact`]. The
//! closure works on a [`MatchTxn`] that stages changes over the current
//! [`MatchBook`]; nothing becomes visible unless the whole closure succeeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ScoringError;
use crate::tracker::OverTracker;
use crate::types::*;

/// Match lookup: format and squads.
pub trait MatchLookup {
  fn fixture(&self, match_id: MatchId) -> Result<Fixture, ScoringError>;
}

/// Player lookup. An unknown player is `Ok(None)`, not an error.
pub trait PlayerLookup {
  fn profile(&self, player_id: PlayerId) -> Result<Option<PlayerProfile>, ScoringError>;
}

/// Atomic per-match read-modify-write over the aggregates and delivery log.
pub trait ScoreStore {
  /// Persist a freshly scheduled match.
  fn create(&self, book: MatchBook) -> Result<(), ScoringError>;

  /// Run `f` against a staged view of the match and commit only on `Ok`.
  fn transact<T, F>(&self, match_id: MatchId, f: F) -> Result<T, ScoringError>
  where
    F: FnOnce(&mut MatchTxn<'_>) -> Result<T, ScoringError>;

  /// Read a consistent view of the match.
  fn read<T, F>(&self, match_id: MatchId, f: F) -> Result<T, ScoringError>
  where
    F: FnOnce(&MatchBook) -> T;
}

// ---------------------------------------------------------------------------
// Match book
// ---------------------------------------------------------------------------

/// Everything persisted for one match.
#[derive(Debug, Clone)]
pub struct MatchBook {
  fixture: Fixture,
  tracker: OverTracker,
  stats: BTreeMap<PlayerId, PlayerMatchStat>,
  innings: BTreeMap<InningsNumber, InningsAggregate>,
  log: Vec<Delivery>,
  version: u64,
}

impl MatchBook {
  /// New book for a fixture, with both innings rows created up front.
  pub fn new(fixture: Fixture) -> Self {
    let match_id = fixture.match_id;
    let innings = [InningsNumber::First, InningsNumber::Second]
      .into_iter()
      .map(|n| (n, InningsAggregate::new(match_id, n)))
      .collect();
    Self {
      tracker: OverTracker::new(match_id, fixture.max_overs),
      fixture,
      stats: BTreeMap::new(),
      innings,
      log: Vec::new(),
      version: 0,
    }
  }

  /// Pre-create a stat row (used when seeding squads at scheduling time).
  pub fn seed_stat(&mut self, player_id: PlayerId, role: impl Into<String>) {
    let match_id = self.fixture.match_id;
    self
      .stats
      .entry(player_id)
      .or_insert_with(|| PlayerMatchStat::new(match_id, player_id, role));
  }

  pub fn fixture(&self) -> &Fixture {
    &self.fixture
  }

  pub fn tracker(&self) -> &OverTracker {
    &self.tracker
  }

  pub fn stat(&self, player_id: PlayerId) -> Option<&PlayerMatchStat> {
    self.stats.get(&player_id)
  }

  /// All stat rows, ordered by player id.
  pub fn stats(&self) -> impl Iterator<Item = &PlayerMatchStat> {
    self.stats.values()
  }

  pub fn innings(&self, n: InningsNumber) -> Option<&InningsAggregate> {
    self.innings.get(&n)
  }

  pub fn innings_rows(&self) -> impl Iterator<Item = &InningsAggregate> {
    self.innings.values()
  }

  pub fn deliveries(&self) -> &[Delivery] {
    &self.log
  }

  pub fn last_delivery(&self) -> Option<&Delivery> {
    self.log.last()
  }

  /// Number of committed transactions.
  pub fn version(&self) -> u64 {
    self.version
  }

  fn apply(&mut self, staged: Staged) {
    self.tracker = staged.tracker;
    self.stats.extend(staged.stats);
    self.innings.extend(staged.innings);
    self.log.extend(staged.appended);
    self.version += 1;
  }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Staged changes over a match book. Rows are copied in on first write and
/// their version bumped once per transaction.
pub struct MatchTxn<'a> {
  book: &'a MatchBook,
  tracker: OverTracker,
  stats: BTreeMap<PlayerId, PlayerMatchStat>,
  innings: BTreeMap<InningsNumber, InningsAggregate>,
  appended: Vec<Delivery>,
}

struct Staged {
  tracker: OverTracker,
  stats: BTreeMap<PlayerId, PlayerMatchStat>,
  innings: BTreeMap<InningsNumber, InningsAggregate>,
  appended: Vec<Delivery>,
}

impl<'a> MatchTxn<'a> {
  pub fn begin(book: &'a MatchBook) -> Self {
    Self {
      book,
      tracker: book.tracker.clone(),
      stats: BTreeMap::new(),
      innings: BTreeMap::new(),
      appended: Vec::new(),
    }
  }

  pub fn fixture(&self) -> &Fixture {
    &self.book.fixture
  }

  pub fn tracker(&self) -> &OverTracker {
    &self.tracker
  }

  pub fn tracker_mut(&mut self) -> &mut OverTracker {
    &mut self.tracker
  }

  /// Current row, staged or committed.
  pub fn stat(&self, player_id: PlayerId) -> Option<&PlayerMatchStat> {
    self
      .stats
      .get(&player_id)
      .or_else(|| self.book.stats.get(&player_id))
  }

  /// Row for writing; created lazily with `role()` if the player has none yet.
  pub fn stat_mut(
    &mut self,
    player_id: PlayerId,
    role: impl FnOnce() -> String,
  ) -> &mut PlayerMatchStat {
    let book = self.book;
    self.stats.entry(player_id).or_insert_with(|| {
      let mut row = book
        .stats
        .get(&player_id)
        .cloned()
        .unwrap_or_else(|| PlayerMatchStat::new(book.fixture.match_id, player_id, role()));
      row.version += 1;
      row
    })
  }

  pub fn innings(&self, n: InningsNumber) -> Option<&InningsAggregate> {
    self.innings.get(&n).or_else(|| self.book.innings.get(&n))
  }

  pub fn innings_mut(&mut self, n: InningsNumber) -> Result<&mut InningsAggregate, ScoringError> {
    let book = self.book;
    if !self.innings.contains_key(&n) {
      let mut row = book.innings.get(&n).cloned().ok_or_else(|| {
        ScoringError::not_found("innings", format!("{}/{}", book.fixture.match_id, n))
      })?;
      row.version += 1;
      self.innings.insert(n, row);
    }
    self
      .innings
      .get_mut(&n)
      .ok_or_else(|| ScoringError::not_found("innings", n))
  }

  /// Sequence number the next appended delivery gets.
  pub fn next_seq(&self) -> u64 {
    (self.book.log.len() + self.appended.len()) as u64 + 1
  }

  pub fn append(&mut self, delivery: Delivery) {
    self.appended.push(delivery);
  }

  fn into_staged(self) -> Staged {
    Staged {
      tracker: self.tracker,
      stats: self.stats,
      innings: self.innings,
      appended: self.appended,
    }
  }
}

// ---------------------------------------------------------------------------
// In-memory gateway
// ---------------------------------------------------------------------------

/// One lock per match book: deliveries for one match serialize, different
/// matches run in parallel.
pub struct InMemoryStore {
  lock_timeout: Duration,
  players: RwLock<HashMap<PlayerId, PlayerProfile>>,
  books: RwLock<HashMap<MatchId, Arc<Mutex<MatchBook>>>>,
}

impl InMemoryStore {
  pub fn new(config: &Config) -> Self {
    Self {
      lock_timeout: config.storage_timeout,
      players: RwLock::new(HashMap::new()),
      books: RwLock::new(HashMap::new()),
    }
  }

  pub fn register_player(&self, profile: PlayerProfile) {
    self.players.write().insert(profile.player_id, profile);
  }

  fn book_handle(&self, match_id: MatchId) -> Result<Arc<Mutex<MatchBook>>, ScoringError> {
    self
      .books
      .read()
      .get(&match_id)
      .cloned()
      .ok_or_else(|| ScoringError::not_found("match", match_id))
  }

  fn lock_book<'h>(
    &self,
    handle: &'h Mutex<MatchBook>,
    match_id: MatchId,
  ) -> Result<parking_lot::MutexGuard<'h, MatchBook>, ScoringError> {
    handle.try_lock_for(self.lock_timeout).ok_or_else(|| {
      warn!(%match_id, timeout_ms = self.lock_timeout.as_millis() as u64, "match book lock timed out");
      ScoringError::StorageUnavailable(format!(
        "match {} is busy; lock not acquired within {:?}",
        match_id, self.lock_timeout
      ))
    })
  }
}

impl MatchLookup for InMemoryStore {
  fn fixture(&self, match_id: MatchId) -> Result<Fixture, ScoringError> {
    let handle = self.book_handle(match_id)?;
    let book = self.lock_book(&handle, match_id)?;
    Ok(book.fixture.clone())
  }
}

impl PlayerLookup for InMemoryStore {
  fn profile(&self, player_id: PlayerId) -> Result<Option<PlayerProfile>, ScoringError> {
    Ok(self.players.read().get(&player_id).cloned())
  }
}

impl ScoreStore for InMemoryStore {
  fn create(&self, book: MatchBook) -> Result<(), ScoringError> {
    let match_id = book.fixture.match_id;
    let mut books = self.books.write();
    if books.contains_key(&match_id) {
      return Err(ScoringError::validation("match_id", "match is already scheduled"));
    }
    books.insert(match_id, Arc::new(Mutex::new(book)));
    debug!(%match_id, "match book created");
    Ok(())
  }

  fn transact<T, F>(&self, match_id: MatchId, f: F) -> Result<T, ScoringError>
  where
    F: FnOnce(&mut MatchTxn<'_>) -> Result<T, ScoringError>,
  {
    let handle = self.book_handle(match_id)?;
    let mut book = self.lock_book(&handle, match_id)?;

    let mut txn = MatchTxn::begin(&book);
    let out = f(&mut txn)?;
    let staged = txn.into_staged();

    book.apply(staged);
    debug!(%match_id, version = book.version, "transaction committed");
    Ok(out)
  }

  fn read<T, F>(&self, match_id: MatchId, f: F) -> Result<T, ScoringError>
  where
    F: FnOnce(&MatchBook) -> T,
  {
    let handle = self.book_handle(match_id)?;
    let book = self.lock_book(&handle, match_id)?;
    Ok(f(&book))
  }
}
