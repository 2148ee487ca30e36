//! Unit of Work pattern implementation.
//!
//! A [`UnitOfWork`] groups the changes staged through its repositories and
//! applies them in one database transaction on [`UnitOfWork::commit`].
//! Either every staged change becomes visible or none does.
//!
//! Lifecycle: `Open` until a commit starts (`Committing`), then
//! `Committed` on success or `RolledBack` on failure or cancellation. An
//! explicit rollback or release by drop also ends `RolledBack`, staged
//! changes discarded. Units that are no longer open refuse further
//! repository access.

use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::repositories::{PendingChange, Record, Repository, RepositorySlots};
use crate::errors::{AppError, AppResult};

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lifecycle state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Open,
    /// A commit is in flight
    Committing,
    Committed,
    RolledBack,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitState::Open => "open",
            UnitState::Committing => "committing",
            UnitState::Committed => "committed",
            UnitState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// State shared between a unit of work and the repositories it hands out.
pub(crate) struct Scope {
    id: Uuid,
    state: Mutex<UnitState>,
    journal: Mutex<Vec<Box<dyn PendingChange>>>,
}

impl Scope {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(UnitState::Open),
            journal: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> UnitState {
        *lock(&self.state)
    }

    pub(crate) fn ensure_open(&self) -> AppResult<()> {
        match self.state() {
            UnitState::Open => Ok(()),
            state => Err(AppError::invalid_state(format!(
                "unit of work {} is already {}",
                self.id, state
            ))),
        }
    }

    /// Append a change to the journal if the unit is still open.
    pub(crate) fn stage(&self, change: Box<dyn PendingChange>) -> AppResult<()> {
        let state = lock(&self.state);
        if *state != UnitState::Open {
            return Err(AppError::invalid_state(format!(
                "unit of work {} is already {}",
                self.id, *state
            )));
        }
        tracing::trace!(unit = %self.id, change = %change.describe(), "change staged");
        lock(&self.journal).push(change);
        Ok(())
    }

    fn pending(&self) -> usize {
        lock(&self.journal).len()
    }

    /// Drain the journal and move to `Committing`. Fails unless the unit
    /// is open.
    fn take_for_commit(&self) -> AppResult<Vec<Box<dyn PendingChange>>> {
        let mut state = lock(&self.state);
        if *state != UnitState::Open {
            return Err(AppError::invalid_state(format!(
                "unit of work {} is already {}",
                self.id, *state
            )));
        }
        *state = UnitState::Committing;
        Ok(std::mem::take(&mut *lock(&self.journal)))
    }

    fn finish(&self, outcome: UnitState) {
        *lock(&self.state) = outcome;
    }

    /// Mark an open unit rolled back and return how many changes were dropped.
    fn discard(&self) -> Option<usize> {
        let mut state = lock(&self.state);
        if *state != UnitState::Open {
            return None;
        }
        *state = UnitState::RolledBack;
        let mut journal = lock(&self.journal);
        let dropped = journal.len();
        journal.clear();
        Some(dropped)
    }
}

/// Ends a commit that was dropped mid-flight as `RolledBack`.
struct InFlightCommit<'a> {
    scope: &'a Scope,
    settled: bool,
}

impl Drop for InFlightCommit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.scope.finish(UnitState::RolledBack);
            tracing::warn!(unit = %self.scope.id, "commit cancelled, rolled back");
        }
    }
}

/// Factory for units of work over one database connection pool.
#[derive(Clone)]
pub struct Persistence {
    db: DatabaseConnection,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Start a fresh unit of work. Each request should own its own unit.
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::new(self.db.clone())
    }
}

/// A batch of staged changes committed atomically.
pub struct UnitOfWork {
    scope: Arc<Scope>,
    db: DatabaseConnection,
    repositories: RepositorySlots,
}

impl UnitOfWork {
    fn new(db: DatabaseConnection) -> Self {
        let scope = Arc::new(Scope::new());
        tracing::trace!(unit = %scope.id, "unit of work started");
        Self {
            scope,
            db,
            repositories: RepositorySlots::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.scope.id
    }

    pub fn state(&self) -> UnitState {
        self.scope.state()
    }

    /// Number of staged changes not yet committed.
    pub fn pending_changes(&self) -> usize {
        self.scope.pending()
    }

    /// The repository for `R` within this unit.
    ///
    /// Repeated calls return the same instance, so changes staged through
    /// one handle are visible through every other.
    pub fn repository<R: Record>(&self) -> AppResult<Arc<Repository<R>>> {
        self.scope.ensure_open()?;

        let repository = R::slot(&self.repositories)
            .get_or_init(|| Arc::new(Repository::new(self.scope.clone(), self.db.clone())));
        Ok(repository.clone())
    }

    /// Apply every staged change in one transaction.
    ///
    /// On failure the transaction is rolled back, the unit ends `RolledBack`
    /// and the store is left exactly as it was.
    ///
    /// If the returned future is dropped before it completes, the unit ends
    /// `RolledBack` and nothing staged is kept.
    pub async fn commit(&self) -> AppResult<()> {
        let pending = self.scope.take_for_commit()?;
        let count = pending.len();
        let mut in_flight = InFlightCommit {
            scope: &self.scope,
            settled: false,
        };

        let outcome = self.apply(&pending).await;
        in_flight.settled = true;

        match outcome {
            Ok(()) => {
                self.scope.finish(UnitState::Committed);
                tracing::debug!(unit = %self.scope.id, changes = count, "unit of work committed");
                Ok(())
            }
            Err(e) => {
                self.scope.finish(UnitState::RolledBack);
                tracing::warn!(unit = %self.scope.id, changes = count, error = %e, "commit failed, rolled back");
                Err(AppError::Persistence(e))
            }
        }
    }

    async fn apply(&self, pending: &[Box<dyn PendingChange>]) -> Result<(), DbErr> {
        if pending.is_empty() {
            return Ok(());
        }

        // Dropping `txn` on any early exit, cancellation included, rolls it back.
        let txn = self.db.begin().await?;
        for change in pending {
            if let Err(e) = change.apply(&txn).await {
                tracing::debug!(unit = %self.scope.id, change = %change.describe(), error = %e, "change rejected");
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                return Err(e);
            }
        }
        txn.commit().await
    }

    /// Discard every staged change. Fails if the unit already ended.
    pub fn rollback(&self) -> AppResult<()> {
        match self.scope.discard() {
            Some(dropped) => {
                tracing::debug!(unit = %self.scope.id, discarded = dropped, "unit of work rolled back");
                Ok(())
            }
            None => Err(AppError::invalid_state(format!(
                "unit of work {} is already {}",
                self.scope.id,
                self.scope.state()
            ))),
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Some(dropped) = self.scope.discard() {
            if dropped > 0 {
                tracing::debug!(
                    unit = %self.scope.id,
                    discarded = dropped,
                    "unit of work released without commit"
                );
            }
        }
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.scope.id)
            .field("state", &self.state())
            .field("pending_changes", &self.pending_changes())
            .finish()
    }
}
