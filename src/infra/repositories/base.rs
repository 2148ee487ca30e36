//! Generic repository over any persisted record type.
//!
//! A [`Repository`] belongs to exactly one [`UnitOfWork`](crate::infra::UnitOfWork).
//! Writes are staged in memory and journaled on the owning unit; nothing
//! reaches the store until the unit commits. Reads see the store overlaid
//! with the changes staged through this repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};
use uuid::Uuid;

use super::entities::{ProductRecord, UserRecord};
use crate::errors::{AppError, AppResult};
use crate::infra::unit_of_work::{lock, Scope};

/// A row type the generic repository can manage.
///
/// Implemented by each SeaORM `Model`; ties the model to its entity and
/// active model and names its identity column.
pub trait Record: Clone + Send + Sync + 'static {
    type Table: EntityTrait<Model = Self, ActiveModel = Self::Active>;
    type Active: ActiveModelTrait<Entity = Self::Table>
        + ActiveModelBehavior
        + From<Self>
        + Send
        + Sync
        + 'static;

    /// Short name used in logs and error details
    const NAME: &'static str;

    fn id(&self) -> Uuid;

    fn id_column() -> <Self::Table as EntityTrait>::Column;

    /// Where a unit of work keeps its repository for this record type.
    fn slot(slots: &RepositorySlots) -> &OnceLock<Arc<Repository<Self>>>;
}

/// One lazily created repository per record type, resolved at compile time.
#[derive(Default)]
pub struct RepositorySlots {
    pub(crate) users: OnceLock<Arc<Repository<UserRecord>>>,
    pub(crate) products: OnceLock<Arc<Repository<ProductRecord>>>,
}

/// A write waiting in a unit of work's journal.
#[async_trait]
pub(crate) trait PendingChange: Send + Sync {
    async fn apply(&self, txn: &DatabaseTransaction) -> Result<(), DbErr>;

    fn describe(&self) -> String;
}

enum Op<R: Record> {
    Insert(R),
    Update(R),
    Delete(Uuid),
}

#[async_trait]
impl<R: Record> PendingChange for Op<R> {
    async fn apply(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        match self {
            Op::Insert(record) => {
                let active = R::Active::from(record.clone()).reset_all();
                R::Table::insert(active).exec(txn).await?;
            }
            Op::Update(record) => {
                let active = R::Active::from(record.clone()).reset_all();
                let result = R::Table::update_many()
                    .set(active)
                    .filter(R::id_column().eq(record.id()))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(DbErr::RecordNotUpdated);
                }
            }
            Op::Delete(id) => {
                let result = R::Table::delete_many()
                    .filter(R::id_column().eq(*id))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(DbErr::RecordNotFound(format!("{} {}", R::NAME, id)));
                }
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match self {
            Op::Insert(record) => format!("insert {} {}", R::NAME, record.id()),
            Op::Update(record) => format!("update {} {}", R::NAME, record.id()),
            Op::Delete(id) => format!("delete {} {}", R::NAME, id),
        }
    }
}

enum Staged<R> {
    Present(R),
    Removed,
}

/// Changes staged through one repository, in the order they were made.
struct View<R> {
    staged: HashMap<Uuid, Staged<R>>,
    added: Vec<Uuid>,
}

impl<R: Record> View<R> {
    fn new() -> Self {
        Self {
            staged: HashMap::new(),
            added: Vec::new(),
        }
    }

    /// `Some(hit)` when the view decides the answer without the store.
    fn lookup(&self, id: Uuid) -> Option<Option<R>> {
        self.staged.get(&id).map(|staged| match staged {
            Staged::Present(record) => Some(record.clone()),
            Staged::Removed => None,
        })
    }

    /// Store rows with staged updates and removals applied, then staged adds.
    fn overlay(&self, stored: Vec<R>) -> Vec<R> {
        let mut seen = HashSet::with_capacity(stored.len() + self.added.len());
        let mut out = Vec::with_capacity(stored.len() + self.added.len());

        for record in stored {
            let id = record.id();
            match self.staged.get(&id) {
                Some(Staged::Present(current)) => out.push(current.clone()),
                Some(Staged::Removed) => {}
                None => out.push(record),
            }
            seen.insert(id);
        }

        for id in &self.added {
            if !seen.insert(*id) {
                continue;
            }
            if let Some(Staged::Present(record)) = self.staged.get(id) {
                out.push(record.clone());
            }
        }

        out
    }
}

/// Collection-like access to one record type within a unit of work.
pub struct Repository<R: Record> {
    scope: Arc<Scope>,
    connection: DatabaseConnection,
    view: Mutex<View<R>>,
}

impl<R: Record> Repository<R> {
    pub(crate) fn new(scope: Arc<Scope>, connection: DatabaseConnection) -> Self {
        Self {
            scope,
            connection,
            view: Mutex::new(View::new()),
        }
    }

    /// Look up a record by id, honoring changes staged in this unit.
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<R>> {
        self.scope.ensure_open()?;

        let staged = lock(&self.view).lookup(id);
        if let Some(hit) = staged {
            return Ok(hit);
        }

        let found = R::Table::find()
            .filter(R::id_column().eq(id))
            .one(&self.connection)
            .await?;
        Ok(found)
    }

    /// Every visible record: committed rows minus staged removals, with
    /// staged updates applied and staged adds appended.
    pub async fn get_all(&self) -> AppResult<Vec<R>> {
        self.scope.ensure_open()?;

        let stored = R::Table::find().all(&self.connection).await?;
        let view = lock(&self.view);
        Ok(view.overlay(stored))
    }

    /// Stage a new record for insertion.
    pub fn add(&self, record: R) -> AppResult<()> {
        let id = record.id();
        self.scope.stage(Box::new(Op::Insert(record.clone())))?;

        let mut view = lock(&self.view);
        view.staged.insert(id, Staged::Present(record));
        view.added.push(id);
        Ok(())
    }

    /// Stage a replacement for a visible record.
    ///
    /// Returns [`AppError::NotFound`] when no record with that id is visible.
    pub async fn update(&self, record: R) -> AppResult<()> {
        let id = record.id();
        if self.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        self.scope.stage(Box::new(Op::Update(record.clone())))?;
        lock(&self.view).staged.insert(id, Staged::Present(record));
        Ok(())
    }

    /// Stage removal of a visible record.
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        if self.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        self.scope.stage(Box::new(Op::<R>::Delete(id)))?;
        lock(&self.view).staged.insert(id, Staged::Removed);
        Ok(())
    }
}
