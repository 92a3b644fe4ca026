mod providers;
mod tree;

pub use tree::{Tree, KEY_SEPARATOR};

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{Id, InvestmentId, RewardId, UserId},
    time::LedgerDay,
    tokio::sync::{Mutex, OwnedMutexGuard},
};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    IVec,
};
use strum::IntoEnumIterator;

use crate::core::storage::LedgerStorage;

/// Entities whose writes must be serialized.
///
/// Every money movement for an investment happens under its
/// `Investment` key, including the reservation flow of any withdrawal
/// against it. Quota and referral rows have their own keys so a busy
/// investment does not slow down unrelated users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Investment(InvestmentId),
    Quota(UserId, LedgerDay),
    Referral(UserId),
}

/// Ledger storage on sled.
///
/// Concurrency control is two-layered: an in-process mutex per entity
/// serializes writers, and the money-critical pair of trees in each
/// write goes through a sled transaction so a crash cannot land half
/// of it. Index trees are written outside the transaction and repaired
/// by the expiry sweep when a crash separates them.
pub struct SledStorage {
    db: sled::Db,

    investments: sled::Tree,
    investments_by_user: sled::Tree,
    rewards: sled::Tree,
    rewards_by_user_day: sled::Tree,
    quotas: sled::Tree,
    withdrawals: sled::Tree,
    withdrawals_by_investment: sled::Tree,
    pending_withdrawals: sled::Tree,
    reservations: sled::Tree,
    referrals: sled::Tree,

    // Write locks, created on first touch and kept for the process
    // lifetime
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl SledStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let db = sled::open(path).map_err(LedgerError::storage)?;
        Self::with_db(db)
    }

    /// In-memory database for tests, dropped with the handle
    pub fn temporary() -> LedgerResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(LedgerError::storage)?;
        Self::with_db(db)
    }

    fn with_db(db: sled::Db) -> LedgerResult<Self> {
        if log::log_enabled!(log::Level::Debug) {
            for tree in Tree::iter() {
                let handle = db.open_tree(tree.as_ref()).map_err(LedgerError::storage)?;
                debug!("Tree {}: {} entries", tree, handle.len());
            }
        }

        let investments = Self::open_tree(&db, Tree::Investments)?;
        let investments_by_user = Self::open_tree(&db, Tree::InvestmentsByUser)?;
        let rewards = Self::open_tree(&db, Tree::Rewards)?;
        let rewards_by_user_day = Self::open_tree(&db, Tree::RewardsByUserDay)?;
        let quotas = Self::open_tree(&db, Tree::Quotas)?;
        let withdrawals = Self::open_tree(&db, Tree::Withdrawals)?;
        let withdrawals_by_investment = Self::open_tree(&db, Tree::WithdrawalsByInvestment)?;
        let pending_withdrawals = Self::open_tree(&db, Tree::PendingWithdrawals)?;
        let reservations = Self::open_tree(&db, Tree::Reservations)?;
        let referrals = Self::open_tree(&db, Tree::Referrals)?;

        Ok(Self {
            db,
            investments,
            investments_by_user,
            rewards,
            rewards_by_user_day,
            quotas,
            withdrawals,
            withdrawals_by_investment,
            pending_withdrawals,
            reservations,
            referrals,
            locks: DashMap::new(),
        })
    }

    fn open_tree(db: &sled::Db, tree: Tree) -> LedgerResult<sled::Tree> {
        db.open_tree(tree.as_ref()).map_err(LedgerError::storage)
    }

    /// Marker value for index trees, the key carries all the data
    fn empty_value() -> IVec {
        IVec::from(&[][..])
    }

    /// Take the write lock for one entity. The DashMap shard lock is
    /// dropped before awaiting, only the entity mutex is held across
    /// the await point.
    async fn guard(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let cell = self.locks.entry(key).or_default().value().clone();
        cell.lock_owned().await
    }

    async fn guard_investment(&self, id: &InvestmentId) -> OwnedMutexGuard<()> {
        self.guard(LockKey::Investment(*id)).await
    }

    // ===== Key layout =====

    fn id_key(id: &Id) -> &[u8] {
        id.as_bytes()
    }

    fn user_prefix(user: &UserId) -> Vec<u8> {
        let mut key = user.as_str().as_bytes().to_vec();
        key.push(KEY_SEPARATOR);
        key
    }

    fn user_day_key(user: &UserId, day: LedgerDay) -> Vec<u8> {
        let mut key = Self::user_prefix(user);
        key.extend_from_slice(&day.0.to_be_bytes());
        key
    }

    fn user_scoped_key(user: &UserId, suffix: &[u8]) -> Vec<u8> {
        let mut key = Self::user_prefix(user);
        key.extend_from_slice(suffix);
        key
    }

    fn reward_day_key(user: &UserId, day: LedgerDay, reward_id: &RewardId) -> Vec<u8> {
        let mut key = Self::user_day_key(user, day);
        key.extend_from_slice(reward_id.as_bytes());
        key
    }

    // ===== Serialization =====

    fn encode<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(LedgerError::storage)
    }

    fn decode<T: DeserializeOwned>(bytes: &IVec) -> LedgerResult<T> {
        serde_json::from_slice(bytes).map_err(LedgerError::storage)
    }

    fn load_optional<T: DeserializeOwned>(
        tree: &sled::Tree,
        key: &[u8],
    ) -> LedgerResult<Option<T>> {
        match tree.get(key).map_err(LedgerError::storage)? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // ===== Transaction plumbing =====

    fn tx_encode<T: Serialize>(
        value: &T,
    ) -> Result<Vec<u8>, ConflictableTransactionError<LedgerError>> {
        serde_json::to_vec(value)
            .map_err(|e| ConflictableTransactionError::Abort(LedgerError::storage(e)))
    }

    fn tx_decode<T: DeserializeOwned>(
        bytes: &IVec,
    ) -> Result<T, ConflictableTransactionError<LedgerError>> {
        serde_json::from_slice(bytes)
            .map_err(|e| ConflictableTransactionError::Abort(LedgerError::storage(e)))
    }

    fn tx_abort<T>(err: LedgerError) -> Result<T, ConflictableTransactionError<LedgerError>> {
        Err(ConflictableTransactionError::Abort(err))
    }

    fn unwrap_tx_error(err: TransactionError<LedgerError>) -> LedgerError {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => LedgerError::storage(e),
        }
    }
}

#[async_trait]
impl LedgerStorage for SledStorage {
    async fn flush(&self) -> LedgerResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(LedgerError::storage)
            .map(|_| ())
    }
}
