// src/db/mod.rs
use crate::error::StoreError;
use crate::models::{Account, AccountId, Instrument, ProfileUpdate};
use async_trait::async_trait;

pub mod cql;
pub mod memory;

pub use cql::CqlStore;
pub use memory::{MemoryAccountStore, MemoryMarketStore};

#[async_trait]
pub trait MarketStore: Send + Sync {
    /// All instruments, in seed order.
    async fn list_instruments(&self) -> Result<Vec<Instrument>, StoreError>;

    async fn update_instrument(
        &self,
        symbol: &str,
        price: f64,
        change_24h: f64,
    ) -> Result<(), StoreError>;

    /// Writes `initial` only when the store holds no instrument yet.
    /// Returns whether anything was written.
    async fn seed_if_empty(&self, initial: &[Instrument]) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `DuplicateEmail` when the address is taken.
    async fn insert_account(&self, account: Account) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account, StoreError>;
}
