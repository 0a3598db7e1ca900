// src/db/memory.rs
use super::{AccountStore, MarketStore};
use crate::error::StoreError;
use crate::models::{Account, AccountId, Instrument, ProfileUpdate};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryMarketStore {
    rows: RwLock<Vec<Instrument>>,
}

impl MemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for MemoryMarketStore {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        Ok(self.rows.read().clone())
    }

    async fn update_instrument(
        &self,
        symbol: &str,
        price: f64,
        change_24h: f64,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        let row = rows
            .iter_mut()
            .find(|i| i.symbol == symbol)
            .ok_or_else(|| StoreError::UnknownInstrument(symbol.to_string()))?;
        row.price = price;
        row.change_24h = change_24h;
        Ok(())
    }

    async fn seed_if_empty(&self, initial: &[Instrument]) -> Result<bool, StoreError> {
        let mut rows = self.rows.write();
        if !rows.is_empty() {
            return Ok(false);
        }
        for instrument in initial {
            if !rows.iter().any(|i| i.symbol == instrument.symbol) {
                rows.push(instrument.clone());
            }
        }
        Ok(true)
    }
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<AccountId, Account>,
    by_email: HashMap<String, AccountId>,
}

#[derive(Default)]
pub struct MemoryAccountStore {
    inner: Mutex<Accounts>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.by_email.contains_key(&account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner
            .by_email
            .insert(account.email.clone(), account.id.clone());
        inner.by_id.insert(account.id.clone(), account);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.lock().by_id.get(id).cloned())
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account, StoreError> {
        let mut inner = self.inner.lock();
        let account = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownAccount(id.to_string()))?;
        update.apply_to(account);
        Ok(account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::seed_instruments;

    fn account(id: &str, email: &str) -> Account {
        Account {
            id: AccountId(id.to_string()),
            email: email.to_string(),
            password_hash: "x".to_string(),
            full_name: "Trader".to_string(),
            phone: String::new(),
            country: String::new(),
            joined_date: "2024-05-01".to_string(),
        }
    }

    #[tokio::test]
    async fn seed_if_empty_is_idempotent() {
        let store = MemoryMarketStore::new();
        let seeds = seed_instruments();
        assert!(store.seed_if_empty(&seeds).await.unwrap());
        assert!(!store.seed_if_empty(&seeds).await.unwrap());
        assert_eq!(store.list_instruments().await.unwrap().len(), seeds.len());
    }

    #[tokio::test]
    async fn list_preserves_seed_order() {
        let store = MemoryMarketStore::new();
        store.seed_if_empty(&seed_instruments()).await.unwrap();
        let symbols: Vec<_> = store
            .list_instruments()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.symbol)
            .collect();
        assert_eq!(symbols, ["BTC", "ETH", "SOL", "BSD"]);
    }

    #[tokio::test]
    async fn update_unknown_symbol_fails() {
        let store = MemoryMarketStore::new();
        store.seed_if_empty(&seed_instruments()).await.unwrap();
        let err = store.update_instrument("DOGE", 1.0, 0.0).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownInstrument(s) if s == "DOGE"));
    }

    #[tokio::test]
    async fn update_overwrites_price_and_change() {
        let store = MemoryMarketStore::new();
        store.seed_if_empty(&seed_instruments()).await.unwrap();
        store.update_instrument("SOL", 600.125, -3.5).await.unwrap();
        let sol = store
            .list_instruments()
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.symbol == "SOL")
            .unwrap();
        assert_eq!(sol.price, 600.125);
        assert_eq!(sol.change_24h, -3.5);
        assert_eq!(sol.name, "Solana");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryAccountStore::new();
        store.insert_account(account("1", "a@x.io")).await.unwrap();
        let err = store
            .insert_account(account("2", "a@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert!(store
            .find_by_id(&AccountId("2".to_string()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_profile_of_missing_account_fails() {
        let store = MemoryAccountStore::new();
        let err = store
            .update_profile(&AccountId("nope".to_string()), &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownAccount(_)));
    }
}
