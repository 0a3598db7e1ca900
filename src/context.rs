// src/context.rs
use crate::auth::{hash_password, SessionManager};
use crate::config::{Config, StoreBackend};
use crate::db::{AccountStore, CqlStore, MarketStore, MemoryAccountStore, MemoryMarketStore};
use crate::error::StoreError;
use crate::market::seed_instruments;
use crate::models::{Account, AccountId};
use crate::ticker::{MarketFeed, Ticker};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEMO_EMAIL: &str = "demo@cryptodash.local";
const DEMO_PASSWORD: &str = "password";

/// Everything a handler or the ticker needs, built once in `main`.
#[derive(Clone)]
pub struct AppContext {
    pub market: Arc<dyn MarketStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<SessionManager>,
    pub feed: MarketFeed,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let market: Arc<dyn MarketStore>;
        let accounts: Arc<dyn AccountStore>;
        match config.store {
            StoreBackend::Memory => {
                market = Arc::new(MemoryMarketStore::new());
                accounts = Arc::new(MemoryAccountStore::new());
            }
            StoreBackend::Scylla => {
                let store = Arc::new(CqlStore::connect(&config.scylla_node, &config.keyspace).await?);
                market = store.clone();
                accounts = store;
            }
        }
        Ok(AppContext {
            market,
            accounts,
            sessions: Arc::new(SessionManager::new(
                &config.session_secret,
                config.session_ttl(),
            )),
            feed: MarketFeed::new(config.feed_capacity),
            shutdown: CancellationToken::new(),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        AppContext {
            market: Arc::new(MemoryMarketStore::new()),
            accounts: Arc::new(MemoryAccountStore::new()),
            sessions: Arc::new(SessionManager::new("test-secret", Duration::from_secs(3600))),
            feed: MarketFeed::new(16),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn ticker(&self, interval: Duration) -> Ticker {
        Ticker::new(self.market.clone(), self.feed.clone(), interval)
    }

    pub async fn seed(&self, demo_account: bool) -> Result<(), StoreError> {
        if self.market.seed_if_empty(&seed_instruments()).await? {
            info!("Market seeded.");
        }
        if demo_account {
            self.seed_demo_account().await?;
        }
        Ok(())
    }

    async fn seed_demo_account(&self) -> Result<(), StoreError> {
        if self.accounts.find_by_email(DEMO_EMAIL).await?.is_some() {
            return Ok(());
        }
        let password_hash = match hash_password(DEMO_PASSWORD) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Skipping demo account: {}", e);
                return Ok(());
            }
        };
        let demo = Account {
            id: AccountId::generate(),
            email: DEMO_EMAIL.to_string(),
            password_hash,
            full_name: "Demo Trader".to_string(),
            phone: "+91 98765 43210".to_string(),
            country: "India".to_string(),
            joined_date: crate::auth::today(),
        };
        match self.accounts.insert_account(demo).await {
            Ok(()) => info!("Demo account {} created.", DEMO_EMAIL),
            Err(StoreError::DuplicateEmail) => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
