// src/db/cql.rs
use super::{AccountStore, MarketStore};
use crate::error::StoreError;
use crate::models::{Account, AccountId, Instrument, ProfileUpdate};
use async_trait::async_trait;
use log::{error, info};
use scylla::frame::response::result::{CqlValue, Row};
use scylla::{Session, SessionBuilder};

/// ScyllaDB-backed market and account tables.
pub struct CqlStore {
    session: Session,
    keyspace: String,
}

impl CqlStore {
    pub async fn connect(node: &str, keyspace: &str) -> Result<Self, StoreError> {
        let session = SessionBuilder::new()
            .known_node(node)
            .build()
            .await
            .map_err(StoreError::backend)?;

        // Create keyspace and tables if they don't exist
        session
            .query(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(StoreError::backend)?;
        session
            .query(
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.coins (symbol TEXT PRIMARY KEY, name TEXT, price DOUBLE, change_24h DOUBLE, position INT)",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(StoreError::backend)?;
        session
            .query(
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.accounts (id TEXT PRIMARY KEY, email TEXT, password_hash TEXT, full_name TEXT, phone TEXT, country TEXT, joined_date TEXT)",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(StoreError::backend)?;
        session
            .query(
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.accounts_by_email (email TEXT PRIMARY KEY, id TEXT)",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(StoreError::backend)?;

        info!("Successfully connected to ScyllaDB at {}.", node);
        Ok(CqlStore {
            session,
            keyspace: keyspace.to_string(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.keyspace, name)
    }

    async fn load_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let cql = format!(
            "SELECT id, email, password_hash, full_name, phone, country, joined_date FROM {} WHERE id = ?",
            self.table("accounts")
        );
        let result = self
            .session
            .query(cql, (id,))
            .await
            .map_err(StoreError::backend)?;
        match rows(result.rows).first() {
            Some(row) => Ok(Some(account_from_row(row)?)),
            None => Ok(None),
        }
    }
}

fn rows(rows: Option<Vec<Row>>) -> Vec<Row> {
    rows.unwrap_or_default()
}

fn column(row: &Row, idx: usize) -> Option<&CqlValue> {
    row.columns.get(idx).and_then(|c| c.as_ref())
}

fn text(row: &Row, idx: usize) -> Result<String, StoreError> {
    column(row, idx)
        .and_then(|v| v.as_text())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::Corrupt(format!("column {} is not text", idx)))
}

fn double(row: &Row, idx: usize) -> Result<f64, StoreError> {
    column(row, idx)
        .and_then(|v| v.as_double())
        .ok_or_else(|| StoreError::Corrupt(format!("column {} is not a double", idx)))
}

/// Reads the `[applied]` flag of a lightweight transaction.
fn applied(rows: &[Row]) -> bool {
    matches!(
        rows.first().and_then(|row| column(row, 0)),
        Some(CqlValue::Boolean(true))
    )
}

fn account_from_row(row: &Row) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId(text(row, 0)?),
        email: text(row, 1)?,
        password_hash: text(row, 2)?,
        full_name: text(row, 3)?,
        phone: text(row, 4)?,
        country: text(row, 5)?,
        joined_date: text(row, 6)?,
    })
}

#[async_trait]
impl MarketStore for CqlStore {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        let cql = format!(
            "SELECT symbol, name, price, change_24h, position FROM {}",
            self.table("coins")
        );
        let result = self
            .session
            .query(cql, &[])
            .await
            .map_err(StoreError::backend)?;

        let mut ranked = Vec::new();
        for row in rows(result.rows) {
            let position = column(&row, 4).and_then(|v| v.as_int()).unwrap_or(i32::MAX);
            let instrument = Instrument {
                symbol: text(&row, 0)?,
                name: text(&row, 1)?,
                price: double(&row, 2)?,
                change_24h: double(&row, 3)?,
            };
            ranked.push((position, instrument));
        }
        ranked.sort_by_key(|(position, _)| *position);
        Ok(ranked.into_iter().map(|(_, i)| i).collect())
    }

    async fn update_instrument(
        &self,
        symbol: &str,
        price: f64,
        change_24h: f64,
    ) -> Result<(), StoreError> {
        let cql = format!(
            "UPDATE {} SET price = ?, change_24h = ? WHERE symbol = ? IF EXISTS",
            self.table("coins")
        );
        let result = self
            .session
            .query(cql, (price, change_24h, symbol))
            .await
            .map_err(StoreError::backend)?;
        if applied(&rows(result.rows)) {
            Ok(())
        } else {
            Err(StoreError::UnknownInstrument(symbol.to_string()))
        }
    }

    async fn seed_if_empty(&self, initial: &[Instrument]) -> Result<bool, StoreError> {
        let existing = format!("SELECT symbol FROM {} LIMIT 1", self.table("coins"));
        let result = self
            .session
            .query(existing, &[])
            .await
            .map_err(StoreError::backend)?;
        if !rows(result.rows).is_empty() {
            return Ok(false);
        }

        let cql = format!(
            "INSERT INTO {} (symbol, name, price, change_24h, position) VALUES (?, ?, ?, ?, ?) IF NOT EXISTS",
            self.table("coins")
        );
        for (position, instrument) in initial.iter().enumerate() {
            self.session
                .query(
                    cql.clone(),
                    (
                        instrument.symbol.as_str(),
                        instrument.name.as_str(),
                        instrument.price,
                        instrument.change_24h,
                        position as i32,
                    ),
                )
                .await
                .map_err(StoreError::backend)?;
        }
        Ok(true)
    }
}

#[async_trait]
impl AccountStore for CqlStore {
    async fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        let claim = format!(
            "INSERT INTO {} (email, id) VALUES (?, ?) IF NOT EXISTS",
            self.table("accounts_by_email")
        );
        let result = self
            .session
            .query(claim, (account.email.as_str(), account.id.as_str()))
            .await
            .map_err(StoreError::backend)?;
        if !applied(&rows(result.rows)) {
            return Err(StoreError::DuplicateEmail);
        }

        let cql = format!(
            "INSERT INTO {} (id, email, password_hash, full_name, phone, country, joined_date) VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.table("accounts")
        );
        let inserted = self
            .session
            .query(
                cql,
                (
                    account.id.as_str(),
                    account.email.as_str(),
                    account.password_hash.as_str(),
                    account.full_name.as_str(),
                    account.phone.as_str(),
                    account.country.as_str(),
                    account.joined_date.as_str(),
                ),
            )
            .await;
        if let Err(e) = inserted {
            error!("Failed to store account {}: {}", account.id, e);
            let release = format!("DELETE FROM {} WHERE email = ?", self.table("accounts_by_email"));
            if let Err(e) = self.session.query(release, (account.email.as_str(),)).await {
                error!("Failed to release email claim for {}: {}", account.id, e);
            }
            return Err(StoreError::backend(e));
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let cql = format!("SELECT id FROM {} WHERE email = ?", self.table("accounts_by_email"));
        let result = self
            .session
            .query(cql, (email,))
            .await
            .map_err(StoreError::backend)?;
        match rows(result.rows).first() {
            Some(row) => {
                let id = text(row, 0)?;
                self.load_account(&id).await
            }
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.load_account(id.as_str()).await
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account, StoreError> {
        let mut account = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::UnknownAccount(id.to_string()))?;
        update.apply_to(&mut account);

        let cql = format!(
            "UPDATE {} SET full_name = ?, phone = ?, country = ? WHERE id = ?",
            self.table("accounts")
        );
        self.session
            .query(
                cql,
                (
                    account.full_name.as_str(),
                    account.phone.as_str(),
                    account.country.as_str(),
                    account.id.as_str(),
                ),
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(account)
    }
}
