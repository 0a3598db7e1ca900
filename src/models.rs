// src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// One tradable symbol's price record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_24h: f64,
}

impl Instrument {
    pub fn new(symbol: &str, name: &str, price: f64, change_24h: f64) -> Self {
        Instrument {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            change_24h,
        }
    }
}

/// Price line pushed to stream subscribers, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
}

/// Payload of a single stream event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMessage {
    pub coins: Vec<Quote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRow {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialData {
    pub market: Vec<MarketRow>,
    pub chart: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn generate() -> Self {
        AccountId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: String,
    pub country: String,
    pub joined_date: String,
}

/// Public view of an account, as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub country: String,
    pub joined: String,
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Profile {
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            phone: account.phone.clone(),
            country: account.country.clone(),
            joined: account.joined_date.clone(),
        }
    }
}

/// Partial profile update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
}

impl ProfileUpdate {
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(full_name) = &self.full_name {
            account.full_name = full_name.clone();
        }
        if let Some(phone) = &self.phone {
            account.phone = phone.clone();
        }
        if let Some(country) = &self.country {
            account.country = country.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stacked {
    pub labels: Vec<String>,
    pub buy: Vec<u32>,
    pub sell: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    pub histogram: Series,
    pub stacked: Stacked,
    pub portfolio: Series,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: AccountId("a-1".to_string()),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Ada".to_string(),
            phone: "".to_string(),
            country: "UK".to_string(),
            joined_date: "2024-01-02".to_string(),
        }
    }

    #[test]
    fn profile_update_keeps_absent_fields() {
        let mut acc = account();
        ProfileUpdate {
            phone: Some("+44 1".to_string()),
            ..Default::default()
        }
        .apply_to(&mut acc);
        assert_eq!(acc.phone, "+44 1");
        assert_eq!(acc.full_name, "Ada");
        assert_eq!(acc.country, "UK");
    }

    #[test]
    fn profile_serializes_join_date_as_joined() {
        let json = serde_json::to_value(Profile::from(&account())).unwrap();
        assert_eq!(json["joined"], "2024-01-02");
        assert!(json.get("password_hash").is_none());
    }
}
