// src/market.rs
use crate::models::{Instrument, MarketRow, Quote};
use rand::Rng;

/// Largest price move per tick, as a fraction of 0.1% of the price.
pub const PRICE_STEP: f64 = 0.05;
pub const PRICE_SCALE: f64 = 0.001;
/// Largest 24h-change move per tick, in percentage points.
pub const CHANGE_STEP: f64 = 0.1;

pub fn seed_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("BTC", "Bitcoin", 45581.00, -1.02),
        Instrument::new("ETH", "Ethereum", 1767.81, 1.5),
        Instrument::new("SOL", "Solana", 581.85, 9.25),
        Instrument::new("BSD", "Main USD", 821.85, 1.50),
    ]
}

/// Nudges a price and its 24h change by small uniform random deltas.
pub fn nudge<R: Rng>(rng: &mut R, price: f64, change_24h: f64) -> (f64, f64) {
    let price_delta = rng.random_range(-PRICE_STEP..=PRICE_STEP) * (price * PRICE_SCALE);
    let change_delta = rng.random_range(-CHANGE_STEP..=CHANGE_STEP);
    (price + price_delta, change_24h + change_delta)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn quote(instrument: &Instrument) -> Quote {
    Quote {
        symbol: instrument.symbol.clone(),
        price: round2(instrument.price),
        change: round2(instrument.change_24h),
    }
}

pub fn market_row(instrument: &Instrument) -> MarketRow {
    MarketRow {
        symbol: instrument.symbol.clone(),
        name: instrument.name.clone(),
        price: round2(instrument.price),
        change: instrument.change_24h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        #[test]
        fn nudge_stays_within_step(seed in any::<u64>(), price in 0.01f64..1.0e7, change in -100.0f64..100.0) {
            let mut rng = StdRng::seed_from_u64(seed);
            let (new_price, new_change) = nudge(&mut rng, price, change);
            prop_assert!((new_price - price).abs() <= PRICE_STEP * price * PRICE_SCALE + 1e-9);
            prop_assert!((new_change - change).abs() <= CHANGE_STEP + 1e-12);
        }
    }

    #[test]
    fn btc_tick_reports_two_decimals_within_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let btc = &seed_instruments()[0];
        let (price, change) = nudge(&mut rng, btc.price, btc.change_24h);
        let q = quote(&Instrument { price, change_24h: change, ..btc.clone() });
        assert!(q.price >= 45558.4 && q.price <= 45603.6, "price {}", q.price);
        assert!(((q.price * 100.0).round() - q.price * 100.0).abs() < 1e-6);
        assert!(((q.change * 100.0).round() - q.change * 100.0).abs() < 1e-6);
    }

    #[test]
    fn stored_precision_is_not_rounded() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut price = 1767.81;
        for _ in 0..50 {
            price = nudge(&mut rng, price, 0.0).0;
        }
        assert_ne!(price, round2(price));
    }

    #[test]
    fn seed_symbols_are_unique() {
        let seeds = seed_instruments();
        let mut symbols: Vec<_> = seeds.iter().map(|i| i.symbol.as_str()).collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), seeds.len());
    }

    #[test]
    fn market_row_keeps_raw_change() {
        let row = market_row(&Instrument::new("X", "Xcoin", 1.23456, 0.123456));
        assert_eq!(row.price, 1.23);
        assert_eq!(row.change, 0.123456);
    }
}
