//! Baseline cache keyed by contract, trading date and session

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaselineKey {
    pub contract: String,
    pub date: NaiveDate,
    pub session: String,
}

impl BaselineKey {
    pub fn new(contract: &str, date: NaiveDate, session: &str) -> Self {
        Self {
            contract: contract.to_string(),
            date,
            session: session.to_string(),
        }
    }
}

/// Holds baselines that have been computed successfully
///
/// A baseline sampled at a past anchor never changes for the rest of the
/// session, so only available values are stored. Entries from earlier dates
/// are dropped on insert.
#[derive(Debug, Default)]
pub struct BaselineCache {
    entries: RwLock<HashMap<BaselineKey, Decimal>>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &BaselineKey) -> Option<Decimal> {
        self.entries.read().await.get(key).copied()
    }

    pub async fn insert(&self, key: BaselineKey, value: Decimal) {
        let mut entries = self.entries.write().await;
        entries.retain(|k, _| k.date >= key.date);
        entries.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[tokio::test]
    async fn test_keys_include_session() {
        let cache = BaselineCache::new();
        cache.insert(BaselineKey::new("MXF202603", date(2), "day"), dec!(20000)).await;

        assert_eq!(cache.get(&BaselineKey::new("MXF202603", date(2), "day")).await, Some(dec!(20000)));
        assert_eq!(cache.get(&BaselineKey::new("MXF202603", date(2), "night")).await, None);
        assert_eq!(cache.get(&BaselineKey::new("MXF202604", date(2), "day")).await, None);
    }

    #[tokio::test]
    async fn test_older_dates_are_evicted() {
        let cache = BaselineCache::new();
        cache.insert(BaselineKey::new("MXF202603", date(2), "day"), dec!(1)).await;
        cache.insert(BaselineKey::new("MXF202603", date(3), "day"), dec!(2)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&BaselineKey::new("MXF202603", date(2), "day")).await, None);
    }
}
