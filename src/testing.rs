//! Mock collaborators shared by unit tests

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use mockall::mock;

use crate::common::errors::Result;
use crate::common::traits::{Broker, Notifier};
use crate::common::types::{OrderAck, OrderRequest, Quote, RawTimestamp, Tick};
use rust_decimal::Decimal;

mock! {
    pub Broker {}

    #[async_trait]
    impl Broker for Broker {
        async fn ticks(&self, contract: &str, date: NaiveDate) -> Result<Vec<Tick>>;
        async fn snapshot(&self, contract: &str) -> Result<Quote>;
        async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck>;
    }
}

mock! {
    pub Notifier {}

    #[async_trait]
    impl Notifier for Notifier {
        async fn push(&self, text: &str) -> Result<()>;
        fn is_enabled(&self) -> bool;
    }
}

/// `count` ticks five minutes apart at one price, the last at `end` (+08:00)
pub fn local_ticks_until(date: NaiveDate, end: NaiveTime, count: usize, price: Decimal) -> Vec<Tick> {
    let last = date.and_time(end);
    (0..count)
        .rev()
        .map(|i| {
            let at = last - Duration::minutes(5 * i as i64);
            let stamp = format!("{}+08:00", at.format("%Y-%m-%dT%H:%M:%S"));
            Tick::new(RawTimestamp::Text(stamp), price)
        })
        .collect()
}
