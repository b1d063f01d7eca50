//! Baseline calculator
//!
//! Turns a raw tick stream into regular right-closed, right-labelled bars,
//! forward-fills empty buckets, and samples a trailing simple moving average
//! of the bar closes at one anchor time of day.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, instrument};

use crate::common::errors::{ClientError, Result};
use crate::common::traits::Broker;
use crate::common::types::{RawTimestamp, Tick};
use crate::config::types::StrategyConfig;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

/// Widest tick series the resampler will forward-fill
const MAX_SERIES_SPAN_NS: i64 = 3 * NANOS_PER_DAY;

/// Text layouts that carry their own offset
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Text layouts without an offset; these are read as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// One resampled bar
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Right edge (and label) of the bucket, exchange local time
    pub end: DateTime<FixedOffset>,
    /// Last price at or before `end`
    pub close: Decimal,
}

/// Fixed-window simple moving average
#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<Decimal>,
    sum: Decimal,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sum: Decimal::ZERO,
        }
    }

    /// Push a value, returning the mean once the window is full
    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        self.sum += value;
        while self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
            }
        }

        if self.buf.len() == self.window {
            Some(self.sum / Decimal::from(self.window as u64))
        } else {
            None
        }
    }
}

/// Trailing moving average aligned with `bars`
pub fn moving_average(bars: &[Bar], window: usize) -> Vec<Option<Decimal>> {
    let mut sma = RollingSma::new(window);
    bars.iter().map(|bar| sma.update(bar.close)).collect()
}

/// Convert a raw tick timestamp into exchange local time
///
/// Returns `None` for timestamps that cannot be parsed. Text without an
/// offset is taken as UTC.
pub fn normalize_timestamp(raw: &RawTimestamp, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let utc = match raw {
        RawTimestamp::Nanos(nanos) => Utc.timestamp_nanos(*nanos),
        RawTimestamp::Text(text) => parse_text_timestamp(text)?,
        RawTimestamp::Other(_) => return None,
    };
    Some(utc.with_timezone(tz))
}

fn parse_text_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(nanos) = text.parse::<i64>() {
        return Some(Utc.timestamp_nanos(nanos));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Computes the moving-average baseline from ticks
#[derive(Debug, Clone)]
pub struct BaselineCalculator {
    window: usize,
    bar_width_ns: i64,
    tz: FixedOffset,
}

impl BaselineCalculator {
    pub fn new(window: usize, bar_minutes: u32, tz: FixedOffset) -> Self {
        Self {
            window,
            bar_width_ns: i64::from(bar_minutes) * 60 * NANOS_PER_SECOND,
            tz,
        }
    }

    pub fn from_config(strategy: &StrategyConfig) -> Result<Self> {
        Ok(Self::new(
            strategy.ma_window,
            strategy.bar_minutes,
            strategy.offset()?,
        ))
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    fn offset_ns(&self) -> i64 {
        i64::from(self.tz.local_minus_utc()) * NANOS_PER_SECOND
    }

    /// Right edge of the bucket containing a local timestamp
    fn bucket_label(&self, local_ns: i64) -> Option<i64> {
        let rem = local_ns.rem_euclid(self.bar_width_ns);
        if rem == 0 {
            Some(local_ns)
        } else {
            local_ns.checked_sub(rem)?.checked_add(self.bar_width_ns)
        }
    }

    fn label_time(&self, local_ns: i64) -> DateTime<FixedOffset> {
        self.tz.timestamp_nanos(local_ns.saturating_sub(self.offset_ns()))
    }

    /// Resample ticks into forward-filled bars
    ///
    /// Ticks with unparseable or out-of-range timestamps are dropped; input
    /// order does not matter. Ticks sharing a timestamp keep their input
    /// order, so the later one wins the bucket close. A series spanning more
    /// than three days is refused as `DataUnavailable`.
    pub fn resample(&self, ticks: &[Tick]) -> Result<Vec<Bar>> {
        let offset_ns = self.offset_ns();
        let mut stamped: Vec<(i64, Decimal)> = ticks
            .iter()
            .filter_map(|tick| {
                let ts = normalize_timestamp(&tick.timestamp, &self.tz)?;
                let local_ns = ts.timestamp_nanos_opt()?.checked_add(offset_ns)?;
                Some((self.bucket_label(local_ns)?, tick.price))
            })
            .collect();

        let dropped = ticks.len() - stamped.len();
        if dropped > 0 {
            debug!(dropped, total = ticks.len(), "discarded ticks with malformed timestamps");
        }

        stamped.sort_by_key(|(label, _)| *label);

        let mut closes: BTreeMap<i64, Decimal> = BTreeMap::new();
        for (label, price) in stamped {
            closes.insert(label, price);
        }

        let (first, last) = match (closes.keys().next(), closes.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(Vec::new()),
        };

        match last.checked_sub(first) {
            Some(span) if span <= MAX_SERIES_SPAN_NS => {}
            _ => {
                return Err(ClientError::DataUnavailable(format!(
                    "tick series spans {} to {}, more than {} days",
                    self.label_time(first).format("%Y-%m-%d"),
                    self.label_time(last).format("%Y-%m-%d"),
                    MAX_SERIES_SPAN_NS / NANOS_PER_DAY
                )))
            }
        }

        let capacity = ((last - first) / self.bar_width_ns + 1) as usize;
        let mut bars = Vec::with_capacity(capacity);
        let mut carried: Option<Decimal> = None;
        let mut label = Some(first);
        while let Some(current) = label.filter(|l| *l <= last) {
            if let Some(price) = closes.get(&current) {
                carried = Some(*price);
            }
            if let Some(close) = carried {
                bars.push(Bar {
                    end: self.label_time(current),
                    close,
                });
            }
            label = current.checked_add(self.bar_width_ns);
        }
        Ok(bars)
    }

    /// Drop ticks whose local date is not within a day of `date`
    pub fn retain_near(&self, ticks: Vec<Tick>, date: NaiveDate) -> Vec<Tick> {
        let total = ticks.len();
        let kept: Vec<Tick> = ticks
            .into_iter()
            .filter(|tick| {
                normalize_timestamp(&tick.timestamp, &self.tz)
                    .map(|ts| (ts.date_naive() - date).num_days().abs() <= 1)
                    .unwrap_or(false)
            })
            .collect();
        if kept.len() < total {
            debug!(dropped = total - kept.len(), %date, "discarded ticks outside the trading date");
        }
        kept
    }

    /// Moving average at the most recent bar labelled `anchor`, rounded to 2 dp
    pub fn compute(&self, ticks: &[Tick], anchor: NaiveTime) -> Result<Decimal> {
        let bars = self.resample(ticks)?;
        if bars.is_empty() {
            return Err(ClientError::DataUnavailable(
                "no ticks with valid timestamps".to_string(),
            ));
        }

        let averages = moving_average(&bars, self.window);
        let index = bars
            .iter()
            .rposition(|bar| bar.end.time() == anchor)
            .ok_or_else(|| {
                ClientError::DataUnavailable(format!("no bar labelled {}", anchor.format("%H:%M:%S")))
            })?;

        let mean = averages[index].ok_or_else(|| {
            ClientError::DataUnavailable(format!(
                "{} bars at {} but the average needs {}",
                index + 1,
                anchor.format("%H:%M:%S"),
                self.window
            ))
        })?;

        Ok(mean.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
    }

    /// Fetch today's ticks and compute the baseline
    ///
    /// Every failure along the way is reported as `DataUnavailable`.
    #[instrument(skip(self, broker), fields(anchor = %anchor))]
    pub async fn fetch_base_ma(
        &self,
        broker: &dyn Broker,
        contract: &str,
        date: NaiveDate,
        anchor: NaiveTime,
    ) -> Result<Decimal> {
        let ticks = broker.ticks(contract, date).await.map_err(|e| match e {
            ClientError::DataUnavailable(_) => e,
            other => ClientError::DataUnavailable(format!("tick fetch failed: {}", other)),
        })?;

        let ticks = self.retain_near(ticks, date);
        if ticks.is_empty() {
            return Err(ClientError::DataUnavailable(format!(
                "no ticks for {} on {}",
                contract, date
            )));
        }

        let baseline = self.compute(&ticks, anchor)?;
        debug!(contract, %baseline, ticks = ticks.len(), "baseline computed");
        Ok(baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBroker;
    use rust_decimal_macros::dec;

    fn taipei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn calculator() -> BaselineCalculator {
        BaselineCalculator::new(21, 5, taipei())
    }

    fn anchor() -> NaiveTime {
        NaiveTime::from_hms_opt(5, 0, 0).unwrap()
    }

    /// Tick at a Taipei local time on 2026-03-02, as an RFC 3339 string
    fn local_tick(h: u32, m: u32, s: u32, price: Decimal) -> Tick {
        Tick::new(
            RawTimestamp::Text(format!("2026-03-02T{:02}:{:02}:{:02}+08:00", h, m, s)),
            price,
        )
    }

    /// One tick exactly on each 5 minute mark from `start` (inclusive) to 05:00
    fn ticks_until_anchor(start_minute_of_day: u32, first_price: i64) -> Vec<Tick> {
        let end = 5 * 60;
        (start_minute_of_day..=end)
            .step_by(5)
            .enumerate()
            .map(|(i, minute)| local_tick(minute / 60, minute % 60, 0, Decimal::from(first_price + i as i64)))
            .collect()
    }

    #[test]
    fn test_baseline_is_mean_of_last_21_bars() {
        // 03:20 .. 05:00 is 21 bars priced 100..=120
        let ticks = ticks_until_anchor(3 * 60 + 20, 100);
        assert_eq!(ticks.len(), 21);
        assert_eq!(calculator().compute(&ticks, anchor()).unwrap(), dec!(110));
    }

    #[test]
    fn test_baseline_uses_only_trailing_window() {
        // 03:00 .. 05:00 is 25 bars priced 100..=124, window covers 104..=124
        let ticks = ticks_until_anchor(3 * 60, 100);
        assert_eq!(calculator().compute(&ticks, anchor()).unwrap(), dec!(114));
    }

    #[test]
    fn test_fewer_than_window_bars_is_unavailable() {
        let ticks = ticks_until_anchor(3 * 60 + 25, 100);
        assert_eq!(ticks.len(), 20);
        let result = calculator().compute(&ticks, anchor());
        assert!(matches!(result, Err(ClientError::DataUnavailable(_))));
    }

    #[test]
    fn test_missing_anchor_bar_is_unavailable() {
        let ticks = ticks_until_anchor(3 * 60 + 20, 100);
        let other_anchor = NaiveTime::from_hms_opt(13, 45, 0).unwrap();
        assert!(calculator().compute(&ticks, other_anchor).is_err());
    }

    #[test]
    fn test_empty_ticks_are_unavailable() {
        assert!(matches!(
            calculator().compute(&[], anchor()),
            Err(ClientError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_result_is_rounded_to_two_decimals() {
        let mut ticks: Vec<Tick> = ticks_until_anchor(3 * 60 + 20, 0)
            .into_iter()
            .map(|t| Tick::new(t.timestamp, dec!(100)))
            .collect();
        ticks[0].price = dec!(101);
        // 2101 / 21 = 100.047619...
        assert_eq!(calculator().compute(&ticks, anchor()).unwrap(), dec!(100.05));
    }

    #[test]
    fn test_malformed_timestamps_are_dropped() {
        let clean = ticks_until_anchor(3 * 60 + 20, 100);
        let mut noisy = clean.clone();
        noisy.insert(3, Tick::new(RawTimestamp::Text("not a time".into()), dec!(99999)));
        noisy.push(Tick::new(RawTimestamp::Other(serde_json::Value::Null), dec!(1)));

        let calc = calculator();
        assert_eq!(calc.resample(&noisy).unwrap(), calc.resample(&clean).unwrap());
        assert_eq!(calc.compute(&noisy, anchor()).unwrap(), dec!(110));
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let ticks = ticks_until_anchor(3 * 60 + 20, 100);
        let mut shuffled = ticks.clone();
        shuffled.reverse();
        shuffled.swap(2, 17);
        assert_eq!(
            calculator().compute(&shuffled, anchor()).unwrap(),
            calculator().compute(&ticks, anchor()).unwrap()
        );
    }

    #[test]
    fn test_forward_fill_reproduces_prior_close() {
        let ticks = vec![
            local_tick(4, 50, 0, dec!(200)),
            local_tick(5, 5, 0, dec!(210)),
        ];
        let bars = calculator().resample(&ticks).unwrap();
        let labels: Vec<String> = bars.iter().map(|b| b.end.format("%H:%M:%S").to_string()).collect();
        assert_eq!(labels, vec!["04:50:00", "04:55:00", "05:00:00", "05:05:00"]);
        assert_eq!(bars[1].close, dec!(200));
        assert_eq!(bars[2].close, dec!(200));
        assert_eq!(bars[3].close, dec!(210));
    }

    #[test]
    fn test_buckets_are_right_closed() {
        let ticks = vec![
            local_tick(4, 56, 0, dec!(1)),
            local_tick(4, 59, 59, dec!(2)),
            local_tick(5, 0, 0, dec!(3)),
            local_tick(5, 0, 1, dec!(4)),
        ];
        let bars = calculator().resample(&ticks).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].end.format("%H:%M:%S").to_string(), "05:00:00");
        assert_eq!(bars[0].close, dec!(3));
        assert_eq!(bars[1].end.format("%H:%M:%S").to_string(), "05:05:00");
        assert_eq!(bars[1].close, dec!(4));
    }

    #[test]
    fn test_bars_are_evenly_spaced() {
        let ticks = vec![
            local_tick(1, 2, 3, dec!(10)),
            local_tick(2, 44, 0, dec!(11)),
        ];
        let bars = calculator().resample(&ticks).unwrap();
        for pair in bars.windows(2) {
            assert_eq!((pair[1].end - pair[0].end).num_minutes(), 5);
        }
    }

    #[test]
    fn test_naive_timestamps_are_read_as_utc() {
        let ts = normalize_timestamp(&RawTimestamp::Text("2026-03-01 21:00:00".into()), &taipei())
            .unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2026-03-02 05:00:00");

        let with_fraction =
            normalize_timestamp(&RawTimestamp::Text("2026-03-01 21:00:00.250".into()), &taipei());
        assert!(with_fraction.is_some());
    }

    #[test]
    fn test_epoch_nanos_timestamps() {
        // 2026-03-01T21:00:00Z
        let nanos = 1_772_398_800_i64 * NANOS_PER_SECOND;
        let ts = normalize_timestamp(&RawTimestamp::Nanos(nanos), &taipei()).unwrap();
        assert_eq!(ts.format("%H:%M:%S").to_string(), "05:00:00");

        let as_text = normalize_timestamp(&RawTimestamp::Text(nanos.to_string()), &taipei()).unwrap();
        assert_eq!(as_text, ts);
    }

    #[test]
    fn test_timestamp_at_the_end_of_time_is_dropped() {
        let mut ticks = ticks_until_anchor(3 * 60 + 20, 100);
        ticks.push(Tick::new(RawTimestamp::Text("2262-04-11 23:00:00".into()), dec!(1)));
        assert_eq!(calculator().compute(&ticks, anchor()).unwrap(), dec!(110));
    }

    #[test]
    fn test_distant_outlier_is_refused_without_filling() {
        let mut ticks = ticks_until_anchor(3 * 60 + 20, 100);
        ticks.push(Tick::new(RawTimestamp::Text("1900-01-01 00:00:00".into()), dec!(1)));

        let started = std::time::Instant::now();
        let result = calculator().resample(&ticks);
        assert!(matches!(result, Err(ClientError::DataUnavailable(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_retain_near_keeps_adjacent_days() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let ticks = vec![
            Tick::new(RawTimestamp::Text("2026-03-01T13:45:00+08:00".into()), dec!(1)),
            Tick::new(RawTimestamp::Text("2026-03-02T05:00:00+08:00".into()), dec!(2)),
            Tick::new(RawTimestamp::Text("1900-01-01 00:00:00".into()), dec!(3)),
            Tick::new(RawTimestamp::Text("garbage".into()), dec!(4)),
        ];
        let kept = calculator().retain_near(ticks, date);
        let prices: Vec<Decimal> = kept.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![dec!(1), dec!(2)]);
    }

    #[tokio::test]
    async fn test_fetch_ignores_distant_outliers() {
        let mut broker = MockBroker::new();
        broker.expect_ticks().returning(|_, _| {
            let mut ticks = ticks_until_anchor(3 * 60 + 20, 100);
            ticks.insert(0, Tick::new(RawTimestamp::Text("1900-01-01 00:00:00".into()), dec!(1)));
            ticks.push(Tick::new(RawTimestamp::Text("2262-04-11 23:00:00".into()), dec!(1)));
            Ok(ticks)
        });

        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let baseline = calculator()
            .fetch_base_ma(&broker, "MXF202603", date, anchor())
            .await
            .unwrap();
        assert_eq!(baseline, dec!(110));
    }

    #[test]
    fn test_rolling_sma_window() {
        let mut sma = RollingSma::new(3);
        assert_eq!(sma.update(dec!(1)), None);
        assert_eq!(sma.update(dec!(2)), None);
        assert_eq!(sma.update(dec!(3)), Some(dec!(2)));
        assert_eq!(sma.update(dec!(6)), Some(dec!(11) / dec!(3)));
    }

    #[tokio::test]
    async fn test_fetch_failure_maps_to_unavailable() {
        let mut broker = MockBroker::new();
        broker
            .expect_ticks()
            .returning(|_, _| Err(ClientError::InvalidResponse("502".into())));

        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let result = calculator()
            .fetch_base_ma(&broker, "MXF202603", date, anchor())
            .await;
        assert!(result.unwrap_err().is_data_unavailable());
    }

    #[tokio::test]
    async fn test_fetch_computes_from_ticks() {
        let mut broker = MockBroker::new();
        broker
            .expect_ticks()
            .withf(|contract, _| contract == "MXF202603")
            .returning(|_, _| Ok(ticks_until_anchor(3 * 60 + 20, 100)));

        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let baseline = calculator()
            .fetch_base_ma(&broker, "MXF202603", date, anchor())
            .await
            .unwrap();
        assert_eq!(baseline, dec!(110));
    }
}
