//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use mxf_breakout::config::types::ApiCredentials;
use mxf_breakout::BrokerRestClient;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CONTRACT: &str = "MXF202603";
pub const TOKEN: &str = "session-token";
pub const ACCOUNT: &str = "F000123";
pub const API_KEY: &str = "test-api-key";
/// base64 of "secret"
pub const SECRET_KEY: &str = "c2VjcmV0";

/// Trading date used across fixtures
pub static TRADE_DATE: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"));

/// 21 five-minute ticks at 20000 ending on the 05:00 day anchor
pub static FLAT_DAY_TICKS: Lazy<Value> = Lazy::new(|| {
    ticks_payload(*TRADE_DATE, NaiveTime::from_hms_opt(5, 0, 0).expect("valid time"), 21, 20000)
});

/// Columnar ticks payload, timestamps in +08:00 text form
pub fn ticks_payload(date: NaiveDate, end: NaiveTime, count: usize, price: i64) -> Value {
    let last = NaiveDateTime::new(date, end);
    let ts: Vec<String> = (0..count)
        .rev()
        .map(|i| {
            let at = last - Duration::minutes(5 * i as i64);
            format!("{}+08:00", at.format("%Y-%m-%dT%H:%M:%S"))
        })
        .collect();
    json!({ "ts": ts, "close": vec![price; count] })
}

pub fn snapshot_payload(price: i64) -> Value {
    json!([{ "code": CONTRACT, "close": price, "ts": 1_772_416_800_000_000_000i64 }])
}

/// Mount a login endpoint that accepts the test credentials
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": TOKEN, "account_id": ACCOUNT })),
        )
        .mount(server)
        .await;
}

/// A client pointed at the mock gateway and logged in
pub async fn logged_in_client(server: &MockServer) -> BrokerRestClient {
    mount_login(server).await;
    let client = BrokerRestClient::new(&server.uri())
        .expect("Failed to create broker client")
        .with_credentials(ApiCredentials::new(API_KEY.to_string(), SECRET_KEY.to_string()));
    client.login().await.expect("login against mock gateway");
    client
}
