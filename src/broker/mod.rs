//! Brokerage gateway client

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::BrokerRestClient;
