//! Chat notifications

pub mod line;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::errors::Result;
use crate::common::traits::Notifier;
use crate::config::types::NotifyConfig;

pub use line::LinePushNotifier;

/// Notifier used when no credentials are configured
#[derive(Debug, Clone, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn push(&self, text: &str) -> Result<()> {
        debug!(message = text, "notifications disabled, message dropped");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Pick the notifier for a configuration
pub fn from_config(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    Ok(match LinePushNotifier::from_config(config)? {
        Some(notifier) => Arc::new(notifier),
        None => {
            info!("Notification credentials not set, notifications disabled");
            Arc::new(DisabledNotifier)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_notifier_swallows() {
        let notifier = from_config(&NotifyConfig::default()).unwrap();
        assert!(!notifier.is_enabled());
        tokio_test::assert_ok!(notifier.push("hello").await);
    }
}
