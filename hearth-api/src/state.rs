use hearth_core::{EventBus, HotelStore, Services};
use hearth_store::app_config::RateLimitConfig;
use hearth_store::RedisClient;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::ApiMetrics;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub store: Arc<dyn HotelStore>,
    pub events: EventBus,
    /// Rate limiting is skipped when no Redis is configured.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub metrics: Arc<ApiMetrics>,
    pub payment_gateway: &'static str,
    pub request_timeout: Duration,
}
