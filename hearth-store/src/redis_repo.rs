use chrono::Utc;
use redis::RedisResult;

/// Redis connection used for per-client request throttling.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Each window gets its own key so the count resets
    /// on the window boundary. Returns `false` once `limit` is exceeded.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let window = window_seconds.max(1);
        let bucket = format!("{}:{}", key, Utc::now().timestamp() / window);
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&bucket, 1)
            .expire(&bucket, window)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
