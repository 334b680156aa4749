//! Redis-backed persistence of filter snapshots and navigation contexts

use async_trait::async_trait;
use chrono::NaiveDate;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use crate::{
    config::PersistenceConfig,
    error::{AppError, AppResult},
    models::{FilterState, NavigationContext},
};

use super::persistence::{decode_snapshot, PersistenceAdapter};

#[derive(Clone)]
pub struct RedisPersistence {
    conn: ConnectionManager,
    key_prefix: String,
    navigation_ttl_seconds: u64,
}

impl RedisPersistence {
    /// Connect to Redis and check the connection
    pub async fn new(url: &str, config: &PersistenceConfig) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Persistence(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Persistence(format!("Redis connection test failed: {}", e)))?;

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            navigation_ttl_seconds: config.navigation_ttl_seconds,
        })
    }

    fn snapshot_key(&self, session: &str) -> String {
        format!("{}:filters:{}", self.key_prefix, session)
    }

    fn navigation_keys(&self, session: &str) -> (String, String) {
        (
            format!("{}:nav:{}:selectedDate", self.key_prefix, session),
            format!("{}:nav:{}:employeeName", self.key_prefix, session),
        )
    }
}

#[async_trait]
impl PersistenceAdapter for RedisPersistence {
    async fn restore(&self, session: &str) -> Option<FilterState> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(self.snapshot_key(session)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to read filter snapshot for {}: {}", session, e);
                return None;
            }
        };
        decode_snapshot(session, &raw?)
    }

    async fn persist(&self, session: &str, state: &FilterState) -> AppResult<()> {
        let raw = serde_json::to_string(state)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.snapshot_key(session), raw).await?;
        tracing::debug!("Persisted filter snapshot for {}", session);
        Ok(())
    }

    async fn put_navigation_context(
        &self,
        session: &str,
        context: &NavigationContext,
    ) -> AppResult<()> {
        let (date_key, employee_key) = self.navigation_keys(session);
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .set_ex(
                &date_key,
                context.selected_date.format("%Y-%m-%d").to_string(),
                self.navigation_ttl_seconds,
            )
            .ignore()
            .set_ex(
                &employee_key,
                &context.employee_name,
                self.navigation_ttl_seconds,
            )
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn take_navigation_context(&self, session: &str) -> AppResult<Option<NavigationContext>> {
        let (date_key, employee_key) = self.navigation_keys(session);
        let mut conn = self.conn.clone();
        let (date, employee_name): (Option<String>, Option<String>) = redis::pipe()
            .atomic()
            .get(&date_key)
            .get(&employee_key)
            .del(vec![date_key.clone(), employee_key.clone()])
            .ignore()
            .query_async(&mut conn)
            .await?;

        let Some(date) = date else {
            return Ok(None);
        };
        match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(selected_date) => Ok(Some(NavigationContext {
                selected_date,
                employee_name: employee_name.unwrap_or_default(),
            })),
            Err(e) => {
                tracing::warn!("Ignoring malformed navigation date {:?}: {}", date, e);
                Ok(None)
            }
        }
    }

    async fn clear_navigation_context(&self, session: &str) -> AppResult<()> {
        let (date_key, employee_key) = self.navigation_keys(session);
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(vec![date_key, employee_key]).await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
