//! Stored inbound emails.

use crate::catalog::{EmailType, EmailTypeCatalog};
use crate::error::DispatchError;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A received email as stored in `si_received_email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ReceivedEmail {
    pub id: i64,
    pub to_email: Option<String>,
    pub sender_email: Option<String>,
    pub sender_subject: Option<String>,
    pub plain: Option<String>,
    pub html: Option<String>,
}

/// Where emails to replay come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSource: Send + Sync {
    /// Most recent emails of `email_type` received within `days` days.
    async fn fetch(
        &self,
        email_type: &str,
        limit: u32,
        days: u32,
    ) -> Result<Vec<ReceivedEmail>, DispatchError>;
}

/// Reads emails that produced a lead from the MySQL mail store.
pub struct MySqlEmailSource {
    pool: MySqlPool,
    catalog: Arc<EmailTypeCatalog>,
}

impl MySqlEmailSource {
    pub fn new(pool: MySqlPool, catalog: Arc<EmailTypeCatalog>) -> Self {
        Self { pool, catalog }
    }
}

#[async_trait]
impl EmailSource for MySqlEmailSource {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        email_type: &str,
        limit: u32,
        days: u32,
    ) -> Result<Vec<ReceivedEmail>, DispatchError> {
        let definition = self
            .catalog
            .get(email_type)
            .ok_or_else(|| DispatchError::UnknownEmailType(email_type.to_string()))?;
        let (sql, patterns) = build_query(email_type, definition)?;
        debug!(%sql, "Querying received emails");

        let mut query = sqlx::query_as::<_, ReceivedEmail>(&sql).bind(days);
        for pattern in patterns {
            query = query.bind(pattern);
        }
        let emails = query.bind(limit).fetch_all(&self.pool).await?;

        debug!(count = emails.len(), "Fetched received emails");
        Ok(emails)
    }
}

/// SQL text and LIKE parameters for one email type.
///
/// Placeholders are bound in order: days, each pattern, limit.
pub(crate) fn build_query(
    key: &str,
    definition: &EmailType,
) -> Result<(String, Vec<String>), DispatchError> {
    let searches: Vec<_> = definition.like_searches().collect();
    if searches.is_empty() {
        return Err(DispatchError::Catalog(format!(
            "email type `{}` has no LIKE search",
            key
        )));
    }

    let conditions = searches
        .iter()
        .map(|m| format!("{} LIKE ?", m.field))
        .collect::<Vec<_>>()
        .join(" OR ");
    let patterns = searches
        .iter()
        .map(|m| format!("%{}%", m.pattern))
        .collect();

    let sql = format!(
        "SELECT id, to_email, sender_email, sender_subject, plain, html \
         FROM si_received_email \
         WHERE created_at > CURRENT_DATE() - INTERVAL ? DAY \
         AND substatus = 'lead_created' \
         AND ({}) \
         ORDER BY created_at DESC \
         LIMIT ?",
        conditions
    );

    Ok((sql, patterns))
}
