//! Location, sector and equipment repositories.
//!
//! Referential guards (no deleting a location or sector that still holds
//! something, equipment sector must belong to its location) are checked inside
//! the same transaction as the write they protect.

use std::sync::Arc;

use sqlx::SqlitePool;

use almox_assets::InvoiceAttachmentPolicy;

use crate::db;
use crate::error::StoreResult;

mod equipment;
mod locations;
mod sectors;

#[derive(Debug, Clone)]
pub struct AssetStore {
    pool: Arc<SqlitePool>,
    attachment_policy: InvoiceAttachmentPolicy,
}

impl AssetStore {
    pub fn new(pool: SqlitePool, attachment_policy: InvoiceAttachmentPolicy) -> Self {
        Self {
            pool: Arc::new(pool),
            attachment_policy,
        }
    }

    pub fn attachment_policy(&self) -> InvoiceAttachmentPolicy {
        self.attachment_policy
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn begin(&self) -> StoreResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        db::begin_write(&self.pool).await
    }
}

/// `%q%` LIKE pattern with `\` as the escape character.
pub(crate) fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("hdmi"), "%hdmi%");
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
