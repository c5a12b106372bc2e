//! Situation library: reusable scenario reply templates.

pub mod seed;

pub use seed::SCENARIO_SEEDS;

use crate::error::DatabaseError;
use crate::store::Database;

/// Seed the built-in catalog on first start. Safe to call every start.
pub async fn ensure_seeded(db: &dyn Database) -> Result<usize, DatabaseError> {
    let inserted = db.seed_situation_library_if_empty(SCENARIO_SEEDS).await?;
    if inserted == 0 {
        tracing::debug!("Situation library already populated");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use std::collections::HashSet;

    #[test]
    fn seed_keys_are_unique_and_complete() {
        let keys: HashSet<_> = SCENARIO_SEEDS.iter().map(|s| s.key).collect();
        assert_eq!(keys.len(), SCENARIO_SEEDS.len());
        assert_eq!(SCENARIO_SEEDS.len(), 32);
        assert!(SCENARIO_SEEDS.iter().all(|s| !s.reply_template.trim().is_empty()));
    }

    #[tokio::test]
    async fn ensure_seeded_is_idempotent() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        assert_eq!(ensure_seeded(&db).await.unwrap(), 32);
        assert_eq!(ensure_seeded(&db).await.unwrap(), 0);
        assert_eq!(db.count_templates().await.unwrap(), 32);

        let chargeback = db.get_template("chargeback_process").await.unwrap().unwrap();
        assert_eq!(chargeback.language, "zh");
    }
}
