//! Schema version reconciliation
//!
//! `PRAGMA user_version` holds the schema version of the file:
//! - 0: fresh file, create the current schema
//! - below `SCHEMA_VERSION`: run each migration step in order
//! - equal: nothing to do
//! - above: refuse to open, the file belongs to a newer build
//!
//! Creation and migration run in one transaction, so a failed run leaves the
//! stamp untouched and the next startup retries from the same state. The
//! full-text shadow table is checked afterwards on every startup.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use super::schema::{
    FTS_BACKFILL, FTS_TABLE, FTS_TABLE_NAME, FTS_TRIGGERS, MIGRATE_V1_TO_V2, SCHEMA,
    SCHEMA_VERSION,
};
use crate::error::{CatalogError, Result};

/// Migration from `version` to `version + 1`
struct Step {
    from: i64,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    from: 1,
    sql: MIGRATE_V1_TO_V2,
}];

/// What `reconcile` did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    Created,
    Migrated { from: i64 },
    UpToDate,
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the file to `SCHEMA_VERSION`, then make sure the search shadow exists
pub fn reconcile(conn: &mut Connection) -> Result<SchemaAction> {
    let action = apply_version(conn)?;
    ensure_fts(conn)?;
    Ok(action)
}

fn apply_version(conn: &mut Connection) -> Result<SchemaAction> {
    let found = schema_version(conn)?;

    if found > SCHEMA_VERSION {
        return Err(CatalogError::IncompatibleSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        tracing::debug!("Schema is current at version {}", found);
        return Ok(SchemaAction::UpToDate);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let action = if found == 0 {
        tx.execute_batch(SCHEMA)?;
        SchemaAction::Created
    } else {
        for version in found..SCHEMA_VERSION {
            let step = STEPS.iter().find(|s| s.from == version).ok_or(
                CatalogError::IncompatibleSchema {
                    found,
                    supported: SCHEMA_VERSION,
                },
            )?;
            tracing::debug!("Migrating schema from version {} to {}", version, version + 1);
            tx.execute_batch(step.sql)?;
        }
        SchemaAction::Migrated { from: found }
    };
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    match action {
        SchemaAction::Created => {
            tracing::info!("Created catalog schema at version {}", SCHEMA_VERSION)
        }
        SchemaAction::Migrated { from } => {
            tracing::info!("Migrated catalog schema from version {} to {}", from, SCHEMA_VERSION)
        }
        SchemaAction::UpToDate => {}
    }
    Ok(action)
}

/// Idempotent: creates the shadow table (backfilled) and its triggers if absent
pub fn ensure_fts(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists = tx
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [FTS_TABLE_NAME],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if !exists {
        tx.execute_batch(FTS_TABLE)?;
        let rows = tx.execute(FTS_BACKFILL, [])?;
        tracing::info!("Created search index {} with {} slides", FTS_TABLE_NAME, rows);
    }
    tx.execute_batch(FTS_TRIGGERS)?;
    tx.commit()?;
    Ok(())
}
