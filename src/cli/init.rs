use anyhow::Result;

use crate::store::{CatalogStore, SchemaAction, SCHEMA_VERSION};

pub fn run(store: &CatalogStore, action: SchemaAction) -> Result<()> {
    let path = store.config().path.display();
    match action {
        SchemaAction::Created => {
            println!("Created catalog at {} (schema v{})", path, SCHEMA_VERSION)
        }
        SchemaAction::Migrated { from } => println!(
            "Migrated catalog at {} from v{} to v{}",
            path, from, SCHEMA_VERSION
        ),
        SchemaAction::UpToDate => println!(
            "Catalog at {} is up to date (schema v{})",
            path,
            store.schema_version()?
        ),
    }

    if let Some(status) = store.pool_status() {
        println!(
            "Pool: {} connections ({} idle, {} in use)",
            status.capacity, status.idle, status.in_use
        );
    }
    Ok(())
}
