use sqlx::PgPool;
use tracing::info;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// Type plus constraints, e.g. `TEXT NOT NULL UNIQUE`
    pub definition: String,
}

/// Table description used by [`auto_migrate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            definition: definition.into(),
        });
        self
    }

    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.definition))
            .collect();
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns.join(", "))
    }
}

/// Binds a Rust type to the table it is stored in
pub trait Model {
    fn schema() -> TableSchema;
}

/// Create every missing table in one transaction. Existing tables are left alone.
pub async fn auto_migrate(pool: &PgPool, tables: &[TableSchema]) -> Result<(), DatabaseError> {
    if let Some(empty) = tables.iter().find(|t| t.columns.is_empty()) {
        return Err(DatabaseError::MigrationError(format!(
            "table '{}' has no columns",
            empty.name
        )));
    }

    let mut tx = pool.begin().await?;
    for table in tables {
        sqlx::query(&table.create_table_sql())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("{}: {}", table.name, e)))?;
    }
    tx.commit().await?;

    info!("auto migration completed ({} tables)", tables.len());
    Ok(())
}
