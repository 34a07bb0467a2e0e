//! Idempotent DDL for the registry: one table per resource plus the `endereco` and `contato`
//! tables shared by all owners.

use crate::error::AppError;
use crate::resources::{Resource, RESOURCES};
use crate::service::{AttachmentKind, ATTACHMENT_KINDS};
use crate::sql::quoted;
use sqlx::PgPool;

fn timestamps() -> [String; 2] {
    [
        format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted("criado_em")),
        format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted("atualizado_em")),
    ]
}

pub fn resource_table_ddl(entity: &Resource) -> String {
    let mut defs = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted(entity.pk))];
    for c in entity.columns {
        let mut def = format!("{} {}", quoted(c.name), c.pg_type);
        let required = entity.rules.iter().any(|r| r.column == c.name && r.required);
        if required || c.default.is_some() {
            def.push_str(" NOT NULL");
        }
        if let Some(d) = c.default {
            def.push_str(&format!(" DEFAULT {}", d));
        }
        defs.push(def);
    }
    defs.extend(timestamps());
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quoted(entity.table), defs.join(", "))
}

/// Table, owner index, and the partial unique index allowing one active principal row per owner.
pub fn attachment_ddl(kind: AttachmentKind) -> Vec<String> {
    let table = kind.table();
    let mut defs = vec![
        format!("{} BIGSERIAL PRIMARY KEY", quoted(kind.pk())),
        format!("{} TEXT NOT NULL", quoted("tipo_dono")),
        format!("{} BIGINT NOT NULL", quoted("id_dono")),
    ];
    defs.extend(kind.columns().iter().map(|c| format!("{} {}", quoted(c.name), c.pg_type)));
    defs.push(format!("{} BOOLEAN NOT NULL DEFAULT false", quoted("principal")));
    defs.push(format!("{} BOOLEAN NOT NULL DEFAULT true", quoted("ativo")));
    defs.extend(timestamps());
    vec![
        format!("CREATE TABLE IF NOT EXISTS {} ({})", quoted(table), defs.join(", ")),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (\"tipo_dono\", \"id_dono\")",
            quoted(&format!("{}_dono_idx", table)),
            quoted(table)
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} (\"tipo_dono\", \"id_dono\") WHERE \"ativo\" AND \"principal\"",
            quoted(&format!("{}_principal_unico", table)),
            quoted(table)
        ),
    ]
}

const MIGRATION_LOCK_KEY: i64 = 0x6361_6461_7374_726f;

/// Create every registry table and index that does not exist yet, in one transaction.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    let mut statements: Vec<String> = RESOURCES.iter().map(resource_table_ddl).collect();
    for kind in ATTACHMENT_KINDS {
        statements.extend(attachment_ddl(kind));
    }
    let mut tx = pool.begin().await?;
    // Concurrent `CREATE ... IF NOT EXISTS` can still collide in the catalog; serialize runners.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = statements.len(), "migrations applied");
    Ok(())
}
