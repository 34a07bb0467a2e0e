//! Addresses and contacts owned by registry resources.
//!
//! Rows are keyed to their owner by `(tipo_dono, id_dono)`. At most one row per owner may be both
//! active and principal: a partial unique index enforces it, and every mutation here runs in a
//! transaction that locks the owner row, demotes the previous principal before writing a new one,
//! and promotes the most recent active row when an owner is left without a principal.

use crate::error::AppError;
use crate::pagination::{paginate, Page, PageRequest};
use crate::resources::{Column, Resource};
use crate::service::crud::{execute, fetch_id, fetch_optional};
use crate::service::validation::{normalize_endereco, validate_contato};
use crate::sql::{quoted, ListQuery, QueryBuf, SqlParam};
use serde_json::{Map, Value};
use sqlx::{Executor, PgConnection, PgPool, Postgres};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    Endereco,
    Contato,
}

pub const ATTACHMENT_KINDS: [AttachmentKind; 2] = [AttachmentKind::Endereco, AttachmentKind::Contato];

const ENDERECO_COLUMNS: &[Column] = &[
    Column { name: "cep", pg_type: "text", default: None },
    Column { name: "logradouro", pg_type: "text", default: None },
    Column { name: "numero", pg_type: "text", default: None },
    Column { name: "bairro", pg_type: "text", default: None },
    Column { name: "cidade", pg_type: "text", default: None },
    Column { name: "complemento", pg_type: "text", default: None },
    Column { name: "uf", pg_type: "text", default: None },
    Column { name: "telefone", pg_type: "text", default: None },
];

const CONTATO_COLUMNS: &[Column] = &[
    Column { name: "nome", pg_type: "text", default: None },
    Column { name: "email", pg_type: "text", default: None },
    Column { name: "telefone", pg_type: "text", default: None },
    Column { name: "cargo", pg_type: "text", default: None },
];

impl AttachmentKind {
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "enderecos" => Some(AttachmentKind::Endereco),
            "contatos" => Some(AttachmentKind::Contato),
            _ => None,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            AttachmentKind::Endereco => "endereco",
            AttachmentKind::Contato => "contato",
        }
    }

    pub fn pk(self) -> &'static str {
        match self {
            AttachmentKind::Endereco => "id_endereco",
            AttachmentKind::Contato => "id_contato",
        }
    }

    /// Writable data columns; `principal` and `ativo` are managed separately.
    pub fn columns(self) -> &'static [Column] {
        match self {
            AttachmentKind::Endereco => ENDERECO_COLUMNS,
            AttachmentKind::Contato => CONTATO_COLUMNS,
        }
    }

    fn select_list(self) -> String {
        let mut cols = vec![quoted(self.pk()), quoted("tipo_dono"), quoted("id_dono")];
        cols.extend(self.columns().iter().map(|c| quoted(c.name)));
        for c in ["principal", "ativo", "criado_em", "atualizado_em"] {
            cols.push(quoted(c));
        }
        cols.join(", ")
    }

    /// Normalize and validate a create/update payload. `stored` is the current row on update.
    fn prepare(self, body: &mut Map<String, Value>, stored: Option<&Value>) -> Result<(), AppError> {
        match self {
            AttachmentKind::Endereco => normalize_endereco(body),
            AttachmentKind::Contato => {
                let mut merged = stored.and_then(Value::as_object).cloned().unwrap_or_default();
                merged.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
                validate_contato(&merged)
            }
        }
    }
}

/// Owner of an attachment request: the resource and the owner row id.
pub struct Owner<'a> {
    pub resource: &'a Resource,
    pub kind: &'static str,
    pub id: i64,
}

impl<'a> Owner<'a> {
    pub fn new(resource: &'a Resource, id: i64) -> Result<Self, AppError> {
        let kind = resource
            .owner_kind
            .ok_or_else(|| AppError::NotFound(format!("{} não possui endereços ou contatos", resource.path)))?;
        Ok(Owner { resource, kind, id })
    }

    fn params(&self) -> [SqlParam; 2] {
        [SqlParam::from(self.kind), SqlParam::I64(self.id)]
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} {}", self.resource.path, self.id))
    }
}

pub struct AttachmentService;

impl AttachmentService {
    /// Paginated listing of an owner's rows, principal first then newest. `ativo` filters by state.
    pub async fn list(
        pool: &PgPool,
        kind: AttachmentKind,
        owner: &Owner<'_>,
        ativo: Option<bool>,
        page: PageRequest,
    ) -> Result<Page, AppError> {
        ensure_owner(pool, owner, false).await?;

        let q = list_query(kind, owner, ativo);
        let result = paginate(pool, &q.page_sql(), &q.count_sql(), q.params(), page.page, page.limit).await?;
        Ok(result)
    }

    pub async fn create(
        pool: &PgPool,
        kind: AttachmentKind,
        owner: &Owner<'_>,
        mut body: Map<String, Value>,
    ) -> Result<Value, AppError> {
        kind.prepare(&mut body, None)?;
        let ativo = flag(&body, "ativo")?.unwrap_or(true);
        let principal = ativo && flag(&body, "principal")?.unwrap_or(false);

        let mut tx = pool.begin().await?;
        ensure_owner(&mut *tx, owner, true).await?;
        if principal {
            demote_principal(&mut tx, kind, owner, None).await?;
        }
        let q = insert(kind, owner, &body, principal, ativo);
        let id = fetch_id(&mut *tx, &q).await?.ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        ensure_principal(&mut tx, kind, owner).await?;
        let row = select_one(&mut tx, kind, owner, id, false)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        tracing::info!(table = kind.table(), owner = owner.kind, owner_id = owner.id, id, principal, "attachment created");
        Ok(row)
    }

    pub async fn update(
        pool: &PgPool,
        kind: AttachmentKind,
        owner: &Owner<'_>,
        id: i64,
        mut body: Map<String, Value>,
    ) -> Result<Value, AppError> {
        let mut tx = pool.begin().await?;
        ensure_owner(&mut *tx, owner, true).await?;
        let stored = select_one(&mut tx, kind, owner, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.table(), id)))?;
        kind.prepare(&mut body, Some(&stored))?;

        let ativo = flag(&body, "ativo")?.unwrap_or_else(|| stored_flag(&stored, "ativo"));
        let principal = ativo && flag(&body, "principal")?.unwrap_or_else(|| stored_flag(&stored, "principal"));
        if principal {
            demote_principal(&mut tx, kind, owner, Some(id)).await?;
        }
        let q = update(kind, id, &body, principal, ativo);
        fetch_id(&mut *tx, &q).await?;
        ensure_principal(&mut tx, kind, owner).await?;
        let row = select_one(&mut tx, kind, owner, id, false)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        Ok(row)
    }

    /// Soft delete: the row becomes inactive and loses principal; another active row is promoted.
    pub async fn remove(pool: &PgPool, kind: AttachmentKind, owner: &Owner<'_>, id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        ensure_owner(&mut *tx, owner, true).await?;
        let sql = format!(
            "UPDATE {t} SET \"ativo\" = false, \"principal\" = false, \"atualizado_em\" = NOW() \
             WHERE {pk} = $3 AND \"tipo_dono\" = $1 AND \"id_dono\" = $2 RETURNING {pk}",
            t = quoted(kind.table()),
            pk = quoted(kind.pk()),
        );
        let [tipo, dono] = owner.params();
        let q = QueryBuf {
            sql,
            params: vec![tipo, dono, SqlParam::I64(id)],
        };
        if fetch_id(&mut *tx, &q).await?.is_none() {
            return Err(AppError::NotFound(format!("{} {}", kind.table(), id)));
        }
        ensure_principal(&mut tx, kind, owner).await?;
        tx.commit().await?;
        tracing::info!(table = kind.table(), owner = owner.kind, owner_id = owner.id, id, "attachment deactivated");
        Ok(())
    }
}

fn flag(body: &Map<String, Value>, key: &str) -> Result<Option<bool>, AppError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(AppError::Validation(format!("{} deve ser booleano", key))),
    }
}

fn stored_flag(row: &Value, key: &str) -> bool {
    row.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// 404 when the owner row is missing. With `lock`, the owner row is locked for the transaction so
/// concurrent attachment writes for the same owner run one after another.
async fn ensure_owner<'c, E>(exec: E, owner: &Owner<'_>, lock: bool) -> Result<(), AppError>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = format!(
        "SELECT {pk} FROM {t} WHERE {pk} = $1{}",
        if lock { " FOR UPDATE" } else { "" },
        pk = quoted(owner.resource.pk),
        t = quoted(owner.resource.table),
    );
    let q = QueryBuf {
        sql,
        params: vec![SqlParam::I64(owner.id)],
    };
    match fetch_id(exec, &q).await? {
        Some(_) => Ok(()),
        None => Err(owner.not_found()),
    }
}

async fn select_one(
    conn: &mut PgConnection,
    kind: AttachmentKind,
    owner: &Owner<'_>,
    id: i64,
    lock: bool,
) -> Result<Option<Value>, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $3 AND \"tipo_dono\" = $1 AND \"id_dono\" = $2{}",
        kind.select_list(),
        quoted(kind.table()),
        quoted(kind.pk()),
        if lock { " FOR UPDATE" } else { "" },
    );
    let [tipo, dono] = owner.params();
    Ok(fetch_optional(&mut *conn, &sql, &[tipo, dono, SqlParam::I64(id)]).await?)
}

/// Clear `principal` on the owner's rows, optionally sparing `except`.
async fn demote_principal(
    conn: &mut PgConnection,
    kind: AttachmentKind,
    owner: &Owner<'_>,
    except: Option<i64>,
) -> Result<(), AppError> {
    let [tipo, dono] = owner.params();
    let mut params = vec![tipo, dono];
    let mut sql = format!(
        "UPDATE {} SET \"principal\" = false, \"atualizado_em\" = NOW() \
         WHERE \"tipo_dono\" = $1 AND \"id_dono\" = $2 AND \"principal\"",
        quoted(kind.table())
    );
    if let Some(id) = except {
        sql.push_str(&format!(" AND {} <> $3", quoted(kind.pk())));
        params.push(SqlParam::I64(id));
    }
    let n = execute(&mut *conn, &sql, &params).await?;
    if n > 0 {
        tracing::debug!(table = kind.table(), owner = owner.kind, owner_id = owner.id, "previous principal demoted");
    }
    Ok(())
}

/// Promote the most recent active row when the owner has active rows but no active principal.
async fn ensure_principal(conn: &mut PgConnection, kind: AttachmentKind, owner: &Owner<'_>) -> Result<(), AppError> {
    let [tipo, dono] = owner.params();
    execute(&mut *conn, &promote_sql(kind), &[tipo, dono]).await?;
    Ok(())
}

fn promote_sql(kind: AttachmentKind) -> String {
    let t = quoted(kind.table());
    let pk = quoted(kind.pk());
    format!(
        "UPDATE {t} SET \"principal\" = true, \"atualizado_em\" = NOW() WHERE {pk} = (\
         SELECT {pk} FROM {t} WHERE \"tipo_dono\" = $1 AND \"id_dono\" = $2 AND \"ativo\" \
         ORDER BY \"criado_em\" DESC, {pk} DESC LIMIT 1) \
         AND NOT EXISTS (SELECT 1 FROM {t} WHERE \"tipo_dono\" = $1 AND \"id_dono\" = $2 AND \"ativo\" AND \"principal\")"
    )
}

fn list_query(kind: AttachmentKind, owner: &Owner<'_>, ativo: Option<bool>) -> ListQuery {
    let [tipo, dono] = owner.params();
    let mut q = ListQuery::new(kind.select_list(), quoted(kind.table()));
    q.filter_eq("\"tipo_dono\"", tipo).filter_eq("\"id_dono\"", dono);
    if let Some(a) = ativo {
        q.filter_bool("\"ativo\"", a);
    }
    q.order_by("\"principal\" DESC").order_by(format!("{} DESC", quoted(kind.pk())));
    q
}

fn insert(kind: AttachmentKind, owner: &Owner<'_>, body: &Map<String, Value>, principal: bool, ativo: bool) -> QueryBuf {
    let [tipo, dono] = owner.params();
    let mut cols = vec![quoted("tipo_dono"), quoted("id_dono"), quoted("principal"), quoted("ativo")];
    let mut params = vec![tipo, dono, SqlParam::Bool(principal), SqlParam::Bool(ativo)];
    let mut placeholders: Vec<String> = (1..=params.len()).map(|n| format!("${}", n)).collect();
    for c in kind.columns() {
        let Some(v) = body.get(c.name) else { continue };
        params.push(SqlParam::from_json(v));
        cols.push(quoted(c.name));
        placeholders.push(format!("${}::{}", params.len(), c.pg_type));
    }
    QueryBuf {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(kind.table()),
            cols.join(", "),
            placeholders.join(", "),
            quoted(kind.pk())
        ),
        params,
    }
}

fn update(kind: AttachmentKind, id: i64, body: &Map<String, Value>, principal: bool, ativo: bool) -> QueryBuf {
    let mut params = vec![SqlParam::Bool(principal), SqlParam::Bool(ativo)];
    let mut sets = vec![
        format!("{} = $1", quoted("principal")),
        format!("{} = $2", quoted("ativo")),
    ];
    for c in kind.columns() {
        let Some(v) = body.get(c.name) else { continue };
        params.push(SqlParam::from_json(v));
        sets.push(format!("{} = ${}::{}", quoted(c.name), params.len(), c.pg_type));
    }
    sets.push(format!("{} = NOW()", quoted("atualizado_em")));
    params.push(SqlParam::I64(id));
    QueryBuf {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            quoted(kind.table()),
            sets.join(", "),
            quoted(kind.pk()),
            params.len(),
            quoted(kind.pk())
        ),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::resource_by_path;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn owner() -> Owner<'static> {
        Owner::new(resource_by_path("candidatos").unwrap(), 42).unwrap()
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(AttachmentKind::from_path("enderecos"), Some(AttachmentKind::Endereco));
        assert_eq!(AttachmentKind::from_path("contatos"), Some(AttachmentKind::Contato));
        assert_eq!(AttachmentKind::from_path("telefones"), None);
    }

    #[test]
    fn test_non_owner_resource_rejected() {
        let err = Owner::new(resource_by_path("salas").unwrap(), 1).err().unwrap();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_list_query_scoped_to_owner() {
        let q = list_query(AttachmentKind::Endereco, &owner(), Some(true));
        assert_eq!(
            q.count_sql(),
            "SELECT COUNT(*) FROM \"endereco\" WHERE \"tipo_dono\" = $1 AND \"id_dono\" = $2 AND \"ativo\" = $3"
        );
        assert!(q.page_sql().ends_with("ORDER BY \"principal\" DESC, \"id_endereco\" DESC"));
        assert_eq!(
            q.params(),
            &[SqlParam::String("candidato".into()), SqlParam::I64(42), SqlParam::Bool(true)]
        );
    }

    #[test]
    fn test_insert_sets_owner_and_flags_first() {
        let body = obj(json!({"cep": "01001000", "uf": "SP", "principal": true, "tipo_dono": "x"}));
        let q = insert(AttachmentKind::Endereco, &owner(), &body, true, true);
        assert_eq!(
            q.sql,
            "INSERT INTO \"endereco\" (\"tipo_dono\", \"id_dono\", \"principal\", \"ativo\", \"cep\", \"uf\") \
             VALUES ($1, $2, $3, $4, $5::text, $6::text) RETURNING \"id_endereco\""
        );
        assert_eq!(q.params[0], SqlParam::String("candidato".into()));
        assert_eq!(q.params[2], SqlParam::Bool(true));
        assert_eq!(q.params.len(), 6);
    }

    #[test]
    fn test_update_binds_id_last() {
        let q = update(AttachmentKind::Contato, 5, &obj(json!({"email": "a@b.c"})), false, true);
        assert_eq!(
            q.sql,
            "UPDATE \"contato\" SET \"principal\" = $1, \"ativo\" = $2, \"email\" = $3::text, \"atualizado_em\" = NOW() \
             WHERE \"id_contato\" = $4 RETURNING \"id_contato\""
        );
        assert_eq!(q.params.last(), Some(&SqlParam::I64(5)));
    }

    #[test]
    fn test_promote_only_without_active_principal() {
        let sql = promote_sql(AttachmentKind::Endereco);
        assert!(sql.contains("ORDER BY \"criado_em\" DESC, \"id_endereco\" DESC LIMIT 1"));
        assert!(sql.contains("NOT EXISTS (SELECT 1 FROM \"endereco\" WHERE \"tipo_dono\" = $1 AND \"id_dono\" = $2 AND \"ativo\" AND \"principal\")"));
    }

    #[test]
    fn test_flag_parsing() {
        let body = obj(json!({"ativo": false, "principal": null, "x": "sim"}));
        assert_eq!(flag(&body, "ativo").unwrap(), Some(false));
        assert_eq!(flag(&body, "principal").unwrap(), None);
        assert_eq!(flag(&body, "missing").unwrap(), None);
        assert!(flag(&body, "x").is_err());
    }

    #[test]
    fn test_contact_prepare_merges_stored_row() {
        let stored = json!({"email": "ana@x.com", "telefone": null});
        let mut body = obj(json!({"nome": "Ana"}));
        assert!(AttachmentKind::Contato.prepare(&mut body, Some(&stored)).is_ok());
        let mut body = obj(json!({"email": null}));
        assert!(AttachmentKind::Contato.prepare(&mut body, Some(&stored)).is_err());
    }
}
