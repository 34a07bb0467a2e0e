//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for registry resources.

use super::list::ListQuery;
use super::params::SqlParam;
use super::quoted;
use crate::pagination::ENDERECO;
use crate::resources::Resource;
use serde_json::{Map, Value};

/// Alias of the joined address table in resource statements.
pub const ADDRESS_ALIAS: &str = "e";

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlParam) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn qualified(alias: &str, column: &str) -> String {
    format!("{}.{}", alias, quoted(column))
}

/// Owner columns plus, for address owners, the aliased address columns.
pub fn select_list(entity: &Resource) -> String {
    let a = entity.alias;
    let mut cols = vec![qualified(a, entity.pk)];
    cols.extend(entity.columns.iter().map(|c| qualified(a, c.name)));
    cols.push(qualified(a, "criado_em"));
    cols.push(qualified(a, "atualizado_em"));
    if entity.owns_attachments() {
        cols.push(ENDERECO.select_list(ADDRESS_ALIAS));
    }
    cols.join(", ")
}

/// Table expression; address owners LEFT JOIN their active principal address (at most one row).
pub fn from_clause(entity: &Resource) -> String {
    let base = format!("{} {}", quoted(entity.table), entity.alias);
    match entity.owner_kind {
        Some(kind) => format!(
            "{} LEFT JOIN \"endereco\" {e} ON {e}.\"tipo_dono\" = {} AND {e}.\"id_dono\" = {} AND {e}.\"ativo\" AND {e}.\"principal\"",
            base,
            literal(kind),
            qualified(entity.alias, entity.pk),
            e = ADDRESS_ALIAS,
        ),
        None => base,
    }
}

/// Listing query: exact-match filters on the resource's filter columns (cast to the column type)
/// and an optional `busca` text matched against the search columns. Ordered by primary key.
pub fn list_query(entity: &Resource, filters: &[(String, String)], busca: Option<&str>) -> ListQuery {
    let mut q = ListQuery::new(select_list(entity), from_clause(entity));
    for (name, value) in filters {
        if !entity.filters.contains(&name.as_str()) {
            continue;
        }
        let Some(column) = entity.column(name) else { continue };
        q.filter_eq_cast(&qualified(entity.alias, column.name), value.as_str(), column.pg_type);
    }
    if let Some(text) = busca.map(str::trim).filter(|s| !s.is_empty()) {
        let columns: Vec<String> = entity.search.iter().map(|c| qualified(entity.alias, c)).collect();
        q.filter_any_ilike(&columns, text);
    }
    q.order_by(qualified(entity.alias, entity.pk));
    q
}

/// SELECT by primary key; caller binds the id as `$1`.
pub fn select_by_id(entity: &Resource) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_list(entity),
        from_clause(entity),
        qualified(entity.alias, entity.pk)
    )
}

/// INSERT of the writable columns present in `body`, returning the new primary key.
/// Columns left out take their database default. None when `body` has no writable column.
pub fn insert(entity: &Resource, body: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.columns {
        let Some(v) = body.get(c.name) else { continue };
        let n = q.push_param(SqlParam::from_json(v));
        cols.push(quoted(c.name));
        placeholders.push(format!("${}::{}", n, c.pg_type));
    }
    if cols.is_empty() {
        return None;
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(entity.table),
        cols.join(", "),
        placeholders.join(", "),
        quoted(entity.pk)
    );
    Some(q)
}

/// UPDATE by id: SET only writable columns present in body, plus `atualizado_em`.
/// None when `body` has no writable column.
pub fn update(entity: &Resource, id: i64, body: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in entity.columns {
        let Some(v) = body.get(c.name) else { continue };
        let n = q.push_param(SqlParam::from_json(v));
        sets.push(format!("{} = ${}::{}", quoted(c.name), n, c.pg_type));
    }
    if sets.is_empty() {
        return None;
    }
    sets.push(format!("{} = NOW()", quoted("atualizado_em")));
    let id_param = q.push_param(SqlParam::I64(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        quoted(entity.table),
        sets.join(", "),
        quoted(entity.pk),
        id_param,
        quoted(entity.pk)
    );
    Some(q)
}

/// DELETE by id; caller binds the id as `$1`.
pub fn delete(entity: &Resource) -> String {
    format!(
        "DELETE FROM {} WHERE {} = $1 RETURNING {}",
        quoted(entity.table),
        quoted(entity.pk),
        quoted(entity.pk)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::resource_by_path;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_owner_listing_joins_principal_address() {
        let r = resource_by_path("candidatos").unwrap();
        let q = list_query(r, &[], None);
        let sql = q.page_sql();
        assert!(sql.contains("LEFT JOIN \"endereco\" e ON e.\"tipo_dono\" = 'candidato' AND e.\"id_dono\" = c.\"id_candidato\""));
        assert!(sql.contains("e.\"numero\" AS \"numero_endereco\""));
        assert!(sql.ends_with("ORDER BY c.\"id_candidato\""));
        assert!(!q.count_sql().contains("ORDER BY"));
    }

    #[test]
    fn test_plain_listing_has_no_join() {
        let r = resource_by_path("salas").unwrap();
        let q = list_query(r, &[], None);
        assert_eq!(q.count_sql(), "SELECT COUNT(*) FROM \"sala\" sa");
        assert!(!q.page_sql().contains("endereco"));
    }

    #[test]
    fn test_filters_and_busca() {
        let r = resource_by_path("candidatos").unwrap();
        let filters = vec![
            ("ativo".to_string(), "true".to_string()),
            ("id_curso".to_string(), "4".to_string()),
            ("senha".to_string(), "x".to_string()),
            ("telefone".to_string(), "1".to_string()),
        ];
        let q = list_query(r, &filters, Some("  ana "));
        let count = q.count_sql();
        assert!(count.contains("c.\"ativo\" = $1::boolean"));
        assert!(count.contains("c.\"id_curso\" = $2::bigint"));
        assert!(count.contains("(c.\"nome\"::text ILIKE $3 OR c.\"cpf\"::text ILIKE $3 OR c.\"email\"::text ILIKE $3)"));
        assert!(!count.contains("telefone"));
        assert_eq!(q.params().len(), 3);
        assert_eq!(q.params()[2], SqlParam::String("%ana%".into()));
    }

    #[test]
    fn test_blank_busca_ignored() {
        let r = resource_by_path("salas").unwrap();
        let q = list_query(r, &[], Some("   "));
        assert!(q.params().is_empty());
    }

    #[test]
    fn test_insert_only_present_columns() {
        let r = resource_by_path("salas").unwrap();
        let q = insert(r, &obj(json!({"nome": "101", "capacidade": 30, "extra": 1}))).unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO \"sala\" (\"nome\", \"capacidade\") VALUES ($1::text, $2::integer) RETURNING \"id_sala\""
        );
        assert_eq!(q.params, vec![SqlParam::String("101".into()), SqlParam::I64(30)]);
        assert!(insert(r, &obj(json!({"extra": 1}))).is_none());
    }

    #[test]
    fn test_update_binds_id_last() {
        let r = resource_by_path("salas").unwrap();
        let q = update(r, 9, &obj(json!({"capacidade": 40}))).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE \"sala\" SET \"capacidade\" = $1::integer, \"atualizado_em\" = NOW() WHERE \"id_sala\" = $2 RETURNING \"id_sala\""
        );
        assert_eq!(q.params, vec![SqlParam::I64(40), SqlParam::I64(9)]);
        assert!(update(r, 9, &obj(json!({"id_sala": 3}))).is_none());
    }
}
