//! Nesting of joined address columns into an `endereco` object.

use serde_json::{Map, Value};

/// Key of the nested address object in a reshaped row.
pub const ADDRESS_KEY: &str = "endereco";

/// Maps the aliases an address join projects into a flat row to the names used inside `endereco`.
#[derive(Clone, Copy, Debug)]
pub struct AddressLayout {
    /// Row alias of the address identifier; a null or missing value means "no address".
    pub id_key: &'static str,
    /// `(row alias, source column, public name)` for every address column, including the identifier.
    pub columns: &'static [(&'static str, &'static str, &'static str)],
}

/// Layout of the `endereco` table as joined by listing and read statements.
/// Columns that collide with owner columns are aliased with an `_endereco` suffix.
pub const ENDERECO: AddressLayout = AddressLayout {
    id_key: "id_endereco",
    columns: &[
        ("id_endereco", "id_endereco", "id_endereco"),
        ("cep", "cep", "cep"),
        ("logradouro", "logradouro", "logradouro"),
        ("numero_endereco", "numero", "numero"),
        ("bairro", "bairro", "bairro"),
        ("cidade", "cidade", "cidade"),
        ("complemento", "complemento", "complemento"),
        ("uf", "uf", "uf"),
        ("telefone_endereco", "telefone", "telefone"),
        ("principal_endereco", "principal", "principal"),
        ("ativo_endereco", "ativo", "ativo"),
    ],
};

impl AddressLayout {
    /// Projection list for a join on the address table aliased as `alias`,
    /// e.g. `e."numero" AS "numero_endereco"`.
    pub fn select_list(&self, alias: &str) -> String {
        self.columns
            .iter()
            .map(|(row_key, source, _)| format!("{}.\"{}\" AS \"{}\"", alias, source, row_key))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Move the address columns of a flat row into a nested `endereco` field.
    /// `endereco` is null when the identifier column is null or absent. Non-object values pass through.
    pub fn nest(&self, row: Value) -> Value {
        let Value::Object(mut flat) = row else {
            return row;
        };
        let mut address = Map::new();
        for (row_key, _, public) in self.columns {
            if let Some(v) = flat.remove(*row_key) {
                address.insert((*public).to_string(), v);
            }
        }
        let present = address
            .get(self.public_id_key())
            .map(|v| !v.is_null())
            .unwrap_or(false);
        let nested = if present { Value::Object(address) } else { Value::Null };
        flat.insert(ADDRESS_KEY.to_string(), nested);
        Value::Object(flat)
    }

    fn public_id_key(&self) -> &'static str {
        self.columns
            .iter()
            .find(|(row_key, _, _)| *row_key == self.id_key)
            .map(|(_, _, public)| *public)
            .unwrap_or(self.id_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_id_yields_null_endereco() {
        let row = json!({
            "id_candidato": 1,
            "nome": "Ana",
            "id_endereco": null,
            "cep": null,
            "numero_endereco": null,
            "ativo_endereco": null
        });
        let out = ENDERECO.nest(row);
        assert_eq!(out, json!({ "id_candidato": 1, "nome": "Ana", "endereco": null }));
    }

    #[test]
    fn test_missing_id_yields_null_endereco() {
        let out = ENDERECO.nest(json!({ "id_candidato": 2 }));
        assert_eq!(out["endereco"], Value::Null);
    }

    #[test]
    fn test_present_id_nests_and_renames() {
        let row = json!({
            "id_instituicao": 3,
            "numero": "A-12",
            "ativo": true,
            "id_endereco": 7,
            "cep": "01001000",
            "logradouro": "Praça da Sé",
            "numero_endereco": "100",
            "uf": "SP",
            "principal_endereco": true,
            "ativo_endereco": true
        });
        let out = ENDERECO.nest(row);
        assert_eq!(out["numero"], "A-12");
        assert_eq!(out["ativo"], true);
        assert_eq!(out["endereco"]["id_endereco"], 7);
        assert_eq!(out["endereco"]["numero"], "100");
        assert_eq!(out["endereco"]["principal"], true);
        for key in ["id_endereco", "cep", "logradouro", "numero_endereco", "uf", "principal_endereco"] {
            assert!(out.get(key).is_none(), "{} left at top level", key);
        }
    }

    #[test]
    fn test_select_list_aliases_colliding_columns() {
        let sql = ENDERECO.select_list("e");
        assert!(sql.starts_with("e.\"id_endereco\" AS \"id_endereco\""));
        assert!(sql.contains("e.\"numero\" AS \"numero_endereco\""));
        assert!(sql.contains("e.\"ativo\" AS \"ativo_endereco\""));
    }
}
