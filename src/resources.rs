//! Registry resources exposed under `/api/v1/:resource`.
//!
//! Every resource is a table with a `BIGSERIAL` primary key, a set of writable columns, and the
//! `criado_em`/`atualizado_em` timestamps. Resources with an `owner_kind` can own addresses and
//! contacts; their listings carry the active principal address nested as `endereco`.

use crate::service::FieldRule;

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    /// PostgreSQL type used in DDL and as the placeholder cast.
    pub pg_type: &'static str,
    /// DDL default expression, if any.
    pub default: Option<&'static str>,
}

const fn col(name: &'static str, pg_type: &'static str) -> Column {
    Column { name, pg_type, default: None }
}

const ATIVO: Column = Column {
    name: "ativo",
    pg_type: "boolean",
    default: Some("true"),
};

#[derive(Debug)]
pub struct Resource {
    /// Path segment, e.g. `candidatos`.
    pub path: &'static str,
    pub table: &'static str,
    /// Alias used for the table in listing statements.
    pub alias: &'static str,
    pub pk: &'static str,
    pub columns: &'static [Column],
    /// Columns searched by the `busca` query parameter.
    pub search: &'static [&'static str],
    /// Columns accepted as exact-match query filters.
    pub filters: &'static [&'static str],
    pub rules: &'static [FieldRule],
    /// `tipo_dono` value for addresses and contacts owned by this resource.
    pub owner_kind: Option<&'static str>,
}

impl Resource {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn owns_attachments(&self) -> bool {
        self.owner_kind.is_some()
    }
}

const NOME: FieldRule = FieldRule::required("nome").max_length(200);
const EMAIL: FieldRule = FieldRule::optional("email").format_email().max_length(200);
const CPF: FieldRule = FieldRule::optional("cpf").pattern(r"^\d{11}$");
const CNPJ: FieldRule = FieldRule::optional("cnpj").pattern(r"^\d{14}$");

pub static RESOURCES: &[Resource] = &[
    Resource {
        path: "candidatos",
        table: "candidato",
        alias: "c",
        pk: "id_candidato",
        columns: &[
            col("nome", "text"),
            col("cpf", "text"),
            col("email", "text"),
            col("telefone", "text"),
            col("data_nascimento", "date"),
            col("id_instituicao", "bigint"),
            col("id_curso", "bigint"),
            ATIVO,
        ],
        search: &["nome", "cpf", "email"],
        filters: &["ativo", "id_instituicao", "id_curso", "cpf"],
        rules: &[NOME, CPF, EMAIL],
        owner_kind: Some("candidato"),
    },
    Resource {
        path: "instituicoes",
        table: "instituicao",
        alias: "i",
        pk: "id_instituicao",
        columns: &[
            col("nome", "text"),
            col("cnpj", "text"),
            col("email", "text"),
            col("telefone", "text"),
            ATIVO,
        ],
        search: &["nome", "cnpj"],
        filters: &["ativo", "cnpj"],
        rules: &[NOME, CNPJ, EMAIL],
        owner_kind: Some("instituicao"),
    },
    Resource {
        path: "seguradoras",
        table: "seguradora",
        alias: "s",
        pk: "id_seguradora",
        columns: &[
            col("nome", "text"),
            col("cnpj", "text"),
            col("numero_apolice", "text"),
            col("email", "text"),
            col("telefone", "text"),
            ATIVO,
        ],
        search: &["nome", "cnpj", "numero_apolice"],
        filters: &["ativo", "cnpj"],
        rules: &[NOME, CNPJ, EMAIL],
        owner_kind: Some("seguradora"),
    },
    Resource {
        path: "empresas",
        table: "empresa",
        alias: "em",
        pk: "id_empresa",
        columns: &[
            col("razao_social", "text"),
            col("nome_fantasia", "text"),
            col("cnpj", "text"),
            col("email", "text"),
            col("telefone", "text"),
            ATIVO,
        ],
        search: &["razao_social", "nome_fantasia", "cnpj"],
        filters: &["ativo", "cnpj"],
        rules: &[
            FieldRule::required("razao_social").max_length(200),
            CNPJ,
            EMAIL,
        ],
        owner_kind: Some("empresa"),
    },
    Resource {
        path: "cursos",
        table: "curso",
        alias: "cu",
        pk: "id_curso",
        columns: &[
            col("nome", "text"),
            col("id_instituicao", "bigint"),
            col("carga_horaria", "integer"),
            ATIVO,
        ],
        search: &["nome"],
        filters: &["ativo", "id_instituicao"],
        rules: &[NOME, FieldRule::optional("carga_horaria").minimum(0.0)],
        owner_kind: None,
    },
    Resource {
        path: "contratos",
        table: "contrato",
        alias: "ct",
        pk: "id_contrato",
        columns: &[
            col("id_candidato", "bigint"),
            col("id_empresa", "bigint"),
            col("id_seguradora", "bigint"),
            col("data_inicio", "date"),
            col("data_fim", "date"),
            col("valor", "double precision"),
            col("situacao", "text"),
            ATIVO,
        ],
        search: &["situacao"],
        filters: &["ativo", "id_candidato", "id_empresa", "id_seguradora", "situacao"],
        rules: &[
            FieldRule::required("id_candidato"),
            FieldRule::required("id_empresa"),
            FieldRule::required("data_inicio"),
            FieldRule::optional("valor").minimum(0.0),
            FieldRule::optional("situacao").one_of(&["ativo", "suspenso", "encerrado"]),
        ],
        owner_kind: None,
    },
    Resource {
        path: "salas",
        table: "sala",
        alias: "sa",
        pk: "id_sala",
        columns: &[
            col("nome", "text"),
            col("id_instituicao", "bigint"),
            col("capacidade", "integer"),
            ATIVO,
        ],
        search: &["nome"],
        filters: &["ativo", "id_instituicao"],
        rules: &[NOME, FieldRule::optional("capacidade").minimum(1.0)],
        owner_kind: None,
    },
];

pub fn resource_by_path(path: &str) -> Option<&'static Resource> {
    RESOURCES.iter().find(|r| r.path == path)
}
