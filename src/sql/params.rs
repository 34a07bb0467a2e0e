//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query. Converts from serde_json::Value.
///
/// Statements that compare against typed columns cast the placeholder (`$n::integer`),
/// so text-encoded values are accepted for any column type.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl SqlParam {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlParam::I64(i)
                } else {
                    SqlParam::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SqlParam::String(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlParam::Json(v.clone()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlParam::I64(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<i64> for SqlParam {
    fn from(n: i64) -> Self {
        SqlParam::I64(n)
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        SqlParam::Bool(b)
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::String(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::String(s)
    }
}

impl From<uuid::Uuid> for SqlParam {
    fn from(u: uuid::Uuid) -> Self {
        SqlParam::String(u.to_string())
    }
}

impl<'q> Encode<'q, Postgres> for SqlParam {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqlParam::Null => <Option<&str> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            SqlParam::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            SqlParam::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlParam::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlParam::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            SqlParam::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            SqlParam::Null | SqlParam::String(_) => <&str as Type<Postgres>>::type_info(),
            SqlParam::Bool(_) => <bool as Type<Postgres>>::type_info(),
            SqlParam::I64(_) => <i64 as Type<Postgres>>::type_info(),
            SqlParam::F64(_) => <f64 as Type<Postgres>>::type_info(),
            SqlParam::Json(_) => <Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for SqlParam {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}
