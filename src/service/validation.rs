//! Request validation: per-column rules for resources, plus the address and contact checks.

use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Copy, Debug)]
pub enum Format {
    Email,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub column: &'static str,
    pub required: bool,
    pub max_length: Option<usize>,
    pub pattern: Option<&'static str>,
    pub format: Option<Format>,
    pub minimum: Option<f64>,
    pub allowed: Option<&'static [&'static str]>,
}

impl FieldRule {
    pub const fn required(column: &'static str) -> Self {
        FieldRule {
            column,
            required: true,
            max_length: None,
            pattern: None,
            format: None,
            minimum: None,
            allowed: None,
        }
    }

    pub const fn optional(column: &'static str) -> Self {
        let mut r = Self::required(column);
        r.required = false;
        r
    }

    pub const fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub const fn pattern(mut self, p: &'static str) -> Self {
        self.pattern = Some(p);
        self
    }

    pub const fn format_email(mut self) -> Self {
        self.format = Some(Format::Email);
        self
    }

    pub const fn minimum(mut self, n: f64) -> Self {
        self.minimum = Some(n);
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.allowed = Some(values);
        self
    }
}

/// Compiled rule patterns, keyed by the pattern text. Rules are `'static`, so the map stays small.
static PATTERNS: OnceLock<Mutex<HashMap<&'static str, Regex>>> = OnceLock::new();

fn compiled(pattern: &'static str) -> Result<Regex, regex::Error> {
    let mut cache = PATTERNS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    cache.insert(pattern, re.clone());
    Ok(re)
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-column rules. All required fields must be present.
    pub fn validate(body: &Map<String, Value>, rules: &[FieldRule]) -> Result<(), AppError> {
        for rule in rules {
            let val = body.get(rule.column);
            if rule.required && val.map(Value::is_null).unwrap_or(true) {
                return Err(AppError::Validation(format!("{} é obrigatório", rule.column)));
            }
            if let Some(v) = val {
                validate_field(rule, v)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for updates). Required is enforced only as "not null".
    pub fn validate_partial(body: &Map<String, Value>, rules: &[FieldRule]) -> Result<(), AppError> {
        for rule in rules {
            let Some(v) = body.get(rule.column) else { continue };
            if rule.required && v.is_null() {
                return Err(AppError::Validation(format!("{} é obrigatório", rule.column)));
            }
            validate_field(rule, v)?;
        }
        Ok(())
    }
}

fn validate_field(rule: &FieldRule, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let col = rule.column;
    if let Some(Format::Email) = rule.format {
        validate_email(col, v)?;
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{} deve ter no máximo {} caracteres",
                col, max
            )));
        }
    }
    if let (Some(pattern), Some(s)) = (rule.pattern, v.as_str()) {
        let re = compiled(pattern).map_err(|_| AppError::Validation(format!("padrão inválido para {}", col)))?;
        if !re.is_match(s) {
            return Err(AppError::Validation(format!("{} em formato inválido", col)));
        }
    }
    if let Some(allowed) = rule.allowed {
        let ok = v.as_str().map(|s| allowed.contains(&s)).unwrap_or(false);
        if !ok {
            return Err(AppError::Validation(format!(
                "{} deve ser um de: {}",
                col,
                allowed.join(", ")
            )));
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            return Err(AppError::Validation(format!("{} deve ser no mínimo {}", col, min)));
        }
    }
    Ok(())
}

fn validate_email(col: &str, v: &Value) -> Result<(), AppError> {
    if let Some(s) = v.as_str() {
        if !s.contains('@') || s.len() < 3 {
            return Err(AppError::Validation(format!("{} deve ser um e-mail válido", col)));
        }
    }
    Ok(())
}

/// Normalize address fields in place: `cep` keeps digits only and must have 8, `uf` is two
/// letters upper-cased. Absent fields are left alone.
pub fn normalize_endereco(body: &mut Map<String, Value>) -> Result<(), AppError> {
    if let Some(Value::String(cep)) = body.get("cep") {
        let digits: String = cep.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 8 {
            return Err(AppError::Validation("cep deve ter 8 dígitos".into()));
        }
        body.insert("cep".into(), Value::String(digits));
    }
    if let Some(Value::String(uf)) = body.get("uf") {
        let uf = uf.trim().to_uppercase();
        if uf.len() != 2 || !uf.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::Validation("uf deve ter 2 letras".into()));
        }
        body.insert("uf".into(), Value::String(uf));
    }
    Ok(())
}

/// A contact needs an e-mail or a phone once merged with its stored values.
pub fn validate_contato(merged: &Map<String, Value>) -> Result<(), AppError> {
    let has = |k: &str| {
        merged
            .get(k)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    };
    if !has("email") && !has("telefone") {
        return Err(AppError::Validation("contato precisa de email ou telefone".into()));
    }
    if let Some(v) = merged.get("email") {
        validate_email("email", v)?;
    }
    Ok(())
}
