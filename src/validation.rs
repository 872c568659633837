//! Field-level validation of client input.
//!
//! Every field of a payload is checked before anything is reported, so a
//! client sees all of its mistakes at once. Errors are keyed by field name
//! and serialize as `{"field": ["message", ...]}`.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("This field is required.")]
    Required,
    #[error("This field may not be null.")]
    Null,
    #[error("This field may not be blank.")]
    Blank,
    #[error("Not a valid string.")]
    NotAString,
    #[error("Ensure this field has no more than {max} characters.")]
    TooLong { max: usize },
    #[error("A valid integer is required.")]
    NotAnInteger,
    #[error("Ensure this value is greater than or equal to {min}.")]
    BelowMinimum { min: i64 },
    #[error("Ensure this value is less than or equal to {max}.")]
    AboveMaximum { max: i64 },
    #[error("Incorrect type. Expected pk value, received {received}.")]
    IncorrectPkType { received: &'static str },
    #[error("Invalid pk \"{pk}\" - object does not exist.")]
    UnknownPk { pk: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, err: FieldError) -> Self {
        let mut errors = Self::new();
        errors.add(field, err);
        errors
    }

    pub fn add(&mut self, field: &'static str, err: FieldError) {
        self.0.entry(field).or_default().push(err.to_string());
    }

    /// Records the error of a failed check and passes a successful value through.
    pub fn check<T>(&mut self, field: &'static str, res: Result<T, FieldError>) -> Option<T> {
        match res {
            Ok(val) => Some(val),
            Err(err) => {
                self.add(field, err);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid input:")?;
        for (field, messages) in &self.0 {
            write!(f, " {field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn type_name(val: &Value) -> &'static str {
    match val {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(num) if num.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Coerces a present, non-null value to text. Numbers are accepted in their JSON form.
pub fn text(val: &Value) -> Result<String, FieldError> {
    match val {
        Value::Null => Err(FieldError::Null),
        Value::String(s) => Ok(s.clone()),
        Value::Number(num) => Ok(num.to_string()),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(FieldError::NotAString),
    }
}

fn integral(val: &Value) -> Option<i64> {
    match val {
        Value::Number(num) => num.as_i64().or_else(|| {
            num.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            let s = s.strip_suffix(".0").unwrap_or(s);
            s.parse().ok()
        }
        _ => None,
    }
}

/// Coerces a present value to an integer; integral strings and floats are accepted.
pub fn integer(val: &Value) -> Result<i64, FieldError> {
    match val {
        Value::Null => Err(FieldError::Null),
        other => integral(other).ok_or(FieldError::NotAnInteger),
    }
}

/// Coerces a present value to a primary key. The key still has to be resolved.
pub fn primary_key(val: &Value) -> Result<i64, FieldError> {
    match val {
        Value::Null => Err(FieldError::Null),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(FieldError::IncorrectPkType {
            received: type_name(val),
        }),
        Value::Number(_) | Value::String(_) => {
            integral(val).ok_or(FieldError::IncorrectPkType {
                received: type_name(val),
            })
        }
    }
}

/// Renders a primary key the way the client sent it, for "does not exist" messages.
pub fn pk_display(val: &Value) -> String {
    match val {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_every_failed_field() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.check("title", text(&json!(null))), None);
        errors.add("author", FieldError::Required);
        assert_eq!(errors.check("count", integer(&json!(3))), Some(3));
        assert!(!errors.is_empty());

        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({
                "author": ["This field is required."],
                "title": ["This field may not be null."],
            })
        );
    }

    #[test]
    fn text_accepts_strings_and_numbers() {
        assert_eq!(text(&json!("Dune")), Ok("Dune".to_string()));
        assert_eq!(text(&json!(1984)), Ok("1984".to_string()));
        assert_eq!(text(&json!(null)), Err(FieldError::Null));
        assert_eq!(text(&json!(["a"])), Err(FieldError::NotAString));
        assert_eq!(text(&json!(true)), Err(FieldError::NotAString));
    }

    #[test]
    fn integer_accepts_integral_values_only() {
        assert_eq!(integer(&json!(-1)), Ok(-1));
        assert_eq!(integer(&json!("12")), Ok(12));
        assert_eq!(integer(&json!(4.0)), Ok(4));
        assert_eq!(integer(&json!(4.5)), Err(FieldError::NotAnInteger));
        assert_eq!(integer(&json!("many")), Err(FieldError::NotAnInteger));
        assert_eq!(integer(&json!(false)), Err(FieldError::NotAnInteger));
    }

    #[test]
    fn primary_key_reports_received_type() {
        assert_eq!(primary_key(&json!(5)), Ok(5));
        assert_eq!(primary_key(&json!("5")), Ok(5));
        assert_eq!(
            primary_key(&json!("five")),
            Err(FieldError::IncorrectPkType { received: "str" })
        );
        assert_eq!(
            primary_key(&json!({"id": 5})),
            Err(FieldError::IncorrectPkType { received: "dict" })
        );
        assert_eq!(primary_key(&json!(null)), Err(FieldError::Null));
    }

    #[test]
    fn messages_match_wire_format() {
        assert_eq!(
            FieldError::BelowMinimum { min: 0 }.to_string(),
            "Ensure this value is greater than or equal to 0."
        );
        assert_eq!(
            FieldError::UnknownPk {
                pk: "1234".to_string()
            }
            .to_string(),
            r#"Invalid pk "1234" - object does not exist."#
        );
        assert_eq!(pk_display(&json!(1234)), "1234");
        assert_eq!(pk_display(&json!("1234")), "1234");
    }
}
