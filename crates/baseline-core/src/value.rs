//! Variable types and typed values.
//!
//! Values arrive as text (from profile selections, overrides or catalog
//! defaults) and are checked against the variable's declared type here. The
//! normalised text is what downstream consumers see; the typed value is kept
//! alongside for tools that need it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Declared type of a catalog variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    String,
    /// Enumerated string set: one or more comma-separated members.
    StringSet,
    Integer,
    Duration,
    Boolean,
    /// Size with an optional binary unit suffix.
    Size,
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VariableType::String => "string",
            VariableType::StringSet => "string_set",
            VariableType::Integer => "integer",
            VariableType::Duration => "duration",
            VariableType::Boolean => "boolean",
            VariableType::Size => "size",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    String(String),
    StringSet(Vec<String>),
    Integer(i64),
    /// Whole seconds.
    Duration(u64),
    Boolean(bool),
    /// Bytes.
    Size(u64),
}

impl TypedValue {
    /// Canonical text form, used as the bound value in build plans.
    pub fn normalized(&self) -> String {
        match self {
            TypedValue::String(s) => s.clone(),
            TypedValue::StringSet(members) => members.join(","),
            TypedValue::Integer(i) => i.to_string(),
            TypedValue::Duration(secs) => secs.to_string(),
            TypedValue::Boolean(b) => b.to_string(),
            TypedValue::Size(bytes) => bytes.to_string(),
        }
    }
}

/// Why a raw value does not fit its declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("'{value}' is not a valid {ty}: {reason}")]
    Invalid {
        ty: VariableType,
        value: String,
        reason: String,
    },

    #[error("'{value}' is not one of the permitted values [{}]", .allowed.join(", "))]
    NotAllowed { value: String, allowed: Vec<String> },
}

/// Check `raw` against `ty` (and the enumerated `allowed` set, for string types).
pub fn check(ty: VariableType, raw: &str, allowed: &[String]) -> Result<TypedValue, ValueError> {
    let invalid = |reason: &str| ValueError::Invalid {
        ty,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let not_allowed = |value: &str| ValueError::NotAllowed {
        value: value.to_string(),
        allowed: allowed.to_vec(),
    };

    match ty {
        VariableType::String => {
            if !allowed.is_empty() && !allowed.iter().any(|a| a == raw) {
                return Err(not_allowed(raw));
            }
            Ok(TypedValue::String(raw.to_string()))
        }
        VariableType::StringSet => {
            let mut members: Vec<String> = Vec::new();
            for member in raw.split(',').map(str::trim) {
                if member.is_empty() {
                    return Err(invalid("empty member"));
                }
                if !allowed.is_empty() && !allowed.iter().any(|a| a == member) {
                    return Err(not_allowed(member));
                }
                if !members.iter().any(|m| m == member) {
                    members.push(member.to_string());
                }
            }
            Ok(TypedValue::StringSet(members))
        }
        VariableType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|e| invalid(&e.to_string())),
        VariableType::Duration => parse_duration(raw)
            .map(|d| TypedValue::Duration(d.as_secs()))
            .map_err(|reason| invalid(&reason)),
        VariableType::Boolean => parse_bool(raw)
            .map(TypedValue::Boolean)
            .ok_or_else(|| invalid("expected true/false, yes/no, on/off or 1/0")),
        VariableType::Size => parse_size(raw)
            .map(TypedValue::Size)
            .map_err(|reason| invalid(&reason)),
    }
}

/// Bare integers are seconds; anything else goes through humantime.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(raw).map_err(|e| e.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_size(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    if digits.is_empty() {
        return Err("missing numeric amount".to_string());
    }
    let amount: u64 = digits.parse().map_err(|e| format!("{}", e))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        other => return Err(format!("unknown unit '{}'", other)),
    };

    amount
        .checked_mul(multiplier)
        .ok_or_else(|| "size overflows 64 bits".to_string())
}

/// Deserializers that accept any YAML scalar and keep its text form.
///
/// Catalog authors write `default: 14` as often as `default: "14"`.
pub(crate) mod scalar {
    use super::BTreeMap;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    fn to_text<E: serde::de::Error>(value: Value) -> Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Tagged(tagged) => to_text(tagged.value),
            other => Err(E::custom(format!(
                "expected a scalar value, found {:?}",
                other
            ))),
        }
    }

    pub(crate) fn optional<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(v) => to_text(v).map(Some),
        }
    }

    pub(crate) fn list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<Value>::deserialize(d)?
            .into_iter()
            .map(to_text::<D::Error>)
            .collect()
    }

    pub(crate) fn map<'de, D>(d: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mapping = serde_yaml::Mapping::deserialize(d)?;
        let mut out = BTreeMap::new();
        for (k, v) in mapping {
            let key = to_text::<D::Error>(k)?;
            let value = to_text::<D::Error>(v)?;
            if out.insert(key.clone(), value).is_some() {
                return Err(D::Error::custom(format!("duplicate option '{}'", key)));
            }
        }
        Ok(out)
    }
}
