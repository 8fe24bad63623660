//! Deterministic digests: sha256 over RFC 8785 (JCS) canonical JSON.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// `sha256:<hex>` of the JCS form of `value`.
pub(crate) fn canonical_digest<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let canonical = serde_jcs::to_string(value)?;
    Ok(format!(
        "sha256:{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_order_does_not_matter() {
        let a = serde_json::json!({"b": 1, "a": [1, 2]});
        let b: serde_json::Value = serde_json::from_str(r#"{"a":[1,2],"b":1}"#).unwrap();
        assert_eq!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
    }

    #[test]
    fn test_array_order_matters() {
        let a = serde_json::json!(["x", "y"]);
        let b = serde_json::json!(["y", "x"]);
        assert_ne!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
    }
}
