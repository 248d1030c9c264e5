//! Opaque pagination cursors.
//!
//! A cursor is the standard base64 encoding of the JSON object
//! `{"id": <uuid>, "created_at": <rfc3339>}` naming the last row of the
//! previous page.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::CoreError;
use crate::store::CursorPosition;

/// Encode a position as an opaque cursor string.
pub fn encode(position: &CursorPosition) -> Result<String, CoreError> {
    let json = serde_json::to_vec(position)
        .map_err(|e| CoreError::Internal(format!("cursor encode: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Decode a cursor produced by [`encode`].
///
/// # Errors
///
/// `Validation` on `cursor` when the string is not valid base64 or does not
/// hold a position.
pub fn decode(cursor: &str) -> Result<CursorPosition, CoreError> {
    let bytes = STANDARD
        .decode(cursor.trim())
        .map_err(|e| CoreError::validation("cursor", format!("invalid cursor encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::validation("cursor", format!("invalid cursor payload: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fabula_types::RelationId;

    use super::*;
    use crate::clock;

    #[test]
    fn cursor_round_trips() {
        let position = CursorPosition {
            id: RelationId::new(),
            created_at: clock::now(),
        };
        let encoded = encode(&position).unwrap();
        assert_eq!(decode(&encoded).unwrap(), position);
    }

    #[test]
    fn cursor_is_base64_json() {
        let position = CursorPosition {
            id: RelationId::new(),
            created_at: clock::now(),
        };
        let raw = STANDARD.decode(encode(&position).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["id"], position.id.to_string());
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn garbage_is_a_validation_error() {
        for bad in ["not base64!!", "aGVsbG8=", ""] {
            let err = decode(bad).unwrap_err();
            assert!(matches!(err, CoreError::Validation { field: "cursor", .. }), "{bad}");
        }
    }
}
