//! Pull handler - serves records newer than the client's sync tokens.

use crate::db;
use crate::error::{AppError, Result};
use inventory_engine::{CollectionKind, PullRequest, PullResponse, SyncToken};
use serde_json::Value;
use sqlx::PgPool;

/// Answer a pull request with every record written after the client's
/// token, per collection.
///
/// The returned token is the highest version sent, or the client's own
/// token when nothing is newer.
pub async fn handle_pull(pool: &PgPool, request: PullRequest) -> Result<PullResponse> {
    let mut response = PullResponse::default();

    for kind in CollectionKind::ALL {
        let token = request.token(kind);
        let since = parse_token(kind, token)?;
        let rows = db::get_records_since(pool, kind.as_str(), since).await?;

        let next = match rows.last() {
            Some(last) => Value::String(last.version.to_string()),
            None => token.clone(),
        };
        if !next.is_null() {
            response.updated_timestamps.insert(kind, next);
        }

        response
            .batches
            .insert(kind, rows.into_iter().map(|row| row.payload).collect());
    }

    tracing::debug!("Serving {} records", response.record_count());
    Ok(response)
}

/// Read a client token as a record version.
///
/// Tokens are issued as decimal strings; plain numbers are accepted too.
pub fn parse_token(kind: CollectionKind, token: &SyncToken) -> Result<Option<i64>> {
    let invalid = || AppError::InvalidToken {
        collection: kind,
        token: token.to_string(),
    };

    match token {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_i64().map(Some).ok_or_else(invalid),
        Value::String(s) => s.parse::<i64>().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tokens_parse() {
        let kind = CollectionKind::Projects;

        assert_eq!(parse_token(kind, &Value::Null).unwrap(), None);
        assert_eq!(parse_token(kind, &json!("42")).unwrap(), Some(42));
        assert_eq!(parse_token(kind, &json!(42)).unwrap(), Some(42));
    }

    #[test]
    fn malformed_tokens_rejected() {
        let kind = CollectionKind::Spots;

        assert!(matches!(
            parse_token(kind, &json!("yesterday")),
            Err(AppError::InvalidToken { collection: CollectionKind::Spots, .. })
        ));
        assert!(parse_token(kind, &json!(1.5)).is_err());
        assert!(parse_token(kind, &json!({"at": 1})).is_err());
    }
}
