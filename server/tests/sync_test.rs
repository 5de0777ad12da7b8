//! Integration tests for the sync protocol.
//!
//! The `protocol_tests` run offline against the wire types. The
//! `live_tests` need a running server with a database; set
//! `INVENTORY_TEST_SERVER_URL` and run with `--ignored`.

use inventory_engine::{merge, CollectionKind, PullRequest, PullResponse, SyncState};
use serde_json::{json, Value};

/// Test helper building a pull request with a few known tokens.
fn request_with_tokens(tokens: &[(CollectionKind, Value)]) -> PullRequest {
    let mut state = SyncState::new();
    for (kind, token) in tokens {
        state.set_token(*kind, token.clone());
    }
    state.pull_request()
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn test_pull_request_wire_format() {
        let request = request_with_tokens(&[(CollectionKind::Projects, json!("17"))]);

        let body = serde_json::to_value(&request).unwrap();

        let last_sync = body["lastSync"].as_object().unwrap();
        assert_eq!(last_sync.len(), 7);
        assert_eq!(last_sync["projects"], json!("17"));
        assert_eq!(last_sync["warehouseCategories"], Value::Null);
    }

    #[test]
    fn test_pull_request_deserialization() {
        let json = r#"{
            "lastSync": {
                "profile": null,
                "warehouseItems": "120",
                "projects": null,
                "history": null,
                "warehouseCategories": null,
                "projectCategories": null,
                "spots": 9
            }
        }"#;

        let request: PullRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.token(CollectionKind::WarehouseItems), &json!("120"));
        assert_eq!(request.token(CollectionKind::Spots), &json!(9));
        assert_eq!(request.token(CollectionKind::History), &Value::Null);
    }

    #[test]
    fn test_pull_response_serialization() {
        let mut response = PullResponse::default();
        for kind in CollectionKind::ALL {
            response.batches.insert(kind, Vec::new());
        }
        response
            .batches
            .insert(CollectionKind::Spots, vec![json!({"spotId": "s1"})]);
        response
            .updated_timestamps
            .insert(CollectionKind::Spots, json!("31"));

        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["spots"], json!([{"spotId": "s1"}]));
        assert_eq!(body["profile"], json!([]));
        assert_eq!(body["updatedTimestamps"], json!({"spots": "31"}));
    }

    #[test]
    fn test_returned_tokens_feed_next_request() {
        let body = json!({
            "projects": [{"id": "p1", "name": "Deck"}],
            "updatedTimestamps": {"projects": "44"}
        });
        let response = PullResponse::from_value(body).unwrap();

        let state = SyncState::new().advanced(&response.updated_timestamps);
        let next = state.pull_request();

        assert_eq!(next.token(CollectionKind::Projects), &json!("44"));
        assert_eq!(next.token(CollectionKind::Spots), &Value::Null);
    }

    #[test]
    fn test_repeated_delta_merges_without_duplicates() {
        // A client that failed to store its tokens receives the same records again.
        let batch = vec![
            json!({"id": "i1", "name": "Drill", "count": 4, "reserved": ["p1"]}),
            json!({"id": "i2", "name": "Saw", "count": 1}),
        ];

        let first = merge(CollectionKind::WarehouseItems, Vec::new(), batch.clone());
        let second = merge(CollectionKind::WarehouseItems, first.records.clone(), batch);

        assert_eq!(second.records, first.records);
        assert_eq!(second.report.inserted, 0);
        assert_eq!(second.report.updated, 2);
    }
}

#[cfg(test)]
mod live_tests {
    use super::*;

    fn server_url() -> String {
        std::env::var("INVENTORY_TEST_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
    }

    async fn pull(client: &reqwest::Client, request: &PullRequest) -> PullResponse {
        let body: Value = client
            .post(format!("{}/sync", server_url()))
            .bearer_auth("test-session")
            .json(request)
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap()
            .json()
            .await
            .unwrap();
        PullResponse::from_value(body).unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_upsert_then_pull_round_trip() {
        let client = reqwest::Client::new();
        let id = format!("live-{}", std::process::id());

        let baseline = pull(&client, &SyncState::new().pull_request()).await;
        let state = SyncState::new().advanced(&baseline.updated_timestamps);

        let upload: Value = client
            .put(format!("{}/collections/warehouseItems/records", server_url()))
            .bearer_auth("test-session")
            .json(&vec![json!({"id": id, "name": "Live item", "count": 3})])
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(upload["upserted"], json!(1));

        let mut delta = pull(&client, &state.pull_request()).await;
        let items = delta.take_batch(CollectionKind::WarehouseItems);

        assert!(items.iter().any(|item| item["id"] == json!(id)));
        assert_eq!(
            delta.updated_timestamps[&CollectionKind::WarehouseItems],
            upload["version"]
        );
    }

    async fn upload(client: &reqwest::Client, records: Vec<Value>) {
        client
            .put(format!("{}/collections/projects/records", server_url()))
            .bearer_auth("test-session")
            .json(&records)
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_concurrent_uploads_never_skip_a_delta() {
        let client = reqwest::Client::new();
        let prefix = format!("race-{}", std::process::id());

        let baseline = pull(&client, &SyncState::new().pull_request()).await;
        let mut state = SyncState::new().advanced(&baseline.updated_timestamps);

        let mut uploads = tokio::task::JoinSet::new();
        for writer in 0..8 {
            let client = client.clone();
            let prefix = prefix.clone();
            uploads.spawn(async move {
                let batch = (0..25)
                    .map(|n| json!({"id": format!("{prefix}-{writer}-{n}"), "name": "Race"}))
                    .collect();
                upload(&client, batch).await;
            });
        }

        // Pull while the uploads are in flight, advancing the token each time.
        let mut seen = std::collections::HashSet::new();
        loop {
            let done = uploads.is_empty();
            let mut delta = pull(&client, &state.pull_request()).await;
            for record in delta.take_batch(CollectionKind::Projects) {
                if let Some(id) = record["id"].as_str().filter(|id| id.starts_with(&prefix)) {
                    seen.insert(id.to_string());
                }
            }
            state = state.advanced(&delta.updated_timestamps);
            if done {
                break;
            }
            while let Some(joined) = uploads.try_join_next() {
                joined.unwrap();
            }
        }

        assert_eq!(seen.len(), 8 * 25);
    }

    #[tokio::test]
    #[ignore]
    async fn test_unknown_collection_rejected() {
        let status = reqwest::Client::new()
            .put(format!("{}/collections/orders/records", server_url()))
            .bearer_auth("test-session")
            .json(&Vec::<Value>::new())
            .send()
            .await
            .unwrap()
            .status();

        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    }
}
