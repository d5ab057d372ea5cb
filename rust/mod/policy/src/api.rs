use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use polsnap_core::ServiceError;

use crate::export::export_csv;
use crate::service::PolicyService;

type ServiceState = Arc<PolicyService>;

/// Export cap: the newest records returned by one export call.
const EXPORT_LIMIT: usize = 1000;

/// Build the policy module router.
///
/// Routes:
/// - `GET /pullpolicymetrics` — run one refresh cycle
/// - `GET /exportcsv`         — newest records as a CSV attachment
pub fn router(service: Arc<PolicyService>) -> Router {
    Router::new()
        .route("/pullpolicymetrics", get(pull_policy_metrics))
        .route("/exportcsv", get(export_csv_handler))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// GET /pullpolicymetrics
// ---------------------------------------------------------------------------

async fn pull_policy_metrics(
    State(service): State<ServiceState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let outcome = service.refresh().await?;
    Ok(Json(serde_json::json!({
        "message": "Policy data updated successfully",
        "index": outcome.generation,
    })))
}

// ---------------------------------------------------------------------------
// GET /exportcsv
// ---------------------------------------------------------------------------

async fn export_csv_handler(
    State(service): State<ServiceState>,
) -> Result<Response, ServiceError> {
    let records = service.latest(EXPORT_LIMIT)?;
    let csv = export_csv(&records)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=policy_data.csv",
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::fetch::{FetchError, PolicyFetcher};
    use polsnap_sql::{SQLStore, SqliteStore};

    struct StubFetcher {
        records: Vec<Value>,
        fail_status: Option<u16>,
    }

    #[async_trait]
    impl PolicyFetcher for StubFetcher {
        async fn fetch(&self) -> Result<Vec<Value>, FetchError> {
            match self.fail_status {
                Some(status) => Err(FetchError::Status(status)),
                None => Ok(self.records.clone()),
            }
        }
    }

    fn test_router(records: Vec<Value>, fail_status: Option<u16>) -> Router {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let fetcher = Arc::new(StubFetcher { records, fail_status });
        let service = Arc::new(PolicyService::new(db, fetcher).unwrap());
        router(service)
    }

    fn one_policy() -> Value {
        serde_json::json!({
            "definitionId": "P1",
            "name": "n",
            "type": "t",
            "owner": "o",
            "referenceCount": 3,
            "lastUpdated": 0,
        })
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn pull_returns_message_and_index() {
        let app = test_router(vec![one_policy()], None);

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/pullpolicymetrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "Policy data updated successfully");
        assert_eq!(body["index"], 1);

        // A second pull advances the index.
        let resp = app
            .oneshot(Request::builder().uri("/pullpolicymetrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["index"], 2);
    }

    #[tokio::test]
    async fn pull_maps_fetch_failure_to_fixed_error() {
        let app = test_router(vec![], Some(503));

        let resp = app
            .oneshot(Request::builder().uri("/pullpolicymetrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Failed to fetch policy data");
    }

    #[tokio::test]
    async fn export_on_empty_store_is_404() {
        let app = test_router(vec![], None);

        let resp = app
            .oneshot(Request::builder().uri("/exportcsv").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "No records found");
    }

    #[tokio::test]
    async fn export_streams_csv_attachment() {
        let app = test_router(vec![one_policy()], None);

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/pullpolicymetrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::builder().uri("/exportcsv").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=policy_data.csv"
        );

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Index,Policy ID,"));
        assert!(lines[1].starts_with("1,P1,"));
    }
}
