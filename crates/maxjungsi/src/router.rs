use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::catalog::ScoringCatalog;
use crate::error::AppError;
use crate::service::{AcademicRequest, FinalScoreRequest, PracticalRequest, ScoreService};

/// Router exposing the calculators over JSON.
pub fn score_router<C>(service: Arc<ScoreService<C>>) -> Router
where
    C: ScoringCatalog + 'static,
{
    Router::new()
        .route("/api/v1/calculate/suneung", post(academic_handler::<C>))
        .route(
            "/api/v1/calculate/silgi",
            post(practical_handler::<C>).get(events_handler::<C>),
        )
        .route("/api/v1/calculate/final", post(final_handler::<C>))
        .with_state(service)
}

pub(crate) async fn academic_handler<C>(
    State(service): State<Arc<ScoreService<C>>>,
    axum::Json(request): axum::Json<AcademicRequest>,
) -> Response
where
    C: ScoringCatalog + 'static,
{
    match service.academic(request) {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn practical_handler<C>(
    State(service): State<Arc<ScoreService<C>>>,
    axum::Json(request): axum::Json<PracticalRequest>,
) -> Response
where
    C: ScoringCatalog + 'static,
{
    match service.practical(request) {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn final_handler<C>(
    State(service): State<Arc<ScoreService<C>>>,
    axum::Json(request): axum::Json<FinalScoreRequest>,
) -> Response
where
    C: ScoringCatalog + 'static,
{
    match service.final_score(request) {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventQuery {
    #[serde(default)]
    uid: u32,
    #[serde(default)]
    year: Option<u16>,
}

pub(crate) async fn events_handler<C>(
    State(service): State<Arc<ScoreService<C>>>,
    Query(query): Query<EventQuery>,
) -> Response
where
    C: ScoringCatalog + 'static,
{
    match service.events(query.uid, query.year) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        let catalog = InMemoryCatalog::from_json_str(
            &json!({
                "score_configs": [
                    { "U_ID": 7, "학년도": 2026, "국어": 50, "수학": 50 },
                    { "U_ID": 8, "학년도": 2026, "국어": 50, "특수공식": "{kor_score} * abs" }
                ],
                "event_rows": [
                    { "U_ID": 7, "학년도": 2026, "종목명": "배근력", "기록": 200, "배점": 100 },
                    { "U_ID": 7, "학년도": 2026, "종목명": "배근력", "기록": 150, "배점": 50 }
                ]
            })
            .to_string(),
        )
        .expect("catalog loads");
        score_router(Arc::new(ScoreService::new(Arc::new(catalog))))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn suneung_route_returns_result_keys() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/calculate/suneung",
                json!({
                    "uid": 7,
                    "year": 2026,
                    "studentScore": {
                        "국어": { "percentile": 80 },
                        "수학": { "percentile": 90 }
                    }
                }),
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["result"]["국어점수"], json!(400.0));
        assert_eq!(body["result"]["수학점수"], json!(450.0));
        assert_eq!(body["result"]["총점"], json!(850.0));
        assert!(body["result"]["계산로그"].is_array());
    }

    #[tokio::test]
    async fn missing_configuration_is_not_found() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/calculate/suneung",
                json!({ "uid": 99, "year": 2026 }),
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json_body(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn invalid_formula_is_unprocessable() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/calculate/suneung",
                json!({ "uid": 8, "year": 2026 }),
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn silgi_route_rescales_records() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/calculate/silgi",
                json!({
                    "uid": 7,
                    "year": 2026,
                    "studentRecords": [{ "event": "배근력", "record": 160 }],
                    "practicalTotal": 400
                }),
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["result"]["총점"], json!(200.0));
        assert_eq!(body["result"]["종목별점수"][0]["maxScore"], json!(100.0));
        assert_eq!(body["hasScoreTable"], json!(true));
    }

    #[tokio::test]
    async fn silgi_listing_uses_query_parameters() {
        let response = router()
            .oneshot(
                Request::get("/api/v1/calculate/silgi?uid=7&year=2026")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["events"], json!(["배근력"]));
    }

    #[tokio::test]
    async fn missing_uid_is_bad_request() {
        let response = router()
            .oneshot(post_json("/api/v1/calculate/final", json!({ "year": 2026 })))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn final_route_sums_academic_and_practical() {
        let service = Arc::new(ScoreService::new(Arc::new(
            InMemoryCatalog::from_json_str(
                &json!({
                    "score_configs": [{ "U_ID": 7, "학년도": 2026, "국어": 100 }],
                    "event_rows": [{ "U_ID": 7, "학년도": 2026, "종목명": "배근력", "기록": 200, "배점": 100 }]
                })
                .to_string(),
            )
            .expect("catalog loads"),
        )));

        let response = final_handler(
            State(service),
            axum::Json(
                serde_json::from_value(json!({
                    "uid": 7,
                    "year": 2026,
                    "studentScore": { "국어": { "percentile": 50 } },
                    "studentRecords": [{ "event": "배근력", "record": 210 }]
                }))
                .expect("request parses"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["총점"], json!(600.0));
    }
}
