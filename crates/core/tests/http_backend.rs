use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use flight_search_core::{
    render_results, FlightBackend, FlightError, HttpBackend, PollerConfig, SearchController,
    SearchId, SearchPhase, SearchQuery,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const READY_BODY: &str = r#"[
    {"search_id": "X", "proposals": []},
    {"proposals": [{
        "sign": "p1",
        "terms": {
            "9": {"price": 1500000, "currency": "uzs", "url": 9001},
            "12": {"price": 1400000, "currency": "uzs", "url": 1201}
        },
        "segment": [{"flight": [{
            "departure": "TAS", "arrival": "DXB",
            "departure_date": "2026-11-01", "departure_time": "08:40",
            "arrival_date": "2026-11-01", "arrival_time": "11:55",
            "marketing_carrier": "HY", "number": 251
        }]}]
    }],
     "airlines": {"HY": {"name": "Uzbekistan Airways"}}},
    {"gates_info": {"12": {"label": "Aviakassa"}}}
]"#;

async fn search(Json(body): Json<Value>) -> impl IntoResponse {
    match body["origin"].as_str() {
        Some("TAS") => {
            assert_eq!(body["depart_date"], "2026-11-01");
            assert_eq!(body["return_date"], "2026-11-10");
            (StatusCode::OK, Json(json!({"search_id": "X"})))
        }
        Some("NOID") => (StatusCode::OK, Json(json!({"meta": {}}))),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "bad input"})),
        ),
    }
}

async fn results(Path(search_id): Path<String>) -> impl IntoResponse {
    match search_id.as_str() {
        "X" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            READY_BODY.to_string(),
        ),
        "pending" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            r#"[{"search_id": "pending"}]"#.to_string(),
        ),
        "expired" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"error": "search expired"}"#.to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "boom".to_string(),
        ),
    }
}

async fn redirect(Json(body): Json<Value>) -> impl IntoResponse {
    assert_eq!(body["search_id"], "X");
    match body["terms_url"].as_str() {
        Some("9001") => (
            StatusCode::OK,
            Json(json!({"url": "https://agency.test/book/9001", "method": "GET"})),
        ),
        Some("missing") => (StatusCode::OK, Json(json!({"params": {}}))),
        _ => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": "click expired"})),
        ),
    }
}

async fn spawn_backend() -> HttpBackend {
    let router = Router::new()
        .route("/api/search", post(search))
        .route("/api/results/{search_id}", get(results))
        .route("/api/redirect", post(redirect));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let address = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock backend");
    });

    HttpBackend::new(&format!("http://{address}")).expect("backend")
}

fn query(origin: &str) -> SearchQuery {
    SearchQuery::new(
        origin,
        "DXB",
        NaiveDate::from_ymd_opt(2026, 11, 1).expect("date"),
        NaiveDate::from_ymd_opt(2026, 11, 10).expect("date"),
    )
    .expect("query")
}

#[tokio::test]
async fn submit_returns_the_search_id() {
    let backend = spawn_backend().await;
    let search_id = backend.submit_search(&query("TAS")).await.expect("submit");
    assert_eq!(search_id.as_str(), "X");
}

#[tokio::test]
async fn submit_surfaces_backend_error_text() {
    let backend = spawn_backend().await;
    let error = backend
        .submit_search(&query("XXX"))
        .await
        .expect_err("must fail");
    assert!(matches!(error, FlightError::BadResponse { .. }));
    assert!(error.to_string().contains("bad input"));
    assert_eq!(error.user_message(), "bad input");
}

#[tokio::test]
async fn submit_without_id_is_a_missing_field() {
    let backend = spawn_backend().await;
    let error = backend
        .submit_search(&query("NOID"))
        .await
        .expect_err("must fail");
    assert!(matches!(
        error,
        FlightError::MissingField {
            field: "search_id",
            ..
        }
    ));
}

#[tokio::test]
async fn results_parse_into_a_typed_bundle() {
    let backend = spawn_backend().await;
    let search_id = SearchId::from("X");

    let bundle = backend.fetch_results(&search_id).await.expect("results");
    assert!(bundle.is_ready());
    assert_eq!(
        bundle.airlines["HY"].name.as_deref(),
        Some("Uzbekistan Airways")
    );

    let view = render_results(&bundle, &search_id);
    let card = view.card(1).expect("card");
    assert_eq!(card.gate_id, "9");
    assert_eq!(card.terms_url, "9001");
    assert_eq!(card.gate_name, "Agentlik #9");
    assert_eq!(card.carrier, "Uzbekistan Airways");

    let pending = backend
        .fetch_results(&SearchId::from("pending"))
        .await
        .expect("pending results");
    assert!(!pending.is_ready());
}

#[tokio::test]
async fn results_errors_are_bad_responses() {
    let backend = spawn_backend().await;

    let expired = backend
        .fetch_results(&SearchId::from("expired"))
        .await
        .expect_err("error payload");
    assert!(expired.to_string().contains("search expired"));

    let broken = backend
        .fetch_results(&SearchId::from("broken"))
        .await
        .expect_err("server error");
    assert!(matches!(broken, FlightError::BadResponse { .. }));
    assert!(broken.to_string().contains("500"));
}

#[tokio::test]
async fn redirect_returns_the_purchase_link() {
    let backend = spawn_backend().await;
    let search_id = SearchId::from("X");

    let link = backend
        .request_redirect(&search_id, "9001")
        .await
        .expect("redirect");
    assert_eq!(link.url, "https://agency.test/book/9001");
    assert_eq!(link.method.as_deref(), Some("GET"));

    let missing = backend
        .request_redirect(&search_id, "missing")
        .await
        .expect_err("no url");
    assert!(matches!(missing, FlightError::MissingField { field: "url", .. }));

    let rejected = backend
        .request_redirect(&search_id, "other")
        .await
        .expect_err("rejected");
    assert!(rejected.to_string().contains("click expired"));
}

#[tokio::test]
async fn controller_runs_a_search_end_to_end() {
    let backend = Arc::new(spawn_backend().await);
    let config = PollerConfig::default().with_interval(Duration::from_millis(20));
    let controller = SearchController::new(backend, config);

    let search_id = controller.submit(&query("TAS")).await.expect("submit");
    let phase = controller.wait_until_settled().await;

    match phase {
        SearchPhase::Ready {
            search_id: ready_id,
            bundle,
        } => {
            assert_eq!(ready_id, search_id);
            assert_eq!(bundle.proposals.len(), 1);
        }
        other => panic!("expected ready phase, got {other:?}"),
    }
}
