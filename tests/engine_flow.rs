//! In-process flow tests: the Visitdesk router against a fake record API

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use visitdesk_server::{
    api,
    config::{AppConfig, PersistenceBackend, RecordApiConfig},
    repository::Repository,
    services::{persistence::MemoryPersistence, Services},
    AppState,
};

#[derive(Debug, Clone)]
struct Recorded {
    path: &'static str,
    params: HashMap<String, String>,
    authorization: Option<String>,
}

#[derive(Clone)]
struct FakeRecords {
    total: usize,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeRecords {
    fn page(&self, path: &'static str, headers: &HeaderMap, params: HashMap<String, String>) -> Response {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            path,
            params: params.clone(),
            authorization: authorization.clone(),
        });

        if authorization.as_deref() == Some("Bearer expired") {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        let page: usize = params["page"].parse().unwrap();
        let size: usize = params["size"].parse().unwrap();
        let start = (page * size).min(self.total);
        let end = ((page + 1) * size).min(self.total);
        let content: Vec<Value> = (start..end)
            .map(|i| {
                json!({
                    "id": i + 1,
                    "storeName": format!("Store {}", i + 1),
                    "employeeName": "J. Doe",
                    "visit_date": "2024-01-02",
                    "checkinDate": "2024-01-02",
                    "checkinTime": "09:15:00"
                })
            })
            .collect();

        Json(json!({
            "content": content,
            "totalPages": self.total.div_ceil(size),
            "last": end >= self.total,
        }))
        .into_response()
    }
}

async fn by_date_sorted(
    State(fake): State<FakeRecords>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fake.page("getByDateSorted", &headers, params)
}

async fn for_team(
    State(fake): State<FakeRecords>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fake.page("getForTeam", &headers, params)
}

struct Harness {
    app: Router,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Harness {
    async fn start(total: usize) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let fake = FakeRecords {
            total,
            requests: requests.clone(),
        };
        let record_api = Router::new()
            .route("/visit/getByDateSorted", get(by_date_sorted))
            .route("/visit/getForTeam", get(for_team))
            .with_state(fake);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, record_api).await.unwrap();
        });

        let mut config = AppConfig::default();
        config.record_api = RecordApiConfig {
            base_url: format!("http://{}/", addr),
            timeout_seconds: 5,
        };
        config.export.page_size = 100;
        config.persistence.backend = PersistenceBackend::Memory;

        let repository = Repository::http(&config.record_api).unwrap();
        let services = Services::new(repository, Arc::new(MemoryPersistence::new()), &config);
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };

        Self {
            app: api::create_router(state),
            requests,
        }
    }

    fn take_requests(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<(&str, Option<&str>)>,
        session: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        if let Some((role, team)) = caller {
            builder = builder
                .header(header::AUTHORIZATION, "Bearer secret-token")
                .header("X-User-Role", role);
            if let Some(team) = team {
                builder = builder.header("X-Team-Id", team);
            }
        }
        if let Some(session) = session {
            builder = builder.header("X-Screen-Session", session);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.app.clone().oneshot(request).await.unwrap()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

const ADMIN: Option<(&str, Option<&str>)> = Some(("ADMIN", None));
const MANAGER_TEAM_7: Option<(&str, Option<&str>)> = Some(("MANAGER", Some("7")));

#[tokio::test]
async fn test_manager_with_team_is_routed_to_team_endpoint() {
    let harness = Harness::start(5).await;

    let response = harness
        .send(Method::POST, "/visits/session", MANAGER_TEAM_7, Some("m1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = harness
        .send(
            Method::PUT,
            "/visits/filters",
            MANAGER_TEAM_7,
            Some("m1"),
            Some(json!({ "employeeName": "J. Doe" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = harness
        .send(
            Method::PUT,
            "/visits/date-range",
            MANAGER_TEAM_7,
            Some("m1"),
            Some(json!({ "startDate": "2024-01-01", "endDate": "2024-01-10" })),
        )
        .await;
    let board = body_json(response).await;
    assert_eq!(board["strategy"], "team:7");
    assert_eq!(board["rows"].as_array().unwrap().len(), 5);
    assert_eq!(board["rows"][0]["status"], "On Going");

    let requests = harness.take_requests();
    assert!(!requests.is_empty());
    for request in &requests {
        assert_eq!(request.path, "getForTeam");
        assert_eq!(request.params.get("teamId").map(String::as_str), Some("7"));
        assert!(!request.params.contains_key("employeeName"));
        assert_eq!(request.authorization.as_deref(), Some("Bearer secret-token"));
    }
    let last = requests.last().unwrap();
    assert_eq!(last.params["startDate"], "2024-01-01");
    assert_eq!(last.params["endDate"], "2024-01-10");
    assert_eq!(last.params["page"], "0");
    assert_eq!(last.params["size"], "10");
}

#[tokio::test]
async fn test_admin_is_routed_to_direct_endpoint() {
    let harness = Harness::start(5).await;

    harness
        .send(Method::POST, "/visits/session", ADMIN, Some("a1"), None)
        .await;
    let response = harness
        .send(
            Method::PUT,
            "/visits/filters",
            ADMIN,
            Some("a1"),
            Some(json!({ "employeeName": "J. Doe", "purpose": "Audit" })),
        )
        .await;
    let board = body_json(response).await;
    assert_eq!(board["strategy"], "direct");

    let requests = harness.take_requests();
    assert!(requests.iter().all(|r| r.path == "getByDateSorted"));
    let last = requests.last().unwrap();
    assert_eq!(last.params["employeeName"], "j. doe");
    assert_eq!(last.params["purpose"], "audit");
    assert_eq!(last.params["sort"], "id,desc");
}

#[tokio::test]
async fn test_manager_without_team_issues_no_request() {
    let harness = Harness::start(5).await;

    let response = harness
        .send(Method::POST, "/visits/session", Some(("MANAGER", None)), Some("m2"), None)
        .await;
    let board = body_json(response).await;
    assert_eq!(board["strategy"], "disabled");
    assert_eq!(board["rows"], json!([]));
    assert!(harness.take_requests().is_empty());
}

#[tokio::test]
async fn test_export_downloads_every_page_as_csv() {
    let harness = Harness::start(250).await;

    harness
        .send(Method::POST, "/visits/session", ADMIN, Some("e1"), None)
        .await;
    harness
        .send(
            Method::PUT,
            "/visits/columns",
            ADMIN,
            Some("e1"),
            Some(json!({ "columns": ["storeName", "outcome", "id"] })),
        )
        .await;
    harness.take_requests();

    let response = harness
        .send(Method::GET, "/visits/export", ADMIN, Some("e1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv;charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"visits.csv\""
    );

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 251);
    assert_eq!(lines[0], "Customer Name,Visit ID");
    assert_eq!(lines[1], "Store 1,1");
    assert_eq!(lines[250], "Store 250,250");

    let pages: Vec<String> = harness
        .take_requests()
        .into_iter()
        .map(|r| {
            assert_eq!(r.params["size"], "100");
            r.params["page"].clone()
        })
        .collect();
    assert_eq!(pages, vec!["0", "1", "2"]);
}

#[tokio::test]
async fn test_window_over_thirty_days_is_rejected() {
    let harness = Harness::start(5).await;

    let mounted = body_json(
        harness
            .send(Method::POST, "/visits/session", ADMIN, Some("v1"), None)
            .await,
    )
    .await;

    let response = harness
        .send(
            Method::PUT,
            "/visits/date-range",
            ADMIN,
            Some("v1"),
            Some(json!({ "startDate": "2024-01-01", "endDate": "2024-02-15" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], 5);

    let board = body_json(
        harness
            .send(Method::GET, "/visits/board", ADMIN, Some("v1"), None)
            .await,
    )
    .await;
    assert_eq!(board["filters"], mounted["filters"]);
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let harness = Harness::start(5).await;

    let response = harness
        .send(Method::POST, "/visits/session", None, Some("x1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], 2);
    assert!(harness.take_requests().is_empty());
}

#[tokio::test]
async fn test_rejected_token_is_not_authorized() {
    let harness = Harness::start(5).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/visits/session")
        .header(header::AUTHORIZATION, "Bearer expired")
        .header("X-User-Role", "ADMIN")
        .body(Body::empty())
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], 3);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let harness = Harness::start(5).await;

    let response = harness
        .send(Method::GET, "/visits", ADMIN, Some("nobody"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_navigation_context_seeds_next_mount() {
    let harness = Harness::start(3).await;

    let response = harness
        .send(
            Method::PUT,
            "/visits/navigation",
            None,
            Some("n1"),
            Some(json!({ "selectedDate": "2024-03-05", "employeeName": "J. Doe" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let board = body_json(
        harness
            .send(Method::POST, "/visits/session", ADMIN, Some("n1"), None)
            .await,
    )
    .await;
    assert_eq!(board["fromNavigation"], true);
    assert_eq!(board["filters"]["startDate"], "2024-03-05");
    assert_eq!(board["filters"]["endDate"], "2024-03-05");
    assert_eq!(board["filters"]["employeeName"], "J. Doe");

    let requests = harness.take_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].params["employeeName"], "j. doe");
    assert_eq!(requests[0].params["startDate"], "2024-03-05");
}

#[tokio::test]
async fn test_filters_survive_unmount() {
    let harness = Harness::start(3).await;

    harness
        .send(Method::POST, "/visits/session", ADMIN, Some("p1"), None)
        .await;
    let changed = body_json(
        harness
            .send(
                Method::PUT,
                "/visits/sort",
                ADMIN,
                Some("p1"),
                Some(json!({ "column": "storeName" })),
            )
            .await,
    )
    .await;
    assert_eq!(changed["filters"]["sortColumn"], "storeName");
    assert_eq!(changed["filters"]["sortDirection"], "asc");

    let response = harness
        .send(Method::DELETE, "/visits/session", None, Some("p1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let remounted = body_json(
        harness
            .send(Method::POST, "/visits/session", ADMIN, Some("p1"), None)
            .await,
    )
    .await;
    assert_eq!(remounted["filters"], changed["filters"]);
}

#[tokio::test]
async fn test_column_catalogue() {
    let harness = Harness::start(0).await;

    let columns = body_json(
        harness
            .send(Method::GET, "/visits/columns", None, None, None)
            .await,
    )
    .await;
    let columns = columns.as_array().unwrap();
    assert_eq!(columns.len(), 15);

    let outcome = columns.iter().find(|c| c["key"] == "outcome").unwrap();
    assert_eq!(outcome["exportable"], false);
    assert_eq!(outcome["default"], true);

    let store = columns.iter().find(|c| c["key"] == "storeName").unwrap();
    assert_eq!(store["label"], "Customer Name");
    assert_eq!(store["sortable"], true);
}

#[tokio::test]
async fn test_readiness_with_memory_store() {
    let harness = Harness::start(0).await;

    let response = harness.send(Method::GET, "/ready", None, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["filter_store"], "memory");

    let response = harness.send(Method::GET, "/health", None, None, None).await;
    assert_eq!(body_json(response).await["filter_store"], "memory");
}
