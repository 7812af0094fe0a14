//! HTTP handler functions for the visitor map API.

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, http::header::ContentType, web};
use chrono::Utc;
use uuid::Uuid;
use visitor_map_boundary::load_boundaries;
use visitor_map_overlay::VisualizationMode;
use visitor_map_population_models::HourKey;
use visitor_map_server_models::{
    ApiError, ApiHealth, ApiUploadResult, ApiWarning, RenderQueryParams, SessionQueryParams,
};

use crate::AppState;
use crate::dashboard::{
    DEFAULT_HOUR, DashboardError, MISSING_BOUNDARIES_WARNING, RenderOutcome, RenderRequest,
    default_date,
};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/config`
///
/// Returns the district name, initial map view, and input defaults.
pub async fn dashboard_config(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dashboard.config())
}

/// `POST /api/boundaries`
///
/// Opens a session holding the `GeoJSON` boundaries in the request body
/// and returns its token. Only tracts inside the district allow-list are
/// kept. A `session` query parameter names a previous upload to replace.
pub async fn upload_boundaries(
    state: web::Data<AppState>,
    params: web::Query<SessionQueryParams>,
    body: web::Bytes,
) -> HttpResponse {
    let prefixes = &state.dashboard.district().tract_prefixes;
    match load_boundaries(&body, prefixes) {
        Ok(set) => {
            if let Some(previous) = session_id(params.session.as_deref()) {
                state.sessions.close(&previous);
            }
            let tract_count = set.len();
            let session = state.sessions.open(set, Utc::now());
            log::info!(
                "Loaded boundary file ({} bytes) into session {session}: {tract_count} district tracts",
                body.len()
            );
            HttpResponse::Ok().json(ApiUploadResult {
                tract_count,
                session: session.to_string(),
            })
        }
        Err(e) => {
            log::warn!("Rejected boundary file: {e}");
            bad_request(e.to_string())
        }
    }
}

/// `DELETE /api/boundaries?session=...`
///
/// Ends an upload session. Ending an unknown or expired session succeeds.
pub async fn clear_boundaries(
    state: web::Data<AppState>,
    params: web::Query<SessionQueryParams>,
) -> HttpResponse {
    let Some(id) = session_id(params.session.as_deref()) else {
        return bad_request("Missing or malformed session token".to_string());
    };
    if state.sessions.close(&id) {
        log::info!("Closed boundary session {id}");
    }
    HttpResponse::NoContent().finish()
}

/// `GET /api/render`
///
/// Renders the selected date, hour, and mode over the session's boundary
/// set. Answers 412 with a warning when the request names no live session
/// and 502 when the open-data API fails.
pub async fn render(
    state: web::Data<AppState>,
    params: web::Query<RenderQueryParams>,
) -> HttpResponse {
    let mode = match params.mode.as_deref() {
        None => VisualizationMode::default(),
        Some(value) => match value.parse() {
            Ok(mode) => mode,
            Err(_) => return bad_request(format!("Unknown mode '{value}'")),
        },
    };

    let key = match HourKey::new(
        params.date.unwrap_or_else(default_date),
        params.hour.unwrap_or(DEFAULT_HOUR),
    ) {
        Ok(key) => key,
        Err(e) => return bad_request(e.to_string()),
    };

    let boundaries =
        session_id(params.session.as_deref()).and_then(|id| state.sessions.get(&id, Utc::now()));
    match state
        .dashboard
        .render(boundaries.as_deref(), RenderRequest { key, mode })
        .await
    {
        Ok(RenderOutcome::Rendered(render)) => HttpResponse::Ok().json(render),
        Ok(RenderOutcome::MissingBoundaries) => HttpResponse::PreconditionFailed().json(ApiWarning {
            warning: MISSING_BOUNDARIES_WARNING.to_string(),
        }),
        Err(DashboardError::Population(e)) => {
            log::error!("Failed to fetch population data: {e}");
            HttpResponse::BadGateway().json(ApiError {
                error: e.to_string(),
            })
        }
        Err(e @ DashboardError::Overlay(_)) => {
            log::error!("Failed to build overlay: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: e.to_string(),
            })
        }
    }
}

/// Turns query string errors into a JSON 400 like the handlers' own.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let error = err.to_string();
    InternalError::from_response(err, bad_request(error)).into()
}

fn session_id(token: Option<&str>) -> Option<Uuid> {
    token.and_then(|token| Uuid::parse_str(token.trim()).ok())
}

fn bad_request(error: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError { error })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::Value;

    use crate::test_support::{FakeSource, dashboard, geojson};
    use crate::{AppState, configure};

    const TRACT: &str = "1104065010001";

    fn state(source: FakeSource) -> web::Data<AppState> {
        web::Data::new(AppState::new(dashboard(Arc::new(source))))
    }

    fn upload(tracts: &[&str]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/boundaries")
            .set_payload(geojson(tracts))
    }

    fn session_of(body: &Value) -> String {
        body["session"].as_str().unwrap().to_string()
    }

    #[actix_web::test]
    async fn render_without_boundaries_warns() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![(TRACT, "10")])))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/render").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["warning"], "Upload a boundary GeoJSON file.");
        assert!(body.get("map").is_none());
    }

    #[actix_web::test]
    async fn upload_then_render_heatmap() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![(TRACT, "120")])))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/boundaries")
            .set_payload(geojson(&[TRACT, "1102052010001"]))
            .to_request();
        let uploaded: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(uploaded["tractCount"], 1);
        let session = session_of(&uploaded);

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/render?date=2025-09-05&hour=14&mode=heatmap&session={session}"
            ))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mode"], "heatmap");
        assert_eq!(body["recordCount"], 1);
        assert_eq!(body["map"]["overlay"]["kind"], "heatmap");
        assert_eq!(body["map"]["overlay"]["points"][0][2], 120.0);
        assert_eq!(body["map"]["outline"]["color"], "white");
        assert_eq!(body["records"][0]["OA_CD"], TRACT);
    }

    #[actix_web::test]
    async fn other_sessions_do_not_see_an_upload() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![(TRACT, "10")])))
                .configure(configure),
        )
        .await;

        let body: Value = test::call_and_read_body_json(&app, upload(&[TRACT]).to_request()).await;
        let session = session_of(&body);
        let req = test::TestRequest::get()
            .uri(&format!("/api/render?session={session}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        for uri in [
            "/api/render".to_string(),
            format!("/api/render?session={}", uuid::Uuid::new_v4()),
            "/api/render?session=not-a-token".to_string(),
        ] {
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED, "{uri}");
        }
    }

    #[actix_web::test]
    async fn reupload_replaces_previous_session() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![(TRACT, "10")])))
                .configure(configure),
        )
        .await;

        let body: Value = test::call_and_read_body_json(&app, upload(&[TRACT]).to_request()).await;
        let first = session_of(&body);
        let req = test::TestRequest::post()
            .uri(&format!("/api/boundaries?session={first}"))
            .set_payload(geojson(&[TRACT]))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_ne!(first, session_of(&body));

        let req = test::TestRequest::get()
            .uri(&format!("/api/render?session={first}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[actix_web::test]
    async fn rejects_bad_render_params_with_json() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![])))
                .configure(configure),
        )
        .await;

        for uri in [
            "/api/render?hour=24",
            "/api/render?hour=300",
            "/api/render?mode=contour",
            "/api/render?date=2025-13-40",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body: Value = test::read_body_json(resp).await;
            assert!(body["error"].is_string(), "{uri} returned {body}");
        }
    }

    #[actix_web::test]
    async fn rejects_malformed_upload() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![])))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/boundaries")
            .set_payload("not geojson")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn remote_failure_is_bad_gateway() {
        let source = FakeSource {
            failing_hour: Some(14),
            ..FakeSource::new(vec![(TRACT, "10")])
        };
        let app = test::init_service(App::new().app_data(state(source)).configure(configure)).await;

        let body: Value = test::call_and_read_body_json(&app, upload(&[TRACT]).to_request()).await;
        let session = session_of(&body);
        let req = test::TestRequest::get()
            .uri(&format!("/api/render?hour=14&session={session}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn closing_session_restores_warning() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![(TRACT, "10")])))
                .configure(configure),
        )
        .await;

        let body: Value = test::call_and_read_body_json(&app, upload(&[TRACT]).to_request()).await;
        let session = session_of(&body);

        let req = test::TestRequest::get().uri("/api/config").to_request();
        let config: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(config["defaultHour"], 14);
        assert_eq!(config["defaultDate"], "2025-09-05");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/boundaries?session={session}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/render?session={session}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

        let req = test::TestRequest::delete().uri("/api/boundaries").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn serves_index_page() {
        let app = test::init_service(
            App::new()
                .app_data(state(FakeSource::new(vec![])))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("leaflet"));
        // records and errors are written as text, never parsed as markup
        assert!(!html.contains("innerHTML"));
        assert!(html.contains("resp.text()"));
        assert!(html.contains("params.set(\"session\", session)"));
        assert!(html.contains("keepalive: true"));
    }
}
