//! Route definitions for the API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::auth::{require_session, require_superuser, SESSION_COOKIE};
use crate::AppState;

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_obstacles,
        handlers::create_mission,
        handlers::list_missions,
        handlers::activate_mission,
        handlers::add_mission_obstacle,
        handlers::create_user,
        handlers::list_obstacle_accesses,
        handlers::health_check,
        handlers::login,
        handlers::logout,
    ),
    components(schemas(
        crate::api::types::StationaryObstacleReport,
        crate::api::types::ObstaclesResponse,
        crate::api::types::PositionBody,
        crate::api::types::CreateMissionRequest,
        crate::api::types::MissionResponse,
        crate::api::types::ListMissionsResponse,
        crate::api::types::CreateUserRequest,
        crate::api::types::ObstacleAccessEntry,
        crate::api::types::ObstacleAccessesResponse,
        crate::api::types::HealthResponse,
        crate::api::types::LoginRequest,
        crate::api::types::LoginResponse,
        crate::api::types::LogoutResponse,
        crate::api::types::UserInfo,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "obstacles", description = "Mission obstacle reporting"),
        (name = "missions", description = "Mission configuration administration"),
        (name = "users", description = "User accounts and access review"),
        (name = "auth", description = "Session login and logout"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "SUAS Interop API",
        version = "0.1.0",
        description = "Competition interop server - reports mission obstacles to aircraft and ground stations",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes for any logged-in user. Method checks run inside the session
    // layer, so only authenticated callers see 405.
    let session_routes = Router::new()
        .route("/api/obstacles", get(handlers::list_obstacles))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    // Mission and user administration (superusers only)
    let admin_routes = Router::new()
        .route(
            "/api/missions",
            get(handlers::list_missions).post(handlers::create_mission),
        )
        .route(
            "/api/missions/:id/activate",
            post(handlers::activate_mission),
        )
        .route(
            "/api/missions/:id/obstacles",
            post(handlers::add_mission_obstacle),
        )
        .route("/api/users", post(handlers::create_user))
        .route(
            "/api/users/:id/obstacle-accesses",
            get(handlers::list_obstacle_accesses),
        )
        .layer(middleware::from_fn(require_superuser))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout));

    Router::new()
        .merge(session_routes)
        .merge(admin_routes)
        .merge(public_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::SessionManager;
    use crate::domain::{GpsPosition, MissionConfig, StationaryObstacle, User};
    use crate::storage::InteropRepository;

    const OBSTACLE_URL: &str = "/api/obstacles";

    async fn empty_state() -> AppState {
        crate::logging::init_test();
        AppState {
            repository: InteropRepository::in_memory().await,
            sessions: SessionManager::new("test-secret-key", "suas-interop".to_string(), 12),
        }
    }

    async fn create_user(state: &AppState, username: &str, is_superuser: bool) -> User {
        let mut user = User::new(username.to_string(), "email@example.com".to_string(), "testpass");
        user.is_superuser = is_superuser;
        state.repository.create_user(&user).await.unwrap();
        user
    }

    async fn create_stationary_obstacle(
        state: &AppState,
        lat: f64,
        lon: f64,
        radius: f64,
        height: f64,
    ) -> StationaryObstacle {
        let gps = GpsPosition::new(lat, lon).unwrap();
        let obstacle = StationaryObstacle::new(gps, radius, height).unwrap();
        state
            .repository
            .create_stationary_obstacle(&obstacle)
            .await
            .unwrap();
        obstacle
    }

    /// Active mission at (10, 10) with two stationary obstacles, plus a
    /// logged-in regular user.
    async fn fixture() -> (AppState, User, String) {
        let state = empty_state().await;
        let user = create_user(&state, "testuser", false).await;
        let token = state.sessions.issue_token(&user).unwrap();

        let mut config = MissionConfig::at(GpsPosition::new(10.0, 10.0).unwrap());
        config.is_active = true;
        state.repository.create_mission_config(&config).await.unwrap();

        let obst = create_stationary_obstacle(&state, 38.142233, -76.434082, 300.0, 500.0).await;
        state
            .repository
            .add_obstacle_to_mission(config.id, obst.id)
            .await
            .unwrap();

        let obst = create_stationary_obstacle(&state, 38.442233, -76.834082, 100.0, 750.0).await;
        state
            .repository
            .add_obstacle_to_mission(config.id, obst.id)
            .await
            .unwrap();

        (state, user, token)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_not_authenticated() {
        let (state, _, _) = fixture().await;
        let app = build_router(state);

        let (status, _) = send(&app, get(OBSTACLE_URL, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_session() {
        let (state, _, _) = fixture().await;
        let app = build_router(state);

        let (status, body) = send(&app, get(OBSTACLE_URL, Some("not-a-token"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INVALID_SESSION");
    }

    #[tokio::test]
    async fn test_expired_session() {
        let (state, user, _) = fixture().await;
        // Two hours in the past, well beyond the validation leeway.
        let stale = SessionManager::new("test-secret-key", "suas-interop".to_string(), -2);
        let token = stale.issue_token(&user).unwrap();
        let app = build_router(state);

        let (status, body) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INVALID_SESSION");
    }

    #[tokio::test]
    async fn test_session_for_deleted_user() {
        let (state, _, _) = fixture().await;
        let ghost = User::new("ghost".into(), "ghost@example.com".into(), "pw");
        let token = state.sessions.issue_token(&ghost).unwrap();
        let app = build_router(state);

        let (status, _) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post() {
        let (state, _, token) = fixture().await;
        let app = build_router(state);

        let (status, _) = send(&app, post_json(OBSTACLE_URL, Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_correct_json() {
        let (state, user, token) = fixture().await;
        let app = build_router(state.clone());

        let (status, body) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        assert_eq!(status, StatusCode::OK);

        let obstacles = body["stationaryObstacles"].as_array().unwrap();
        assert_eq!(obstacles.len(), 2);
        for obstacle in obstacles {
            for field in ["latitude", "longitude", "radius", "height"] {
                assert!(obstacle[field].is_number(), "missing {field}");
            }
        }

        let logs = state
            .repository
            .list_obstacle_access_logs(user.id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_gets_identical() {
        let (state, user, token) = fixture().await;
        let app = build_router(state.clone());

        let (_, first) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        let (_, second) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        assert_eq!(first, second);

        let logs = state
            .repository
            .list_obstacle_access_logs(user.id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn test_no_active_mission() {
        let state = empty_state().await;
        let user = create_user(&state, "testuser", false).await;
        let token = state.sessions.issue_token(&user).unwrap();
        let app = build_router(state);

        let (status, body) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "NO_ACTIVE_MISSION");
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let (state, _, _) = fixture().await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/login",
                None,
                json!({"username": "testuser", "password": "testpass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let session = cookie.split(';').next().unwrap().to_string();
        assert!(session.starts_with("sessionid="));

        let request = Request::builder()
            .uri(OBSTACLE_URL)
            .header(header::COOKIE, session)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stationaryObstacles"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_login_token_works_as_bearer() {
        let (state, _, _) = fixture().await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            post_json(
                "/api/login",
                None,
                json!({"username": "testuser", "password": "testpass"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "testuser");
        assert_eq!(body["expiresIn"], 12 * 3600);

        let token = body["token"].as_str().unwrap().to_string();
        let (status, _) = send(&app, get(OBSTACLE_URL, Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let (state, _, _) = fixture().await;
        let app = build_router(state);

        let (status, _) = send(
            &app,
            post_json(
                "/api/login",
                None,
                json!({"username": "testuser", "password": "wrong"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json(
                "/api/login",
                None,
                json!({"username": "nobody", "password": "testpass"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let state = empty_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(post_json("/api/logout", None, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_missions_require_superuser() {
        let (state, _, token) = fixture().await;
        let app = build_router(state);

        let (status, _) = send(&app, get("/api/missions", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, get("/api/missions", None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_superuser_creates_and_activates_mission() {
        let (state, _, user_token) = fixture().await;
        let admin = create_user(&state, "judge", true).await;
        let admin_token = state.sessions.issue_token(&admin).unwrap();
        let app = build_router(state);

        let pos = json!({"latitude": 38.145, "longitude": -76.428});
        let (status, created) = send(
            &app,
            post_json(
                "/api/missions",
                Some(&admin_token),
                json!({
                    "homePos": pos,
                    "emergentLastKnownPos": pos,
                    "offAxisOdlcPos": pos,
                    "airDropPos": pos,
                    "stationaryObstacles": [
                        {"latitude": 38.14, "longitude": -76.43, "radius": 150.0, "height": 200.0}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["isActive"], false);

        // The original mission is still the one reported.
        let (_, body) = send(&app, get(OBSTACLE_URL, Some(&user_token))).await;
        assert_eq!(body["stationaryObstacles"].as_array().unwrap().len(), 2);

        let id = created["id"].as_str().unwrap();
        let (status, activated) = send(
            &app,
            post_json(
                &format!("/api/missions/{}/activate", id),
                Some(&admin_token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(activated["isActive"], true);

        let (_, body) = send(&app, get(OBSTACLE_URL, Some(&user_token))).await;
        let obstacles = body["stationaryObstacles"].as_array().unwrap();
        assert_eq!(obstacles.len(), 1);
        assert_eq!(obstacles[0]["radius"], 150.0);

        let (status, listed) = send(&app, get("/api/missions", Some(&admin_token))).await;
        assert_eq!(status, StatusCode::OK);
        let missions = listed["missions"].as_array().unwrap();
        assert_eq!(missions.len(), 2);
        assert_eq!(
            missions.iter().filter(|m| m["isActive"] == true).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_mission_rejects_bad_obstacle() {
        let state = empty_state().await;
        let admin = create_user(&state, "judge", true).await;
        let token = state.sessions.issue_token(&admin).unwrap();
        let app = build_router(state);

        let pos = json!({"latitude": 10.0, "longitude": 10.0});
        let (status, _) = send(
            &app,
            post_json(
                "/api/missions",
                Some(&token),
                json!({
                    "homePos": pos,
                    "emergentLastKnownPos": pos,
                    "offAxisOdlcPos": pos,
                    "airDropPos": pos,
                    "stationaryObstacles": [
                        {"latitude": 95.0, "longitude": 10.0, "radius": 10.0, "height": 10.0}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_activate_unknown_mission() {
        let state = empty_state().await;
        let admin = create_user(&state, "judge", true).await;
        let token = state.sessions.issue_token(&admin).unwrap();
        let app = build_router(state);

        let uri = format!("/api/missions/{}/activate", uuid::Uuid::new_v4());
        let (status, _) = send(&app, post_json(&uri, Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_superuser_attaches_obstacle() {
        let (state, _, user_token) = fixture().await;
        let admin = create_user(&state, "judge", true).await;
        let admin_token = state.sessions.issue_token(&admin).unwrap();
        let active = state.repository.get_active_mission().await.unwrap().unwrap();
        let app = build_router(state);

        let uri = format!("/api/missions/{}/obstacles", active.id);
        let obstacle = json!({"latitude": 38.2, "longitude": -76.5, "radius": 50.0, "height": 80.0});

        let (status, _) = send(&app, post_json(&uri, Some(&user_token), obstacle.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, mission) = send(&app, post_json(&uri, Some(&admin_token), obstacle)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(mission["stationaryObstacles"].as_array().unwrap().len(), 3);

        let (_, body) = send(&app, get(OBSTACLE_URL, Some(&user_token))).await;
        assert_eq!(body["stationaryObstacles"].as_array().unwrap().len(), 3);

        let bad = json!({"latitude": 38.2, "longitude": -76.5, "radius": 0.0, "height": 80.0});
        let (status, _) = send(&app, post_json(&uri, Some(&admin_token), bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = format!("/api/missions/{}/obstacles", uuid::Uuid::new_v4());
        let obstacle = json!({"latitude": 38.2, "longitude": -76.5, "radius": 50.0, "height": 80.0});
        let (status, _) = send(&app, post_json(&missing, Some(&admin_token), obstacle)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_superuser_creates_user_who_can_log_in() {
        let state = empty_state().await;
        let admin = create_user(&state, "judge", true).await;
        let admin_token = state.sessions.issue_token(&admin).unwrap();
        let app = build_router(state);

        let body = json!({"username": "team1", "email": "team1@example.com", "password": "pw1"});
        let (status, created) = send(&app, post_json("/api/users", Some(&admin_token), body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["username"], "team1");
        assert_eq!(created["isSuperuser"], false);

        let (status, _) = send(&app, post_json("/api/users", Some(&admin_token), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let blank_name = json!({"username": "  ", "email": "x@example.com", "password": "pw"});
        let (status, _) = send(&app, post_json("/api/users", Some(&admin_token), blank_name)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let no_password = json!({"username": "team2", "email": "x@example.com", "password": ""});
        let (status, _) = send(&app, post_json("/api/users", Some(&admin_token), no_password)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json("/api/login", None, json!({"username": "team1", "password": "pw1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_obstacle_accesses_reviewable() {
        let (state, user, user_token) = fixture().await;
        let admin = create_user(&state, "judge", true).await;
        let admin_token = state.sessions.issue_token(&admin).unwrap();
        let app = build_router(state);

        send(&app, get(OBSTACLE_URL, Some(&user_token))).await;
        send(&app, get(OBSTACLE_URL, Some(&user_token))).await;

        let uri = format!("/api/users/{}/obstacle-accesses", user.id);
        let (status, body) = send(&app, get(&uri, Some(&admin_token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "testuser");
        assert_eq!(body["accesses"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, get(&uri, Some(&user_token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let unknown = format!("/api/users/{}/obstacle-accesses", uuid::Uuid::new_v4());
        let (status, _) = send(&app, get(&unknown, Some(&admin_token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let state = empty_state().await;
        let app = build_router(state);

        let (status, body) = send(&app, get("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_health_degraded_without_database() {
        let state = empty_state().await;
        state.repository.pool().close().await;
        let app = build_router(state);

        let (status, body) = send(&app, get("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_ne!(body["database"], "connected");
    }
}
