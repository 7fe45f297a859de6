//! HTTP request handlers.

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, StatusCode},
    Extension, Json,
};
use uuid::Uuid;

use crate::api::types::*;
use crate::auth::SessionUser;
use crate::domain::{GpsPosition, MissionConfig, ObstacleAccessLog, StationaryObstacle, User};
use crate::error::{InteropError, InteropResult};
use crate::AppState;

// ==================== Obstacles ====================

/// List the stationary obstacles of the active mission.
///
/// GET /api/obstacles
#[utoipa::path(
    get,
    path = "/api/obstacles",
    responses(
        (status = 200, description = "Obstacles of the active mission", body = ObstaclesResponse),
        (status = 403, description = "Not logged in"),
        (status = 405, description = "Method not allowed"),
        (status = 500, description = "No active mission")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "obstacles"
)]
pub async fn list_obstacles(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> InteropResult<Json<ObstaclesResponse>> {
    let mission = state
        .repository
        .get_active_mission()
        .await?
        .ok_or(InteropError::NoActiveMission)?;

    state
        .repository
        .record_obstacle_access(&ObstacleAccessLog::new(user.id))
        .await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        mission_id = %mission.id,
        stationary_obstacles = mission.stationary_obstacles.len(),
        "Obstacles accessed"
    );

    Ok(Json(ObstaclesResponse::from(&mission)))
}

// ==================== Missions ====================

/// Create a mission configuration.
///
/// POST /api/missions
#[utoipa::path(
    post,
    path = "/api/missions",
    request_body = CreateMissionRequest,
    responses(
        (status = 201, description = "Mission created", body = MissionResponse),
        (status = 400, description = "Invalid position or obstacle"),
        (status = 403, description = "Not a superuser")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "missions"
)]
pub async fn create_mission(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(request): Json<CreateMissionRequest>,
) -> InteropResult<(StatusCode, Json<MissionResponse>)> {
    let position = |body: PositionBody| GpsPosition::new(body.latitude, body.longitude);

    let mut mission = MissionConfig::new(
        position(request.home_pos)?,
        position(request.emergent_last_known_pos)?,
        position(request.off_axis_odlc_pos)?,
        position(request.air_drop_pos)?,
    );
    mission.is_active = request.active;

    for obstacle in &request.stationary_obstacles {
        let centroid = GpsPosition::new(obstacle.latitude, obstacle.longitude)?;
        mission.stationary_obstacles.push(StationaryObstacle::new(
            centroid,
            obstacle.radius,
            obstacle.height,
        )?);
    }

    state.repository.create_mission_config(&mission).await?;

    tracing::info!(
        mission_id = %mission.id,
        active = mission.is_active,
        stationary_obstacles = mission.stationary_obstacles.len(),
        created_by = %user.username,
        "Mission created"
    );

    Ok((StatusCode::CREATED, Json(MissionResponse::from(&mission))))
}

/// List all mission configurations.
///
/// GET /api/missions
#[utoipa::path(
    get,
    path = "/api/missions",
    responses(
        (status = 200, description = "All missions", body = ListMissionsResponse),
        (status = 403, description = "Not a superuser")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "missions"
)]
pub async fn list_missions(
    State(state): State<AppState>,
) -> InteropResult<Json<ListMissionsResponse>> {
    let missions = state.repository.list_mission_configs().await?;

    Ok(Json(ListMissionsResponse {
        missions: missions.iter().map(MissionResponse::from).collect(),
    }))
}

/// Make a mission the single active one.
///
/// POST /api/missions/{id}/activate
#[utoipa::path(
    post,
    path = "/api/missions/{id}/activate",
    params(("id" = Uuid, Path, description = "Mission ID")),
    responses(
        (status = 200, description = "Mission activated", body = MissionResponse),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Mission not found")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "missions"
)]
pub async fn activate_mission(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> InteropResult<Json<MissionResponse>> {
    let mission = state.repository.activate_mission(id).await?;

    tracing::info!(mission_id = %id, activated_by = %user.username, "Mission activated");

    Ok(Json(MissionResponse::from(&mission)))
}

/// Create an obstacle and attach it to a mission.
///
/// POST /api/missions/{id}/obstacles
#[utoipa::path(
    post,
    path = "/api/missions/{id}/obstacles",
    params(("id" = Uuid, Path, description = "Mission ID")),
    request_body = StationaryObstacleReport,
    responses(
        (status = 201, description = "Obstacle attached", body = MissionResponse),
        (status = 400, description = "Invalid obstacle"),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Mission not found")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "missions"
)]
pub async fn add_mission_obstacle(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<StationaryObstacleReport>,
) -> InteropResult<(StatusCode, Json<MissionResponse>)> {
    // Validate before touching the store so a bad body never leaves an orphan.
    let centroid = GpsPosition::new(request.latitude, request.longitude)?;
    let obstacle = StationaryObstacle::new(centroid, request.radius, request.height)?;
    state.repository.get_mission_config(id).await?;

    state.repository.create_stationary_obstacle(&obstacle).await?;
    state.repository.add_obstacle_to_mission(id, obstacle.id).await?;

    tracing::info!(
        mission_id = %id,
        obstacle_id = %obstacle.id,
        added_by = %user.username,
        "Stationary obstacle attached"
    );

    let mission = state.repository.get_mission_config(id).await?;

    Ok((StatusCode::CREATED, Json(MissionResponse::from(&mission))))
}

// ==================== Users ====================

/// Create a user account.
///
/// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Missing fields or username taken"),
        (status = 403, description = "Not a superuser")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(SessionUser(admin)): Extension<SessionUser>,
    Json(request): Json<CreateUserRequest>,
) -> InteropResult<(StatusCode, Json<UserInfo>)> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(InteropError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let mut user = User::new(request.username, request.email, &request.password);
    user.is_superuser = request.is_superuser;
    state.repository.create_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        is_superuser = user.is_superuser,
        created_by = %admin.username,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(UserInfo::from(&user))))
}

/// List a user's reads of the obstacle endpoint.
///
/// GET /api/users/{id}/obstacle-accesses
#[utoipa::path(
    get,
    path = "/api/users/{id}/obstacle-accesses",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Obstacle reads, oldest first", body = ObstacleAccessesResponse),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "User not found")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_obstacle_accesses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> InteropResult<Json<ObstacleAccessesResponse>> {
    let user = state.repository.get_user(id).await?;
    let logs = state.repository.list_obstacle_access_logs(id).await?;

    Ok(Json(ObstacleAccessesResponse {
        user: UserInfo::from(&user),
        accesses: logs.iter().map(ObstacleAccessEntry::from).collect(),
    }))
}

// ==================== Health ====================

/// Health check endpoint.
///
/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service status; `degraded` when the database is unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match sqlx::query("SELECT 1")
        .fetch_one(state.repository.pool())
        .await
    {
        Ok(_) => ("healthy", "connected".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Health check database probe failed");
            ("degraded", format!("error: {}", e))
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ==================== Authentication ====================

/// Log in and start a session.
///
/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; sets the sessionid cookie", body = LoginResponse),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> InteropResult<([(axum::http::HeaderName, String); 1], Json<LoginResponse>)> {
    let user = state
        .repository
        .get_user_by_username(&request.username)
        .await?
        .filter(|user| user.verify_password(&request.password))
        .ok_or_else(|| {
            tracing::warn!(username = %request.username, "Failed login attempt");
            InteropError::BadRequest("Invalid credentials".to_string())
        })?;

    let token = state.sessions.issue_token(&user)?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok((
        [(SET_COOKIE, state.sessions.session_cookie(&token))],
        Json(LoginResponse {
            token,
            expires_in: state.sessions.session_duration_secs(),
            user: UserInfo::from(&user),
        }),
    ))
}

/// End the browser session.
///
/// POST /api/logout
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
) -> ([(axum::http::HeaderName, String); 1], Json<LogoutResponse>) {
    (
        [(SET_COOKIE, state.sessions.expired_cookie())],
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}
