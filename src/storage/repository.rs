//! Repository layer for database operations.

use sqlx::sqlite::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{GpsPosition, MissionConfig, ObstacleAccessLog, StationaryObstacle, User};
use crate::error::{InteropError, InteropResult};
use crate::storage::models::{
    parse_timestamp, parse_uuid, GpsPositionRow, MissionConfigRow, ObstacleAccessLogRow,
    StationaryObstacleRow, UserRow,
};

const OBSTACLE_COLUMNS: &str = r#"
    o.id AS id, o.gps_position_id AS gps_position_id,
    p.latitude AS latitude, p.longitude AS longitude,
    o.cylinder_radius AS cylinder_radius, o.cylinder_height AS cylinder_height,
    o.created_at AS created_at
"#;

/// Repository for all interop database operations.
#[derive(Clone)]
pub struct InteropRepository {
    pool: SqlitePool,
}

impl InteropRepository {
    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl InteropRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> InteropResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gps_positions (
                id TEXT PRIMARY KEY,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stationary_obstacles (
                id TEXT PRIMARY KEY,
                gps_position_id TEXT NOT NULL,
                cylinder_radius REAL NOT NULL,
                cylinder_height REAL NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (gps_position_id) REFERENCES gps_positions(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mission_configs (
                id TEXT PRIMARY KEY,
                is_active INTEGER NOT NULL DEFAULT 0,
                home_pos_id TEXT NOT NULL,
                emergent_last_known_pos_id TEXT NOT NULL,
                off_axis_odlc_pos_id TEXT NOT NULL,
                air_drop_pos_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (home_pos_id) REFERENCES gps_positions(id),
                FOREIGN KEY (emergent_last_known_pos_id) REFERENCES gps_positions(id),
                FOREIGN KEY (off_axis_odlc_pos_id) REFERENCES gps_positions(id),
                FOREIGN KEY (air_drop_pos_id) REFERENCES gps_positions(id)
            );

            CREATE INDEX IF NOT EXISTS idx_mission_configs_active ON mission_configs(is_active);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mission_stationary_obstacles (
                mission_id TEXT NOT NULL,
                obstacle_id TEXT NOT NULL,
                PRIMARY KEY (mission_id, obstacle_id),
                FOREIGN KEY (mission_id) REFERENCES mission_configs(id) ON DELETE CASCADE,
                FOREIGN KEY (obstacle_id) REFERENCES stationary_obstacles(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                is_superuser INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS obstacle_access_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_obstacle_access_logs_user ON obstacle_access_logs(user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Positions ====================

    /// Get a GPS position by ID.
    pub async fn get_gps_position(&self, id: Uuid) -> InteropResult<GpsPosition> {
        let row: GpsPositionRow = sqlx::query_as("SELECT * FROM gps_positions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| InteropError::NotFound(format!("GPS position {} not found", id)))?;

        row.try_into()
    }

    // ==================== Stationary Obstacles ====================

    /// Save a stationary obstacle and its centroid position.
    pub async fn create_stationary_obstacle(
        &self,
        obstacle: &StationaryObstacle,
    ) -> InteropResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_obstacle(&mut tx, obstacle).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Get a stationary obstacle by ID.
    pub async fn get_stationary_obstacle(&self, id: Uuid) -> InteropResult<StationaryObstacle> {
        let row: StationaryObstacleRow = sqlx::query_as(&format!(
            r#"
            SELECT {OBSTACLE_COLUMNS}
            FROM stationary_obstacles o
            JOIN gps_positions p ON o.gps_position_id = p.id
            WHERE o.id = ?
            "#
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| InteropError::NotFound(format!("Stationary obstacle {} not found", id)))?;

        row.try_into()
    }

    /// List the obstacles attached to a mission, oldest first.
    pub async fn list_mission_obstacles(
        &self,
        mission_id: Uuid,
    ) -> InteropResult<Vec<StationaryObstacle>> {
        let rows: Vec<StationaryObstacleRow> = sqlx::query_as(&format!(
            r#"
            SELECT {OBSTACLE_COLUMNS}
            FROM mission_stationary_obstacles m
            JOIN stationary_obstacles o ON m.obstacle_id = o.id
            JOIN gps_positions p ON o.gps_position_id = p.id
            WHERE m.mission_id = ?
            ORDER BY o.created_at ASC, o.id ASC
            "#
        ))
        .bind(mission_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    // ==================== Mission Configs ====================

    /// Save a mission configuration with its positions and obstacles.
    ///
    /// If the mission is marked active, every other mission is deactivated
    /// in the same transaction.
    pub async fn create_mission_config(&self, mission: &MissionConfig) -> InteropResult<()> {
        let mut tx = self.pool.begin().await?;

        for position in mission.positions() {
            insert_position(&mut tx, position).await?;
        }

        if mission.is_active {
            sqlx::query("UPDATE mission_configs SET is_active = 0 WHERE is_active = 1")
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO mission_configs (
                id, is_active, home_pos_id, emergent_last_known_pos_id,
                off_axis_odlc_pos_id, air_drop_pos_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(mission.id.to_string())
        .bind(if mission.is_active { 1 } else { 0 })
        .bind(mission.home_pos.id.to_string())
        .bind(mission.emergent_last_known_pos.id.to_string())
        .bind(mission.off_axis_odlc_pos.id.to_string())
        .bind(mission.air_drop_pos.id.to_string())
        .bind(mission.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for obstacle in &mission.stationary_obstacles {
            insert_obstacle(&mut tx, obstacle).await?;
            attach_obstacle(&mut tx, mission.id, obstacle.id).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Attach an existing obstacle to a mission. Attaching twice is a no-op.
    pub async fn add_obstacle_to_mission(
        &self,
        mission_id: Uuid,
        obstacle_id: Uuid,
    ) -> InteropResult<()> {
        self.get_mission_row(mission_id).await?;
        self.get_stationary_obstacle(obstacle_id).await?;

        let mut conn = self.pool.acquire().await?;
        attach_obstacle(&mut conn, mission_id, obstacle_id).await
    }

    /// Get a mission configuration by ID.
    pub async fn get_mission_config(&self, id: Uuid) -> InteropResult<MissionConfig> {
        let row = self.get_mission_row(id).await?;
        self.hydrate_mission(row).await
    }

    /// List all mission configurations, oldest first.
    pub async fn list_mission_configs(&self) -> InteropResult<Vec<MissionConfig>> {
        let rows: Vec<MissionConfigRow> =
            sqlx::query_as("SELECT * FROM mission_configs ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        let mut missions = Vec::with_capacity(rows.len());
        for row in rows {
            missions.push(self.hydrate_mission(row).await?);
        }

        Ok(missions)
    }

    /// Get the active mission configuration, if any.
    ///
    /// More than one active mission means the store was edited behind the
    /// repository's back and is reported as an internal error.
    pub async fn get_active_mission(&self) -> InteropResult<Option<MissionConfig>> {
        let mut rows: Vec<MissionConfigRow> =
            sqlx::query_as("SELECT * FROM mission_configs WHERE is_active = 1")
                .fetch_all(&self.pool)
                .await?;

        if rows.len() > 1 {
            return Err(InteropError::Internal(format!(
                "{} mission configurations are active",
                rows.len()
            )));
        }

        match rows.pop() {
            Some(row) => Ok(Some(self.hydrate_mission(row).await?)),
            None => Ok(None),
        }
    }

    /// Make the given mission the only active one.
    pub async fn activate_mission(&self, id: Uuid) -> InteropResult<MissionConfig> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE mission_configs SET is_active = 0 WHERE is_active = 1 AND id != ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE mission_configs SET is_active = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(InteropError::NotFound(format!("Mission {} not found", id)));
        }

        tx.commit().await?;

        self.get_mission_config(id).await
    }

    async fn get_mission_row(&self, id: Uuid) -> InteropResult<MissionConfigRow> {
        sqlx::query_as("SELECT * FROM mission_configs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| InteropError::NotFound(format!("Mission {} not found", id)))
    }

    async fn hydrate_mission(&self, row: MissionConfigRow) -> InteropResult<MissionConfig> {
        let id = parse_uuid(&row.id)?;

        Ok(MissionConfig {
            id,
            is_active: row.is_active != 0,
            home_pos: self.get_gps_position(parse_uuid(&row.home_pos_id)?).await?,
            emergent_last_known_pos: self
                .get_gps_position(parse_uuid(&row.emergent_last_known_pos_id)?)
                .await?,
            off_axis_odlc_pos: self
                .get_gps_position(parse_uuid(&row.off_axis_odlc_pos_id)?)
                .await?,
            air_drop_pos: self
                .get_gps_position(parse_uuid(&row.air_drop_pos_id)?)
                .await?,
            stationary_obstacles: self.list_mission_obstacles(id).await?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }

    // ==================== Users ====================

    /// Create a new user.
    pub async fn create_user(&self, user: &User) -> InteropResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_superuser, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(if user.is_superuser { 1 } else { 0 })
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                InteropError::BadRequest(format!("Username '{}' is taken", user.username)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a user, or refresh the email, password and role of an existing
    /// user with the same username. Returns the stored user.
    pub async fn upsert_user(&self, user: &User) -> InteropResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_superuser, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                email = excluded.email,
                password_hash = excluded.password_hash,
                is_superuser = excluded.is_superuser
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(if user.is_superuser { 1 } else { 0 })
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_user_by_username(&user.username)
            .await?
            .ok_or_else(|| InteropError::Internal(format!("User {} vanished", user.username)))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: Uuid) -> InteropResult<User> {
        let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| InteropError::NotFound(format!("User {} not found", id)))?;

        row.try_into()
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> InteropResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    // ==================== Access Logs ====================

    /// Record a read of the obstacle list.
    pub async fn record_obstacle_access(&self, log: &ObstacleAccessLog) -> InteropResult<()> {
        sqlx::query("INSERT INTO obstacle_access_logs (id, user_id, timestamp) VALUES (?, ?, ?)")
            .bind(log.id.to_string())
            .bind(log.user_id.to_string())
            .bind(log.timestamp.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// List a user's obstacle reads, oldest first.
    pub async fn list_obstacle_access_logs(
        &self,
        user_id: Uuid,
    ) -> InteropResult<Vec<ObstacleAccessLog>> {
        let rows: Vec<ObstacleAccessLogRow> = sqlx::query_as(
            "SELECT * FROM obstacle_access_logs WHERE user_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

/// Insert a position unless a row with the same ID already exists.
///
/// Missions commonly reuse one position for several references.
async fn insert_position(
    conn: &mut SqliteConnection,
    position: &GpsPosition,
) -> InteropResult<()> {
    sqlx::query("INSERT OR IGNORE INTO gps_positions (id, latitude, longitude) VALUES (?, ?, ?)")
        .bind(position.id.to_string())
        .bind(position.latitude)
        .bind(position.longitude)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_obstacle(
    conn: &mut SqliteConnection,
    obstacle: &StationaryObstacle,
) -> InteropResult<()> {
    insert_position(conn, &obstacle.gps_position).await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO stationary_obstacles (
            id, gps_position_id, cylinder_radius, cylinder_height, created_at
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(obstacle.id.to_string())
    .bind(obstacle.gps_position.id.to_string())
    .bind(obstacle.cylinder_radius)
    .bind(obstacle.cylinder_height)
    .bind(obstacle.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn attach_obstacle(
    conn: &mut SqliteConnection,
    mission_id: Uuid,
    obstacle_id: Uuid,
) -> InteropResult<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO mission_stationary_obstacles (mission_id, obstacle_id) VALUES (?, ?)",
    )
    .bind(mission_id.to_string())
    .bind(obstacle_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
impl InteropRepository {
    /// Fresh repository over a private in-memory database.
    ///
    /// Pinned to one connection: each SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> Self {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let repository = Self::new(pool);
        repository.init_schema().await.unwrap();
        repository
    }
}
