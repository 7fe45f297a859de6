//! Access log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One successful read of the obstacle list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObstacleAccessLog {
    pub id: Uuid,
    /// User who read the obstacles.
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl ObstacleAccessLog {
    /// Record an access by `user_id` at the current time.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            timestamp: Utc::now(),
        }
    }
}
