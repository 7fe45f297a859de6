//! User domain types.
//!
//! Represents competition teams and judges who log in to the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Login name, unique across users.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Password hash (SHA256 hex).
    #[serde(skip)]
    pub password_hash: String,
    /// Judges and operators; may administer missions.
    pub is_superuser: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a regular user from a plaintext password.
    pub fn new(username: String, email: String, password: &str) -> Self {
        Self::with_password_hash(username, email, hash_password(password), false)
    }

    /// Create a user from an already hashed password.
    pub fn with_password_hash(
        username: String,
        email: String,
        password_hash: String,
        is_superuser: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            is_superuser,
            created_at: Utc::now(),
        }
    }

    /// Verify a password against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(password) == self.password_hash
    }
}

/// Hash a password for storage/comparison.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
