use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and modification timestamps embedded in every stored entity.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        // clock skew must never produce an update older than the creation
        self.updated_at = if now < self.created_at { self.created_at } else { now };
    }
}
