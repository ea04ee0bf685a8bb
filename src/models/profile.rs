use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
    pub xp: i32,
    pub level: i32,
    pub study_hours: f64,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Anonymous")
    }
}

#[derive(sqlx::FromRow, Debug)]
pub struct ProfileName {
    pub id: Uuid,
    pub username: Option<String>,
}
