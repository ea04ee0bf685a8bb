use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StudyLog {
    pub id: i64,
    pub user_id: Uuid,
    pub activity_type: String,
    pub description: Option<String>,
    pub duration: i32,
    pub xp_earned: i32,
    pub logged_at: chrono::DateTime<Utc>,
}

impl StudyLog {
    pub fn is_milestone(&self) -> bool {
        self.activity_type == ActivityType::Milestone.as_str()
    }
}

/// Values stored in `study_logs.activity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Reading,
    Listening,
    Grammar,
    Speaking,
    Milestone,
}

impl ActivityType {
    pub const ALL: [ActivityType; 5] = [
        ActivityType::Reading,
        ActivityType::Listening,
        ActivityType::Grammar,
        ActivityType::Speaking,
        ActivityType::Milestone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Reading => "Reading",
            ActivityType::Listening => "Listening",
            ActivityType::Grammar => "Grammar",
            ActivityType::Speaking => "Speaking",
            ActivityType::Milestone => "Milestone",
        }
    }

    /// Milestone rows are written by claims only.
    pub fn is_loggable(&self) -> bool {
        !matches!(self, ActivityType::Milestone)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid activity type: {}", s))
    }
}
