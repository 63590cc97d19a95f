use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Task lifecycle. Stored and serialized with the exact spellings `To Do`
/// and `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    ToDo,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::Done => "Done",
        }
    }

    /// Case-sensitive; `done` is not a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "To Do" => Some(TaskStatus::ToDo),
            "Done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unrecognized task status {0:?}")]
pub struct InvalidStatus(pub String);

impl TryFrom<String> for TaskStatus {
    type Error = InvalidStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaskStatus::parse(&value).ok_or(InvalidStatus(value))
    }
}

/// Task priority, canonically lowercase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Baixa,
    #[default]
    Normal,
    Alta,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Baixa => "baixa",
            TaskPriority::Normal => "normal",
            TaskPriority::Alta => "alta",
        }
    }

    /// Accepts any casing; `ALTA` and `alta` are the same priority.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "baixa" => Some(TaskPriority::Baixa),
            "normal" => Some(TaskPriority::Normal),
            "alta" => Some(TaskPriority::Alta),
            _ => None,
        }
    }

    /// Missing and blank both fall back to the default, the same rule the
    /// listing filter applies. Anything non-blank must parse.
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, InvalidPriority> {
        match raw.filter(|s| !s.trim().is_empty()) {
            Some(raw) => TaskPriority::parse(raw).ok_or_else(|| InvalidPriority(raw.to_string())),
            None => Ok(TaskPriority::default()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unrecognized task priority {0:?}")]
pub struct InvalidPriority(pub String);

impl TryFrom<String> for TaskPriority {
    type Error = InvalidPriority;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaskPriority::parse(&value).ok_or(InvalidPriority(value))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub list_title: String,
    pub delivery_date: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub priority: TaskPriority,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Listing filters, all optional. Raw strings here; the gating rules live in
/// the query builder.
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub delivery_date: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub list_title: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub priority: Option<String>,
}

/// Partial task update. `description` and `delivery_date` map to nullable
/// columns, so they use the double-Option pattern: an absent field leaves
/// the column untouched, an explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub list_title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub delivery_date: Option<Option<NaiveDate>>,
    pub priority: Option<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
