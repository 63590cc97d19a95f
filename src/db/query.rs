use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::task::{ListTasksQuery, TaskPriority, TaskStatus, UpdateTaskRequest};
use crate::utils::validation::is_date_literal;

/// The only identifiers that may ever appear in generated SQL. Everything
/// user-supplied travels as a bound parameter; column names come from this
/// closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskColumn {
    Title,
    Description,
    Status,
    ListTitle,
    DeliveryDate,
    Priority,
    CreatedAt,
}

impl TaskColumn {
    pub fn name(self) -> &'static str {
        match self {
            TaskColumn::Title => "title",
            TaskColumn::Description => "description",
            TaskColumn::Status => "status",
            TaskColumn::ListTitle => "list_title",
            TaskColumn::DeliveryDate => "delivery_date",
            TaskColumn::Priority => "priority",
            TaskColumn::CreatedAt => "created_at",
        }
    }

    /// Sortable subset. `list_title` is absent on purpose; it only takes
    /// part in the default order.
    fn from_sort_key(key: &str) -> Option<Self> {
        match key {
            "title" => Some(TaskColumn::Title),
            "status" => Some(TaskColumn::Status),
            "priority" => Some(TaskColumn::Priority),
            "delivery_date" => Some(TaskColumn::DeliveryDate),
            "created_at" => Some(TaskColumn::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }
}

/// A value destined for a `$n` placeholder. The Option layers carry SQL NULL
/// for the nullable columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Uuid(Uuid),
}

impl Bind {
    fn text(value: impl Into<String>) -> Self {
        Bind::Text(Some(value.into()))
    }
}

/// One validated filter condition. Each variant knows its own SQL shape.
#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// Case-insensitive substring match over title or description.
    Search(String),
    Status(String),
    Priority(String),
    /// Lexical date literal, compared against the column rendered as text so
    /// pattern-valid non-dates reach Postgres without a cast error.
    DeliveryDate(String),
}

/// Fully validated description of a listing query over one account's tasks.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    user_id: Uuid,
    predicates: Vec<Predicate>,
    order: Vec<(TaskColumn, Direction)>,
}

impl TaskFilter {
    /// Applies the gating rules: blank filters are skipped, a malformed
    /// delivery date is dropped silently, and an unrecognized sort falls
    /// back to the default order.
    pub fn from_query(user_id: Uuid, params: &ListTasksQuery) -> Self {
        let mut predicates = Vec::new();

        if let Some(search) = nonblank(params.search.as_deref()) {
            predicates.push(Predicate::Search(search.to_string()));
        }
        if let Some(status) = nonblank(params.status.as_deref()) {
            predicates.push(Predicate::Status(status.to_string()));
        }
        if let Some(priority) = nonblank(params.priority.as_deref()) {
            predicates.push(Predicate::Priority(priority.to_string()));
        }
        if let Some(date) = params.delivery_date.as_deref() {
            if is_date_literal(date) {
                predicates.push(Predicate::DeliveryDate(date.to_string()));
            }
        }

        let order = params
            .sort_by
            .as_deref()
            .and_then(parse_sort)
            .map(|key| vec![key])
            .unwrap_or_else(default_order);

        Self {
            user_id,
            predicates,
            order,
        }
    }

    /// Renders `SELECT * FROM tasks ...` with `$n` placeholders. The owner
    /// predicate is unconditional and always `$1`.
    pub fn render(&self) -> (String, Vec<Bind>) {
        let mut sql = String::from("SELECT * FROM tasks WHERE user_id = $1");
        let mut binds = vec![Bind::Uuid(self.user_id)];

        for predicate in &self.predicates {
            let n = binds.len() + 1;
            match predicate {
                Predicate::Search(term) => {
                    sql.push_str(&format!(
                        " AND (LOWER(title) LIKE ${n} OR LOWER(description) LIKE ${n})"
                    ));
                    binds.push(Bind::text(format!("%{}%", term.to_lowercase())));
                }
                Predicate::Status(value) => {
                    sql.push_str(&format!(" AND status = ${n}"));
                    binds.push(Bind::text(value.clone()));
                }
                Predicate::Priority(value) => {
                    sql.push_str(&format!(" AND priority = ${n}"));
                    binds.push(Bind::text(value.clone()));
                }
                Predicate::DeliveryDate(value) => {
                    sql.push_str(&format!(" AND delivery_date::text = ${n}"));
                    binds.push(Bind::text(value.clone()));
                }
            }
        }

        sql.push_str(" ORDER BY ");
        let order = self
            .order
            .iter()
            .map(|(column, direction)| format!("{} {}", column.name(), direction.keyword()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&order);

        (sql, binds)
    }
}

fn nonblank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// `field:direction`, both parts checked against closed sets. Anything else,
/// including a value with no colon at all, yields None.
fn parse_sort(raw: &str) -> Option<(TaskColumn, Direction)> {
    let (field, direction) = raw.split_once(':')?;
    Some((TaskColumn::from_sort_key(field)?, Direction::parse(direction)?))
}

fn default_order() -> Vec<(TaskColumn, Direction)> {
    vec![
        (TaskColumn::ListTitle, Direction::Asc),
        (TaskColumn::CreatedAt, Direction::Desc),
    ]
}

#[derive(Debug, Error, PartialEq)]
pub enum ChangesetError {
    #[error("No fields provided for update")]
    NoFieldsProvided,
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),
}

/// Validated column assignments for a partial task update.
#[derive(Debug, Clone)]
pub struct TaskChangeset {
    assignments: Vec<(TaskColumn, Bind)>,
}

impl TaskChangeset {
    pub fn from_request(req: &UpdateTaskRequest) -> Result<Self, ChangesetError> {
        let mut assignments = Vec::new();

        if let Some(title) = &req.title {
            assignments.push((TaskColumn::Title, Bind::text(title.clone())));
        }
        if let Some(description) = &req.description {
            assignments.push((TaskColumn::Description, Bind::Text(description.clone())));
        }
        if let Some(status) = &req.status {
            let status = TaskStatus::parse(status)
                .ok_or_else(|| ChangesetError::InvalidStatus(status.clone()))?;
            assignments.push((TaskColumn::Status, Bind::text(status.as_str())));
        }
        if let Some(list_title) = &req.list_title {
            assignments.push((TaskColumn::ListTitle, Bind::text(list_title.clone())));
        }
        if let Some(delivery_date) = &req.delivery_date {
            assignments.push((TaskColumn::DeliveryDate, Bind::Date(*delivery_date)));
        }
        if let Some(priority) = &req.priority {
            let priority = TaskPriority::parse(priority)
                .ok_or_else(|| ChangesetError::InvalidPriority(priority.clone()))?;
            assignments.push((TaskColumn::Priority, Bind::text(priority.as_str())));
        }

        if assignments.is_empty() {
            return Err(ChangesetError::NoFieldsProvided);
        }

        Ok(Self { assignments })
    }

    /// Renders `UPDATE tasks SET ... RETURNING *`. The ownership predicate
    /// is part of the render, not the caller's responsibility, so it cannot
    /// be forgotten.
    pub fn render_update(&self, task_id: Uuid, user_id: Uuid) -> (String, Vec<Bind>) {
        let mut sql = String::from("UPDATE tasks SET ");
        let mut binds: Vec<Bind> = Vec::with_capacity(self.assignments.len() + 2);

        for (i, (column, bind)) in self.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("{} = ${}", column.name(), i + 1));
            binds.push(bind.clone());
        }

        sql.push_str(&format!(
            " WHERE id = ${} AND user_id = ${} RETURNING *",
            binds.len() + 1,
            binds.len() + 2
        ));
        binds.push(Bind::Uuid(task_id));
        binds.push(Bind::Uuid(user_id));

        (sql, binds)
    }
}

/// Applies rendered binds, in order, to a `query_as` over the rendered SQL.
pub fn bind_all<O>(
    sql: &str,
    binds: Vec<Bind>,
) -> sqlx::query::QueryAs<'_, sqlx::Postgres, O, sqlx::postgres::PgArguments>
where
    O: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    let mut query = sqlx::query_as(sql);
    for bind in binds {
        query = match bind {
            Bind::Text(value) => query.bind(value),
            Bind::Date(value) => query.bind(value),
            Bind::Uuid(value) => query.bind(value),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn bare_listing_scopes_to_owner_with_default_order() {
        let id = owner();
        let (sql, binds) = TaskFilter::from_query(id, &ListTasksQuery::default()).render();

        assert_eq!(
            sql,
            "SELECT * FROM tasks WHERE user_id = $1 \
             ORDER BY list_title ASC, created_at DESC"
        );
        assert_eq!(binds, vec![Bind::Uuid(id)]);
    }

    #[test]
    fn search_lowercases_and_wraps_one_shared_parameter() {
        let params = ListTasksQuery {
            search: Some("Relatório".to_string()),
            ..Default::default()
        };
        let (sql, binds) = TaskFilter::from_query(owner(), &params).render();

        assert!(sql.contains("AND (LOWER(title) LIKE $2 OR LOWER(description) LIKE $2)"));
        assert_eq!(binds[1], Bind::Text(Some("%relatório%".to_string())));
    }

    #[test]
    fn blank_filters_are_skipped() {
        let params = ListTasksQuery {
            search: Some("   ".to_string()),
            status: Some(String::new()),
            priority: Some(" ".to_string()),
            ..Default::default()
        };
        let (sql, binds) = TaskFilter::from_query(owner(), &params).render();

        assert!(!sql.contains("LIKE"));
        assert!(!sql.contains("status ="));
        assert!(!sql.contains("priority ="));
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn all_filters_number_their_placeholders_in_order() {
        let params = ListTasksQuery {
            search: Some("mercado".to_string()),
            status: Some("To Do".to_string()),
            priority: Some("alta".to_string()),
            delivery_date: Some("2026-09-01".to_string()),
            ..Default::default()
        };
        let (sql, binds) = TaskFilter::from_query(owner(), &params).render();

        assert_eq!(
            sql,
            "SELECT * FROM tasks WHERE user_id = $1 \
             AND (LOWER(title) LIKE $2 OR LOWER(description) LIKE $2) \
             AND status = $3 AND priority = $4 AND delivery_date::text = $5 \
             ORDER BY list_title ASC, created_at DESC"
        );
        assert_eq!(binds.len(), 5);
        assert_eq!(binds[4], Bind::Text(Some("2026-09-01".to_string())));
    }

    #[test]
    fn pattern_valid_non_calendar_date_is_kept_as_text_comparison() {
        let params = ListTasksQuery {
            delivery_date: Some("2024-13-40".to_string()),
            ..Default::default()
        };
        let (sql, binds) = TaskFilter::from_query(owner(), &params).render();

        assert!(sql.contains("delivery_date::text = $2"));
        assert_eq!(binds[1], Bind::Text(Some("2024-13-40".to_string())));
    }

    #[test]
    fn malformed_date_filter_is_dropped_silently() {
        let params = ListTasksQuery {
            delivery_date: Some("next tuesday".to_string()),
            ..Default::default()
        };
        let (sql, binds) = TaskFilter::from_query(owner(), &params).render();

        assert!(!sql.contains("delivery_date"));
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn recognized_sort_replaces_the_default_order() {
        let params = ListTasksQuery {
            sort_by: Some("priority:desc".to_string()),
            ..Default::default()
        };
        let (sql, _) = TaskFilter::from_query(owner(), &params).render();

        assert!(sql.ends_with("ORDER BY priority DESC"));
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        let params = ListTasksQuery {
            sort_by: Some("created_at:ASC".to_string()),
            ..Default::default()
        };
        let (sql, _) = TaskFilter::from_query(owner(), &params).render();

        assert!(sql.ends_with("ORDER BY created_at ASC"));
    }

    #[test]
    fn unrecognized_sort_falls_back_to_default_order() {
        for sort_by in [
            "priority; DROP TABLE tasks:asc",
            "password_hash:asc",
            "title:sideways",
            "list_title:asc",
            "created_at",
        ] {
            let params = ListTasksQuery {
                sort_by: Some(sort_by.to_string()),
                ..Default::default()
            };
            let (sql, _) = TaskFilter::from_query(owner(), &params).render();

            assert!(
                sql.ends_with("ORDER BY list_title ASC, created_at DESC"),
                "sort_by {sort_by:?} should fall back"
            );
        }
    }

    #[test]
    fn empty_changeset_is_rejected() {
        let err = TaskChangeset::from_request(&UpdateTaskRequest::default()).unwrap_err();
        assert_eq!(err, ChangesetError::NoFieldsProvided);
    }

    #[test]
    fn changeset_rejects_unknown_status_and_priority() {
        let bad_status = UpdateTaskRequest {
            status: Some("Doing".to_string()),
            ..Default::default()
        };
        assert_eq!(
            TaskChangeset::from_request(&bad_status).unwrap_err(),
            ChangesetError::InvalidStatus("Doing".to_string())
        );

        let bad_priority = UpdateTaskRequest {
            priority: Some("urgent".to_string()),
            ..Default::default()
        };
        assert_eq!(
            TaskChangeset::from_request(&bad_priority).unwrap_err(),
            ChangesetError::InvalidPriority("urgent".to_string())
        );
    }

    #[test]
    fn changeset_normalizes_priority_to_lowercase() {
        let req = UpdateTaskRequest {
            priority: Some("ALTA".to_string()),
            ..Default::default()
        };
        let changeset = TaskChangeset::from_request(&req).unwrap();
        let (sql, binds) = changeset.render_update(Uuid::new_v4(), Uuid::new_v4());

        assert!(sql.starts_with("UPDATE tasks SET priority = $1"));
        assert_eq!(binds[0], Bind::Text(Some("alta".to_string())));
    }

    #[test]
    fn changeset_updates_only_supplied_fields_and_scopes_to_owner() {
        let req = UpdateTaskRequest {
            title: Some("Comprar pão".to_string()),
            status: Some("Done".to_string()),
            ..Default::default()
        };
        let task_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let (sql, binds) = TaskChangeset::from_request(&req)
            .unwrap()
            .render_update(task_id, user_id);

        assert_eq!(
            sql,
            "UPDATE tasks SET title = $1, status = $2 \
             WHERE id = $3 AND user_id = $4 RETURNING *"
        );
        assert_eq!(
            binds,
            vec![
                Bind::Text(Some("Comprar pão".to_string())),
                Bind::Text(Some("Done".to_string())),
                Bind::Uuid(task_id),
                Bind::Uuid(user_id),
            ]
        );
    }

    #[test]
    fn explicit_null_clears_nullable_columns() {
        let req = UpdateTaskRequest {
            description: Some(None),
            delivery_date: Some(None),
            ..Default::default()
        };
        let (sql, binds) = TaskChangeset::from_request(&req)
            .unwrap()
            .render_update(Uuid::new_v4(), Uuid::new_v4());

        assert!(sql.starts_with("UPDATE tasks SET description = $1, delivery_date = $2"));
        assert_eq!(binds[0], Bind::Text(None));
        assert_eq!(binds[1], Bind::Date(None));
    }
}
