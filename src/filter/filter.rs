use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ListParams, SortDirection, SqlResult, TaskQuery};
use crate::database::models::Task;

/// An owner-scoped task query, renderable as SQL or applied to an in-memory
/// collection with the same semantics.
pub struct Filter {
    owner: Uuid,
    query: TaskQuery,
}

impl Filter {
    pub fn new(owner: Uuid, query: TaskQuery) -> Self {
        Self { owner, query }
    }

    /// Validates raw query parameters. Absent values mean "no constraint";
    /// present but malformed values are rejected instead of being coerced.
    pub fn parse(params: &ListParams, max_limit: Option<u32>) -> Result<TaskQuery, FilterError> {
        let completed = match params.completed.as_deref().map(str::trim) {
            None | Some("") => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => return Err(FilterError::InvalidCompleted(other.to_string())),
        };

        let sort = match params.sort_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(FilterOrder::parse(s)?),
        };

        let limit = match params.limit.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => {
                let limit: u32 = s
                    .parse()
                    .map_err(|_| FilterError::InvalidLimit(format!("'{}' is not a non-negative integer", s)))?;
                Some(Self::cap_limit(limit, max_limit))
            }
        };

        let skip = match params.skip.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<u32>()
                    .map_err(|_| FilterError::InvalidSkip(format!("'{}' is not a non-negative integer", s)))?,
            ),
        };

        Ok(TaskQuery { completed, sort, limit, skip })
    }

    fn cap_limit(limit: u32, max_limit: Option<u32>) -> u32 {
        match max_limit {
            Some(max) if limit > max => {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        }
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(self.owner, self.query.completed);
        let order_clause = FilterOrder::generate(self.query.sort.as_ref());
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT * FROM \"tasks\"".to_string(),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.owner == self.owner && self.query.completed.map_or(true, |c| task.completed == c)
    }

    /// Applies the query to tasks given in storage order.
    pub fn apply<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
        let mut matched: Vec<Task> = tasks.into_iter().filter(|t| self.matches(t)).cloned().collect();

        if let Some(spec) = self.query.sort {
            // stable, so ties keep storage order
            matched.sort_by(|a, b| match spec.direction {
                SortDirection::Asc => spec.field.compare(a, b),
                SortDirection::Desc => spec.field.compare(b, a),
            });
        }

        let skip = self.query.skip.unwrap_or(0) as usize;
        let iter = matched.into_iter().skip(skip);
        match self.query.limit {
            Some(limit) => iter.take(limit as usize).collect(),
            None => iter.collect(),
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.query.limit, self.query.skip) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
