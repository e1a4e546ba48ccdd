use uuid::Uuid;

use super::types::SqlParam;

/// Builds the WHERE clause for an owner-scoped task query. The owner
/// predicate is always present and always `$1`.
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    conditions: Vec<String>,
}

impl FilterWhere {
    pub fn generate(owner: Uuid, completed: Option<bool>) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self {
            param_values: vec![],
            conditions: vec![],
        };

        let owner_param = filter_where.param(SqlParam::Uuid(owner));
        filter_where.conditions.push(format!("\"owner\" = {}", owner_param));

        if let Some(completed) = completed {
            let completed_param = filter_where.param(SqlParam::Bool(completed));
            filter_where.conditions.push(format!("\"completed\" = {}", completed_param));
        }

        (filter_where.conditions.join(" AND "), filter_where.param_values)
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        format!("${}", self.param_values.len())
    }
}
