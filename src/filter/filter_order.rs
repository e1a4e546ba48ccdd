use super::error::FilterError;
use super::types::{SortDirection, SortField, SortSpec};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `sortBy` values of the form `field` or `field:asc|desc`.
    pub fn parse(s: &str) -> Result<SortSpec, FilterError> {
        let mut parts = s.trim().splitn(2, ':');
        let name = parts.next().unwrap_or("").trim();
        let field = SortField::parse(name).ok_or_else(|| FilterError::InvalidSortField(name.to_string()))?;

        let direction = match parts.next().map(str::trim) {
            None | Some("") => SortDirection::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(other) => return Err(FilterError::InvalidSortDirection(other.to_string())),
        };

        Ok(SortSpec { field, direction })
    }

    pub fn generate(sort: Option<&SortSpec>) -> String {
        match sort {
            Some(spec) => format!("ORDER BY \"{}\" {}", spec.field.column(), spec.direction.to_sql()),
            None => String::new(),
        }
    }
}
