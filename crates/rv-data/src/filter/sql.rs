//! Translation of filter sets into SQLite `WHERE` clauses
//!
//! Values are always bound as parameters. Numeric filter values compare
//! numerically against INTEGER and REAL cells and textually against anything
//! else, so numbers stored as TEXT compare as text.

use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;
use rv_core::{Condition, FilterItem, FilterSet, Logic};

use super::parse_number;
use crate::DataError;

/// A bound statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Real(f64),
    Integer(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Text(s) => s.to_sql(),
            SqlParam::Real(n) => n.to_sql(),
            SqlParam::Integer(n) => n.to_sql(),
        }
    }
}

/// A boolean SQL expression and the parameters it binds, in order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub clause: String,
    pub params: Vec<SqlParam>,
}

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Translate the active items of a filter set.
///
/// `resolve` maps a filter field key to a column name of the target table.
/// Returns `None` when there is no active item.
pub fn translate<F>(filters: &FilterSet, mut resolve: F) -> Result<Option<SqlFragment>, DataError>
where
    F: FnMut(&str) -> Result<String, DataError>,
{
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for item in filters.active_items() {
        let column = quote_ident(&resolve(&item.field)?);
        clauses.push(item_clause(&column, item, &mut params));
    }

    if clauses.is_empty() {
        return Ok(None);
    }

    let joiner = match filters.logic {
        Logic::And => " AND ",
        Logic::Or => " OR ",
    };
    Ok(Some(SqlFragment {
        clause: format!("({})", clauses.join(joiner)),
        params,
    }))
}

fn item_clause(column: &str, item: &FilterItem, params: &mut Vec<SqlParam>) -> String {
    let text = format!("COALESCE(CAST({} AS TEXT), '')", column);
    let value = item.value.clone();

    match item.condition {
        Condition::Eq => comparison(column, &text, "=", &value, params),
        Condition::Neq => format!("NOT {}", comparison(column, &text, "=", &value, params)),
        Condition::Gt => comparison(column, &text, ">", &value, params),
        Condition::Lt => comparison(column, &text, "<", &value, params),
        Condition::Contains => {
            params.push(SqlParam::Text(value));
            format!("instr({}, ?) > 0", text)
        }
        Condition::Starts => {
            params.push(SqlParam::Text(value.clone()));
            params.push(SqlParam::Text(value));
            format!("substr({}, 1, length(?)) = ?", text)
        }
        Condition::Ends => {
            params.push(SqlParam::Text(value.clone()));
            params.push(SqlParam::Text(value));
            format!("substr({}, -length(?)) = ?", text)
        }
    }
}

fn comparison(column: &str, text: &str, op: &str, value: &str, params: &mut Vec<SqlParam>) -> String {
    match parse_number(value) {
        Some(number) => {
            params.push(SqlParam::Real(number));
            params.push(SqlParam::Text(value.to_string()));
            format!(
                "(CASE WHEN typeof({col}) IN ('integer', 'real') THEN {col} {op} ? ELSE {text} {op} ? END)",
                col = column,
                op = op,
                text = text
            )
        }
        None => {
            params.push(SqlParam::Text(value.to_string()));
            format!("{} {} ?", text, op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(field: &str) -> Result<String, DataError> {
        Ok(field.to_string())
    }

    #[test]
    fn test_no_active_items() {
        let filters = FilterSet::all(vec![FilterItem::new("name", Condition::Eq, "")]);
        assert!(translate(&filters, identity).unwrap().is_none());
    }

    #[test]
    fn test_text_and_numeric_items() {
        let filters = FilterSet::any(vec![
            FilterItem::new("name", Condition::Starts, "An"),
            FilterItem::new("salary", Condition::Gt, "5000"),
        ]);
        let fragment = translate(&filters, identity).unwrap().unwrap();

        assert!(fragment.clause.starts_with("(substr("));
        assert!(fragment.clause.contains(" OR "));
        assert_eq!(
            fragment.params,
            vec![
                SqlParam::Text("An".to_string()),
                SqlParam::Text("An".to_string()),
                SqlParam::Real(5000.0),
                SqlParam::Text("5000".to_string()),
            ]
        );
    }

    #[test]
    fn test_unresolved_field_fails() {
        let filters = FilterSet::all(vec![FilterItem::new("other.name", Condition::Eq, "x")]);
        let result = translate(&filters, |f| Err(DataError::fetch(format!("no such column: {}", f))));
        assert!(matches!(result, Err(DataError::DataFetch { .. })));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("first_name"), "\"first_name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
