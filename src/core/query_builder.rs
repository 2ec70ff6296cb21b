//! SQL statement builders
//!
//! Builds INSERT / UPDATE / SELECT / DELETE statements from a table name and
//! ordered field and condition maps. Every value is bound through a named
//! placeholder (`:column`); only table and column identifiers end up in the
//! SQL text, and those are expected to come from statically declared schema.

use super::error::{MapperError, Result};
use super::value::FieldMap;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Placeholder prefix for WHERE values of UPDATE statements
const WHERE_PREFIX: &str = "where_";

/// Shape of a raw SQL statement, which decides what executing it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// INSERT / UPDATE: returns the affected row (RETURNING)
    Returning,
    /// SELECT: returns every row
    Query,
    /// Anything else: returns a success flag
    Command,
}

impl StatementKind {
    /// Classify a statement by its leading keyword
    pub fn of(sql: &str) -> Self {
        let keyword: String = sql
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "insert" | "update" => StatementKind::Returning,
            "select" | "with" => StatementKind::Query,
            _ => StatementKind::Command,
        }
    }
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order
    #[default]
    Asc,
    /// Descending order
    Desc,
}

impl OrderDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One `column direction` term of an ORDER BY clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parse `"<col> asc|desc[, <col> asc|desc]..."`
    pub fn parse_list(clause: &str) -> Result<Vec<OrderBy>> {
        clause
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for OrderBy {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| MapperError::query("Empty ORDER BY term"))?;
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => OrderDirection::Asc,
            Some("desc") => OrderDirection::Desc,
            Some(other) => {
                return Err(MapperError::query(format!(
                    "Invalid ORDER BY direction '{}'",
                    other
                )))
            }
        };
        if parts.next().is_some() {
            return Err(MapperError::query(format!("Invalid ORDER BY term '{}'", s)));
        }
        Ok(OrderBy {
            column: column.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.as_sql())
    }
}

fn deserialize_order<'de, D>(deserializer: D) -> std::result::Result<Vec<OrderBy>, D::Error>
where
    D: Deserializer<'de>,
{
    let clause = Option::<String>::deserialize(deserializer)?;
    match clause {
        Some(clause) => OrderBy::parse_list(&clause).map_err(serde::de::Error::custom),
        None => Ok(Vec::new()),
    }
}

/// Read options recognized by [`SelectBuilder`]: order, limit and offset
///
/// Deserializing ignores keys it does not know.
///
/// ```
/// use rust_data_mapper::core::SelectOptions;
///
/// let options: SelectOptions =
///     serde_json::from_str(r#"{"order": "id desc", "limit": 2, "cache": true}"#).unwrap();
/// assert_eq!(options.limit, Some(2));
/// assert_eq!(options.order[0].to_string(), "id DESC");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectOptions {
    #[serde(default, deserialize_with = "deserialize_order")]
    pub order: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ordering with a parsed `"<col> asc|desc, ..."` list
    pub fn order(mut self, clause: &str) -> Result<Self> {
        self.order = OrderBy::parse_list(clause)?;
        Ok(self)
    }

    /// Append one ordering term
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

fn placeholder(name: &str) -> String {
    format!(":{}", name)
}

fn conjunction(conditions: &FieldMap, prefix: &str) -> String {
    conditions
        .keys()
        .map(|column| format!("{} = :{}{}", column, prefix, column))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// SELECT query builder
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    conditions: FieldMap,
    options: SelectOptions,
}

impl SelectBuilder {
    /// Create a new SELECT query builder
    ///
    /// # Example
    ///
    /// ```
    /// use rust_data_mapper::core::query_builder::SelectBuilder;
    ///
    /// let query = SelectBuilder::new("users")
    ///     .columns(&["id", "email"])
    ///     .build();
    /// assert_eq!(query, "SELECT id, email FROM users");
    /// ```
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec!["*".to_string()],
            conditions: FieldMap::new(),
            options: SelectOptions::default(),
        }
    }

    /// Select specific columns; an empty list selects `*`
    #[must_use]
    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = if columns.is_empty() {
            vec!["*".to_string()]
        } else {
            columns.iter().map(|s| s.as_ref().to_string()).collect()
        };
        self
    }

    /// Replace the equality conditions (AND-combined)
    #[must_use]
    pub fn conditions(mut self, conditions: &FieldMap) -> Self {
        self.conditions = conditions.clone();
        self
    }

    /// Add a `column = value` condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<super::DatabaseValue>) -> Self {
        self.conditions.insert(column.to_string(), value.into());
        self
    }

    /// Apply order / limit / offset
    #[must_use]
    pub fn options(mut self, options: &SelectOptions) -> Self {
        self.options = options.clone();
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conjunction(&self.conditions, ""));
        }

        if !self.options.order.is_empty() {
            let terms: Vec<String> = self.options.order.iter().map(|o| o.to_string()).collect();
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }

        if let Some(limit) = self.options.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.options.offset {
            // SQLite only accepts OFFSET after a LIMIT
            if self.options.limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Named parameters for the WHERE clause
    pub fn params(&self) -> FieldMap {
        self.conditions.clone()
    }
}

/// INSERT ... RETURNING * builder
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    values: FieldMap,
}

impl InsertBuilder {
    /// Create a new INSERT query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: FieldMap::new(),
        }
    }

    /// Add a column-value pair
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<super::DatabaseValue>) -> Self {
        self.values.insert(column.to_string(), value.into());
        self
    }

    /// Insert every entry of a field map
    #[must_use]
    pub fn values(mut self, values: &FieldMap) -> Self {
        self.values
            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        if self.values.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES RETURNING *", self.table);
        }
        let columns: Vec<&str> = self.values.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = columns.iter().map(|c| placeholder(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// Named parameters
    pub fn params(&self) -> FieldMap {
        self.values.clone()
    }
}

/// UPDATE ... RETURNING * builder
///
/// The `id` column is never part of the SET clause.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    set_values: FieldMap,
    conditions: FieldMap,
}

impl UpdateBuilder {
    /// Create a new UPDATE query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set_values: FieldMap::new(),
            conditions: FieldMap::new(),
        }
    }

    /// Set a column value
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<super::DatabaseValue>) -> Self {
        if column != "id" {
            self.set_values.insert(column.to_string(), value.into());
        }
        self
    }

    /// Set every entry of a field map
    #[must_use]
    pub fn set_all(mut self, values: &FieldMap) -> Self {
        self.set_values.extend(
            values
                .iter()
                .filter(|(k, _)| k.as_str() != "id")
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self
    }

    /// Add a WHERE condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<super::DatabaseValue>) -> Self {
        self.conditions.insert(column.to_string(), value.into());
        self
    }

    /// Add every entry of a condition map
    #[must_use]
    pub fn conditions(mut self, conditions: &FieldMap) -> Self {
        self.conditions
            .extend(conditions.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Build the SQL query string
    ///
    /// # Errors
    ///
    /// Returns an error when there is nothing to set or no condition, since an
    /// unconditional UPDATE would touch the whole table.
    pub fn build(&self) -> Result<String> {
        if self.set_values.is_empty() {
            return Err(MapperError::query(format!(
                "Nothing to update in {}",
                self.table
            )));
        }
        if self.conditions.is_empty() {
            return Err(MapperError::query(format!(
                "Refusing unconditional update of {}",
                self.table
            )));
        }
        let set_clauses: Vec<String> = self
            .set_values
            .keys()
            .map(|col| format!("{} = {}", col, placeholder(col)))
            .collect();

        Ok(format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            self.table,
            set_clauses.join(", "),
            conjunction(&self.conditions, WHERE_PREFIX)
        ))
    }

    /// Named parameters (SET values followed by prefixed WHERE values)
    pub fn params(&self) -> FieldMap {
        let mut params = self.set_values.clone();
        params.extend(
            self.conditions
                .iter()
                .map(|(k, v)| (format!("{}{}", WHERE_PREFIX, k), v.clone())),
        );
        params
    }
}

/// DELETE query builder
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    conditions: FieldMap,
}

impl DeleteBuilder {
    /// Create a new DELETE query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: FieldMap::new(),
        }
    }

    /// Add a WHERE condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<super::DatabaseValue>) -> Self {
        self.conditions.insert(column.to_string(), value.into());
        self
    }

    /// Add every entry of a condition map
    #[must_use]
    pub fn conditions(mut self, conditions: &FieldMap) -> Self {
        self.conditions
            .extend(conditions.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Build the SQL query string
    ///
    /// # Errors
    ///
    /// Returns an error when no condition is given.
    pub fn build(&self) -> Result<String> {
        if self.conditions.is_empty() {
            return Err(MapperError::query(format!(
                "Refusing unconditional delete from {}",
                self.table
            )));
        }
        Ok(format!(
            "DELETE FROM {} WHERE {}",
            self.table,
            conjunction(&self.conditions, "")
        ))
    }

    /// Named parameters
    pub fn params(&self) -> FieldMap {
        self.conditions.clone()
    }
}
