//! Parsing of caller-supplied clause fragments
//!
//! Projection lists, sort expressions and join predicates arrive as raw
//! strings. They are parsed here into structured values whose identifiers have
//! passed [`validate_identifier`](crate::sql::validate_identifier); only these
//! values are ever rendered into SQL. Whether a referenced column is actually
//! permitted is decided by the caller against its allow-list.

use std::fmt;

use crate::sql::sanitize::split_qualified;

/// A possibly table-qualified column reference (`title` or `recipes.title`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    /// Parse and validate a column reference
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (table, column) = split_qualified(raw.trim())?;
        Ok(Self {
            table: table.map(str::to_string),
            column: column.to_string(),
        })
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => f.write_str(&self.column),
        }
    }
}

// ============================================================================
// Projection
// ============================================================================

/// The SELECT list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    /// An explicit, non-empty column list
    Columns(Vec<ColumnRef>),
}

impl Projection {
    /// Parse a comma-separated column list, or `*`
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::All);
        }

        let columns = split_list(raw)
            .map(ColumnRef::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err("Projection cannot be empty".to_string());
        }

        Ok(Self::Columns(columns))
    }

    /// Columns referenced by the projection (none for `*`)
    pub fn columns(&self) -> &[ColumnRef] {
        match self {
            Self::All => &[],
            Self::Columns(columns) => columns,
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Columns(columns) => f.write_str(&join_display(columns, ", ")),
        }
    }
}

// ============================================================================
// ORDER BY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// One sort term; the direction is rendered only when it was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: ColumnRef,
    pub direction: Option<SortDirection>,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(direction) => write!(f, "{} {}", self.column, direction),
            None => write!(f, "{}", self.column),
        }
    }
}

/// A parsed sort expression
///
/// Accepted forms, comma separated: `title`, `-title` (descending),
/// `title asc`, `title DESC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let keys = split_list(raw)
            .map(parse_sort_key)
            .collect::<Result<Vec<_>, _>>()?;

        if keys.is_empty() {
            return Err("Sort expression cannot be empty".to_string());
        }

        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}

fn parse_sort_key(term: &str) -> Result<SortKey, String> {
    if let Some(column) = term.strip_prefix('-') {
        return Ok(SortKey {
            column: ColumnRef::parse(column)?,
            direction: Some(SortDirection::Desc),
        });
    }

    let mut words = term.split_whitespace();
    let column = words
        .next()
        .ok_or_else(|| "Sort term cannot be empty".to_string())?;
    let direction = match words.next().map(str::to_lowercase).as_deref() {
        None => None,
        Some("asc") => Some(SortDirection::Asc),
        Some("desc") => Some(SortDirection::Desc),
        Some(other) => {
            return Err(format!(
                "Invalid sort order: '{}'. Must be 'asc' or 'desc'.",
                other
            ));
        }
    };

    if words.next().is_some() {
        return Err(format!("Invalid sort term: '{}'", term));
    }

    Ok(SortKey {
        column: ColumnRef::parse(column)?,
        direction,
    })
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_display(&self.keys, ", "))
    }
}

// ============================================================================
// JOIN ... ON
// ============================================================================

/// An equality join predicate between two qualified columns
/// (`recipes.author_id = authors.id`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPredicate {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

impl JoinPredicate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (left, right) = raw
            .split_once('=')
            .ok_or_else(|| format!("Join condition '{}' must have the form a.x = b.y", raw))?;

        let left = ColumnRef::parse(left)?;
        let right = ColumnRef::parse(right)?;

        if left.table.is_none() || right.table.is_none() {
            return Err(format!(
                "Join condition '{}' must use table-qualified columns",
                raw
            ));
        }

        Ok(Self { left, right })
    }

    /// Tables referenced on either side
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        [&self.left, &self.right]
            .into_iter()
            .filter_map(|side| side.table.as_deref())
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn join_display<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}
