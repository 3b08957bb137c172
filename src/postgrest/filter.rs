//! Filter expressions for PostgREST queries

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// Like (case insensitive)
    ILike,

    /// Is (null, true, false)
    Is,

    /// In a list of values
    In,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::ILike => "ilike",
            FilterOperator::Is => "is",
            FilterOperator::In => "in",
        }
    }
}

/// A single `column=op.value` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    pub fn new(column: &str, operator: FilterOperator, value: &str) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    pub fn eq(column: &str, value: &str) -> Self {
        Self::new(column, FilterOperator::Eq, value)
    }

    /// Render as a query parameter pair
    pub fn to_param(&self) -> (String, String) {
        (
            self.column.clone(),
            format!("{}.{}", self.operator.as_str(), self.value),
        )
    }

    /// Render inside a logical group such as `or=(a.eq.1,b.eq.2)`
    pub fn to_group_item(&self) -> String {
        let value = match self.operator {
            FilterOperator::In => self.value.clone(),
            _ => quote_value(&self.value),
        };
        format!("{}.{}.{}", self.column, self.operator.as_str(), value)
    }
}

/// Render `values` as the argument of an `in` filter
pub fn in_list_value<T: AsRef<str>>(values: &[T]) -> String {
    let values: Vec<String> = values.iter().map(|v| quote_value(v.as_ref())).collect();
    format!("({})", values.join(","))
}

/// Render filters as the argument of an `or` / `and` group
pub fn group_value(filters: &[Filter]) -> String {
    let items: Vec<String> = filters.iter().map(Filter::to_group_item).collect();
    format!("({})", items.join(","))
}

/// Quote a value that contains characters reserved inside `in.(...)` lists
/// and logical groups. Top-level filter values are sent as they are.
pub fn quote_value(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ':']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Characters `like`/`ilike` treat as wildcards
pub fn is_wildcard(c: char) -> bool {
    matches!(c, '*' | '%' | '_')
}

/// Case-insensitive "contains" pattern for a top-level `ilike` filter.
///
/// Wildcards typed by the user are stripped so the input always matches literally.
pub fn contains_pattern(needle: &str) -> String {
    let literal: String = needle.trim().chars().filter(|c| !is_wildcard(*c)).collect();
    format!("*{}*", literal)
}
