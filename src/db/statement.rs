//! Named-placeholder statements and their driver-native compiled form.
//!
//! Statement text refers to values as `@name`. Compiling rewrites every
//! placeholder into the positional syntax of the target driver and lays the
//! bound values out in index order, so the driver binds them itself and no
//! value ever becomes part of the SQL text.

use super::error::QueryError;
use super::value::{Params, SqlValue};

/// Positional placeholder syntax understood by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// SQLite: `?1`, `?2`, ...
    Numbered,
    /// SQL Server (TDS RPC): `@P1`, `@P2`, ...
    AtP,
}

impl PlaceholderStyle {
    fn render(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Numbered => format!("?{index}"),
            PlaceholderStyle::AtP => format!("@P{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Params,
}

/// Statement text in driver syntax plus its values, 1-based index order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn compile(&self, style: PlaceholderStyle) -> Result<CompiledStatement, QueryError> {
        let mut out = String::with_capacity(self.sql.len());
        // names in first-seen order; position + 1 is the placeholder index
        let mut order: Vec<&str> = Vec::new();
        let src = self.sql.as_str();
        let bytes = src.as_bytes();
        let mut i = 0;
        let mut copied = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' => i = skip_quoted(bytes, i, b'\''),
                b'"' => i = skip_quoted(bytes, i, b'"'),
                b'[' => i = skip_quoted(bytes, i, b']'),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = src[i..].find('\n').map_or(bytes.len(), |n| i + n);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = src[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                }
                b'@' if bytes.get(i + 1) == Some(&b'@') => {
                    // @@ROWCOUNT and friends
                    i += 2;
                    while i < bytes.len() && is_ident_byte(bytes[i]) {
                        i += 1;
                    }
                }
                b'@' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && is_ident_byte(bytes[end]) {
                        end += 1;
                    }
                    let name = &src[start..end];
                    let index = match order.iter().position(|n| *n == name) {
                        Some(pos) => pos + 1,
                        None => {
                            if self.params.get(name).is_none() {
                                return Err(QueryError::UnboundParameter(name.to_string()));
                            }
                            order.push(name);
                            order.len()
                        }
                    };
                    out.push_str(&src[copied..i]);
                    out.push_str(&style.render(index));
                    copied = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&src[copied..]);

        if let Some(unused) = self.params.names().find(|n| !order.contains(n)) {
            return Err(QueryError::UnusedParameter(unused.to_string()));
        }

        let values = order
            .iter()
            .filter_map(|name| self.params.get(name).cloned())
            .collect();
        Ok(CompiledStatement { sql: out, values })
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Returns the index just past the closing delimiter. A doubled delimiter
/// inside the run is an escape, not a terminator.
fn skip_quoted(bytes: &[u8], open: usize, close: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == close {
            if bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}
