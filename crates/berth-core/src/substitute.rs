//! `${name}` token expansion.

use std::collections::HashMap;

use crate::error::SubstitutionError;

/// Name of the variable holding the data root.
pub const DATADIR: &str = "datadir";

/// Maximum nesting depth of values expanded from other values.
pub const SUBSTITUTION_LIMIT: usize = 256;

const TOKEN_OPEN: &str = "${";
const TOKEN_CLOSE: char = '}';

/// Name → value table consulted by [`expand`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    values: HashMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or overwrite a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expand every token in `raw` against this table.
    pub fn expand(&self, raw: &str) -> Result<String, SubstitutionError> {
        expand(raw, self)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.set(name, value);
        }
        table
    }
}

/// Expand `${name}` tokens in `raw`.
///
/// The leftmost token is replaced first and scanning restarts from the
/// beginning after every replacement, so tokens produced by a value are
/// expanded as well. Every byte remembers how many expansions produced it; a
/// replacement nested deeper than [`SUBSTITUTION_LIMIT`] fails with
/// [`SubstitutionError::CyclicVariable`]. Independent tokens in `raw` all sit
/// at depth zero, however many there are.
pub fn expand(raw: &str, table: &VariableTable) -> Result<String, SubstitutionError> {
    let mut value = raw.to_string();
    let mut depths = vec![0usize; value.len()];
    let mut replacements = 0usize;

    while let Some(beg) = value.find(TOKEN_OPEN) {
        let name_start = beg + TOKEN_OPEN.len();
        let end = match value[name_start..].find(TOKEN_CLOSE) {
            Some(offset) => name_start + offset,
            None => {
                return Err(SubstitutionError::MalformedToken {
                    input: raw.to_string(),
                });
            }
        };

        let name = &value[name_start..end];
        let replacement = table
            .get(name)
            .ok_or_else(|| SubstitutionError::UnknownVariable {
                name: name.to_string(),
                input: raw.to_string(),
            })?
            .to_string();

        // A token assembled from several values is as deep as its deepest part.
        let depth = depths[beg..=end].iter().copied().max().unwrap_or(0) + 1;
        if depth > SUBSTITUTION_LIMIT {
            return Err(SubstitutionError::CyclicVariable {
                input: raw.to_string(),
                limit: SUBSTITUTION_LIMIT,
            });
        }

        value.replace_range(beg..=end, &replacement);
        depths.splice(beg..=end, std::iter::repeat_n(depth, replacement.len()));
        replacements += 1;
    }

    if replacements > 0 {
        tracing::debug!(input = raw, output = %value, replacements, "expanded variables");
    }
    Ok(value)
}
