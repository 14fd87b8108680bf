//! Query string filters.
//!
//! A query such as `name=~cat%25&age=>3|age=<1` becomes a list of
//! [`FilterItem`]s that can be rendered into a parameterised condition:
//!
//! ```
//! use catpaw_core::Filter;
//!
//! let filter = Filter::from_query("name=~cat%25&age=>3|age=<1&start=0&size=10");
//! assert_eq!(filter.join(" "), "name like :name and age > :age or age < :age1");
//! assert_eq!(filter.bindings()["age1"], "1");
//! ```
//!
//! `&` joins conditions with `and`, `|` (or its encoded form `%7C`) with
//! `or`. Separators inside quotes are part of the value. `start` and `size`
//! belong to pagination and never appear in the output.

use crate::HttpRequest;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

static ITEM_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)=(like:|<=|>=|=|>|<|~|!)?(.*)$").ok()
});

const RESERVED: [&str; 2] = ["start", "size"];

/// How an item connects to the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glue {
    And,
    Or,
    End,
}

impl Glue {
    fn keyword(&self) -> &'static str {
        match self {
            Glue::And => "and",
            Glue::Or => "or",
            Glue::End => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterItem {
    pub name: String,
    /// Placeholder name, `name` followed by a counter for repeated names.
    pub bind_name: String,
    pub operator: String,
    pub value: String,
    pub after: Glue,
}

impl FilterItem {
    fn is_reserved(&self) -> bool {
        RESERVED.contains(&self.name.as_str())
    }
}

type Converter = Arc<dyn Fn(&FilterItem) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub struct Filter {
    items: Vec<FilterItem>,
    converter: Option<Converter>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("items", &self.items)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

impl Filter {
    pub fn from_request(request: &HttpRequest) -> Self {
        Self::from_query(&request.query)
    }

    /// Parse a raw (still encoded) query string.
    pub fn from_query(query: &str) -> Self {
        let Some(pattern) = ITEM_PATTERN.as_ref() else {
            return Self::default();
        };

        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut items = Vec::new();

        for (raw, after) in split_conditions(query) {
            let decoded = crate::query::decode(&raw);
            let Some(captures) = pattern.captures(&decoded) else {
                continue;
            };
            let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let operator = match captures.get(2).map(|m| m.as_str()).unwrap_or_default() {
                "" => "=",
                "!" => "!=",
                other => other,
            };
            let value = captures.get(3).map(|m| m.as_str()).unwrap_or_default();

            let bind_name = match counters.get_mut(name) {
                Some(counter) => {
                    *counter += 1;
                    format!("{name}{counter}")
                }
                None => {
                    counters.insert(name.to_string(), 0);
                    name.to_string()
                }
            };

            items.push(FilterItem {
                name: name.to_string(),
                bind_name,
                operator: operator.to_string(),
                value: value.to_string(),
                after,
            });
        }

        Self {
            items,
            converter: None,
        }
    }

    /// Replace the default `name op :bind` rendering of a condition.
    pub fn with_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(&FilterItem) -> String + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// All parsed items, pagination keys included.
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(FilterItem::is_reserved)
    }

    /// Bind name to value, for every non-reserved item.
    pub fn bindings(&self) -> BTreeMap<String, String> {
        self.items
            .iter()
            .filter(|item| !item.is_reserved())
            .map(|item| (item.bind_name.clone(), item.value.clone()))
            .collect()
    }

    /// Render the conditions separated by `separator`, each followed by the
    /// keyword that links it to the next one.
    pub fn join(&self, separator: &str) -> String {
        let items: Vec<&FilterItem> = self.items.iter().filter(|i| !i.is_reserved()).collect();
        let mut chunks = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let mut chunk = match &self.converter {
                Some(converter) => converter(item),
                None => default_condition(item),
            };
            if index + 1 < items.len() && item.after != Glue::End {
                chunk.push(' ');
                chunk.push_str(item.after.keyword());
            }
            chunks.push(chunk);
        }

        chunks.join(separator)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(" "))
    }
}

fn default_condition(item: &FilterItem) -> String {
    let operator = match item.operator.as_str() {
        "~" | "like:" => "like",
        other => other,
    };
    format!("{} {} :{}", item.name, operator, item.bind_name)
}

/// Split on `&`, `|` and `%7C` outside of quotes.
fn split_conditions(query: &str) -> Vec<(String, Glue)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut rest = query;

    while let Some(c) = rest.chars().next() {
        if quote.is_none() && (rest.starts_with("%7C") || rest.starts_with("%7c")) {
            parts.push((std::mem::take(&mut current), Glue::Or));
            rest = &rest[3..];
            continue;
        }
        rest = &rest[c.len_utf8()..];

        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }

        match (c, quote) {
            ('\\', Some(_)) => {
                current.push(c);
                escaped = true;
            }
            ('"' | '\'', None) => {
                quote = Some(c);
                current.push(c);
            }
            (c, Some(open)) if c == open => {
                quote = None;
                current.push(c);
            }
            ('&', None) => parts.push((std::mem::take(&mut current), Glue::And)),
            ('|', None) => parts.push((std::mem::take(&mut current), Glue::Or)),
            (c, _) => current.push(c),
        }
    }

    if !current.is_empty() {
        parts.push((current, Glue::End));
    }

    parts.retain(|(part, _)| !part.is_empty());
    parts
}
