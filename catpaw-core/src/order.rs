// Sort order parsed from query strings such as `order=DESC:name,created`

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static ORDER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(ASC|DESC):([A-Za-z0-9_,]+)").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(()),
        }
    }
}

/// Columns to order by and a direction.
///
/// ```
/// use catpaw_core::order::{Direction, Order};
///
/// let order = Order::parse("DESC:name,created").unwrap();
/// assert_eq!(order.direction(), Direction::Desc);
/// assert_eq!(order.to_string(), "order by name,created desc");
/// assert_eq!(order.asc().query(), "asc:name%2Ccreated");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    direction: Direction,
    items: Vec<String>,
}

impl Order {
    /// Find `ASC:a,b` or `DESC:a,b` anywhere in `value`.
    pub fn parse(value: &str) -> Option<Self> {
        let pattern = ORDER_PATTERN.as_ref()?;
        let captures = pattern.captures(value)?;
        let direction = captures.get(1)?.as_str().parse().ok()?;
        let items = captures
            .get(2)?
            .as_str()
            .split(',')
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self { direction, items })
    }

    /// First candidate that parses.
    pub fn parse_first<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        candidates.into_iter().find_map(Self::parse)
    }

    /// Ascending order over `items`.
    pub fn of<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            direction: Direction::Asc,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn asc(&self) -> Self {
        Self {
            direction: Direction::Asc,
            items: self.items.clone(),
        }
    }

    pub fn desc(&self) -> Self {
        Self {
            direction: Direction::Desc,
            items: self.items.clone(),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Query string form, `direction:` followed by the urlencoded items.
    pub fn query(&self) -> String {
        format!(
            "{}:{}",
            self.direction.as_str(),
            urlencoding::encode(&self.items.join(","))
        )
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order by {} {}",
            self.items.join(","),
            self.direction.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        let order = Order::parse("asc:id").unwrap();
        assert_eq!(order.direction(), Direction::Asc);
        assert_eq!(order.items(), ["id"]);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Order::parse("name").is_none());
        assert!(Order::parse("UP:name").is_none());
    }

    #[test]
    fn test_parse_first() {
        let order = Order::parse_first(["start", "size", "DESC:age"]).unwrap();
        assert_eq!(order.to_string(), "order by age desc");
    }

    #[test]
    fn test_of_defaults_to_asc() {
        let order = Order::of(["a", "b"]);
        assert_eq!(order.to_string(), "order by a,b asc");
        assert_eq!(order.desc().query(), "desc:a%2Cb");
    }
}
