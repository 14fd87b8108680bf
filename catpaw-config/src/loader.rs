// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Yaml,
    Ini,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            "ini" => Some(FileFormat::Ini),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Format of a file path. `.env`, `.env.local` and the like are env files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;
        if file_name == ".env" || file_name.starts_with(".env.") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Configuration file loader
///
/// Every format parses into a JSON object. Empty files yield an empty object.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file name
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::LoadError(format!("Unsupported configuration file: {}", path.display()))
        })?;
        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {e}", path.display()))
        })?;

        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let value = match self.format {
            FileFormat::Json => parse_json(content)?,
            FileFormat::Toml => parse_toml(content)?,
            FileFormat::Yaml => parse_yaml(content)?,
            FileFormat::Ini => Value::Object(parse_ini(content)?),
            FileFormat::Env => Value::Object(parse_env(content)?),
        };

        match value {
            Value::Object(_) => Ok(value),
            Value::Null => Ok(Value::Object(Map::new())),
            other => Err(ConfigError::ParseError(format!(
                "expected a table of settings at the top level, found {other}"
            ))),
        }
    }
}

fn parse_json(content: &str) -> Result<Value> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError(format!("JSON parse error: {e}")))
}

fn parse_toml(content: &str) -> Result<Value> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {e}")))?;

    serde_json::to_value(table)
        .map_err(|e| ConfigError::ParseError(format!("TOML to JSON conversion error: {e}")))
}

fn parse_yaml(content: &str) -> Result<Value> {
    serde_yaml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("Error while parsing environment yaml file: {e}")))
}

fn parse_env(content: &str) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) = item.map_err(|e| ConfigError::ParseError(format!("Env parse error: {e}")))?;
        map.insert(key, Value::String(value));
    }
    Ok(map)
}

/// `[section]` headers open nested tables; `;` and `#` start comments.
///
/// A section may not reuse the name of a top-level key.
fn parse_ini(content: &str) -> Result<Map<String, Value>> {
    let mut root = Map::new();
    let mut section: Option<String> = None;

    for (number, line) in content.lines().enumerate() {
        let number = number + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[') {
            let name = name.strip_suffix(']').ok_or_else(|| {
                ConfigError::ParseError(format!("INI parse error on line {number}: unclosed section"))
            })?;
            let name = name.trim().to_string();
            match root.entry(name.clone()).or_insert_with(|| Value::Object(Map::new())) {
                Value::Object(_) => section = Some(name),
                _ => {
                    return Err(ConfigError::ParseError(format!(
                        "INI parse error on line {number}: section `{name}` collides with a key of the same name"
                    )));
                }
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::ParseError(format!(
                "INI parse error on line {number}: expected `key = value`"
            )));
        };
        let key = key.trim().to_string();
        let value = Value::String(unquote(value.trim()).to_string());

        let table = match &section {
            Some(name) => match root.get_mut(name) {
                Some(Value::Object(table)) => table,
                _ => {
                    return Err(ConfigError::ParseError(format!(
                        "INI parse error on line {number}: section `{name}` is not a table"
                    )));
                }
            },
            None => &mut root,
        };
        table.insert(key, value);
    }

    Ok(root)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader.parse(r#"{"key": "value", "number": 42}"#).unwrap();
        assert_eq!(result["number"], 42);

        assert!(loader.parse("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            name = "catpaw"

            [server]
            interface = "0.0.0.0:80"
            spa = true
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["server"]["interface"], "0.0.0.0:80");
        assert_eq!(result["server"]["spa"], true);
    }

    #[test]
    fn test_parse_yaml() {
        let loader = ConfigLoader::new(FileFormat::Yaml);
        let yaml = "server:\n  www: ./public\n  max_connections: 32\n";

        let result = loader.parse(yaml).unwrap();
        assert_eq!(result, json!({ "server": { "www": "./public", "max_connections": 32 } }));
    }

    #[test]
    fn test_parse_ini_sections() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let ini = r#"
            ; comment
            name = "catpaw"

            [server]
            www = ./public
            api_prefix = '/api'
        "#;

        let result = loader.parse(ini).unwrap();
        assert_eq!(result["name"], "catpaw");
        assert_eq!(result["server"]["www"], "./public");
        assert_eq!(result["server"]["api_prefix"], "/api");

        assert!(loader.parse("[server\nwww=1").is_err());
        assert!(loader.parse("[server]\nnot a pair").is_err());
    }

    #[test]
    fn test_ini_section_colliding_with_key() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let err = loader.parse("server = x\n[server]\nwww = ./public\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("section `server` collides"));

        let result = loader.parse("[server]\nwww = a\n[cats]\nname = Tom\n[server]\nspa = on\n").unwrap();
        assert_eq!(result, json!({ "server": { "www": "a", "spa": "on" }, "cats": { "name": "Tom" } }));
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = "KEY=value\n# Comment\nQUOTED=\"quoted value\"\n";

        let result = loader.parse(env).unwrap();
        assert_eq!(result["KEY"], "value");
        assert_eq!(result["QUOTED"], "quoted value");
    }

    #[test]
    fn test_empty_file_is_empty_table() {
        let loader = ConfigLoader::new(FileFormat::Yaml);
        assert_eq!(loader.parse("  \n").unwrap(), json!({}));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("YML"), Some(FileFormat::Yaml));
        assert_eq!(FileFormat::from_extension("unknown"), None);
        assert_eq!(FileFormat::from_path(Path::new("./resources/.env")), Some(FileFormat::Env));
        assert_eq!(FileFormat::from_path(Path::new(".env.local")), Some(FileFormat::Env));
        assert_eq!(FileFormat::from_path(Path::new("env.ini")), Some(FileFormat::Ini));
        assert!(ConfigLoader::auto("settings.xml").is_err());
    }
}
