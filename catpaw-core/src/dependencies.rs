//! Handler parameter declarations and their resolution.
//!
//! A handler declares its parameters as [`Parameter`]s. For each one,
//! [`resolve_dependencies`] looks up a value in this order:
//!
//! 1. an *overwrite* registered for the parameter kind (final, attributes
//!    are skipped),
//! 2. a *provide* registered for the kind,
//! 3. the [`Container`], for dependency kinds still without a value,
//! 4. the parameter attributes, each rewriting the value in turn, or the
//!    *fallback* for the kind when the parameter has no attributes and no
//!    value yet.
//!
//! A parameter still empty afterwards takes its default; a non-nullable
//! parameter without one is an error.

use crate::attributes::ParameterAttribute;
use crate::container::{Container, Instance};
use crate::error::{Error, Result};
use crate::request_context::RequestContext;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Declared type of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Bool,
    Int,
    Float,
    String,
    /// Free-form JSON, e.g. a parsed body or a list of header values.
    Value,
    Dependency {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl ParameterKind {
    pub fn of<T: Any>() -> Self {
        ParameterKind::Dependency {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, ParameterKind::Dependency { .. } | ParameterKind::Value)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterKind::Int | ParameterKind::Float)
    }

    /// Name used in messages and API descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            ParameterKind::Bool => "bool",
            ParameterKind::Int => "int",
            ParameterKind::Float => "float",
            ParameterKind::String => "string",
            ParameterKind::Value => "value",
            ParameterKind::Dependency { type_name, .. } => *type_name,
        }
    }
}

/// A resolved parameter value.
#[derive(Clone)]
pub enum Argument {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(Value),
    Dependency(Instance),
}

impl Argument {
    pub fn dependency<T: Any + Send + Sync>(value: T) -> Self {
        Argument::Dependency(Arc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Null)
    }

    /// Plain JSON view of primitive values.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Argument::Null => Some(Value::Null),
            Argument::Bool(b) => Some(Value::Bool(*b)),
            Argument::Int(i) => Some(Value::from(*i)),
            Argument::Float(f) => Some(Value::from(*f)),
            Argument::String(s) => Some(Value::String(s.clone())),
            Argument::Json(v) => Some(v.clone()),
            Argument::Dependency(_) => None,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Null => f.write_str("Null"),
            Argument::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Argument::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Argument::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Argument::String(s) => f.debug_tuple("String").field(s).finish(),
            Argument::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Argument::Dependency(_) => f.write_str("Dependency"),
        }
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Argument::Bool(value)
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Int(value)
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Float(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::String(value)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Json(value)
    }
}

/// Declaration of one handler parameter.
#[derive(Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub nullable: bool,
    pub default: Option<Argument>,
    pub attributes: Vec<Arc<dyn ParameterAttribute>>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .field(
                "attributes",
                &self.attributes.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
            attributes: Vec::new(),
        }
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Bool)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::String)
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Value)
    }

    /// A parameter of type `T`, from the per-request overwrites or the
    /// container.
    pub fn of<T: Any>(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::of::<T>())
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Argument>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl ParameterAttribute) -> Self {
        self.attributes.push(Arc::new(attribute));
        self
    }

    /// First attribute of type `A`.
    pub fn attribute<A: ParameterAttribute>(&self) -> Option<&A> {
        self.attributes
            .iter()
            .find_map(|a| a.as_any().downcast_ref::<A>())
    }

    pub fn has_attribute<A: ParameterAttribute>(&self) -> bool {
        self.attribute::<A>().is_some()
    }

    pub fn is_optional(&self) -> bool {
        self.nullable || self.default.is_some()
    }
}

pub type Resolver = Arc<dyn Fn(&Parameter) -> Result<Argument> + Send + Sync>;

/// Per-request injection tables.
#[derive(Clone, Default)]
pub struct DependenciesOptions {
    /// Route key of the request, `"METHOD:path"`.
    pub key: String,
    pub container: Container,
    pub overwrites: HashMap<ParameterKind, Resolver>,
    pub provides: HashMap<ParameterKind, Resolver>,
    pub fallbacks: HashMap<ParameterKind, Resolver>,
    pub context: Option<Arc<RequestContext>>,
}

impl DependenciesOptions {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_context(mut self, context: Arc<RequestContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn overwrite<F>(mut self, kind: ParameterKind, resolver: F) -> Self
    where
        F: Fn(&Parameter) -> Result<Argument> + Send + Sync + 'static,
    {
        self.overwrites.insert(kind, Arc::new(resolver));
        self
    }

    /// Overwrite every `T` parameter with a shared value.
    pub fn overwrite_with<T: Any + Send + Sync>(self, value: Arc<T>) -> Self {
        self.overwrite(ParameterKind::of::<T>(), move |_| {
            Ok(Argument::Dependency(value.clone()))
        })
    }

    pub fn provide<F>(mut self, kind: ParameterKind, resolver: F) -> Self
    where
        F: Fn(&Parameter) -> Result<Argument> + Send + Sync + 'static,
    {
        self.provides.insert(kind, resolver_arc(resolver));
        self
    }

    pub fn fallback<F>(mut self, kind: ParameterKind, resolver: F) -> Self
    where
        F: Fn(&Parameter) -> Result<Argument> + Send + Sync + 'static,
    {
        self.fallbacks.insert(kind, resolver_arc(resolver));
        self
    }

    /// Context of the current request, required by request-bound attributes.
    pub fn require_context(&self, what: &str) -> Result<&Arc<RequestContext>> {
        self.context
            .as_ref()
            .ok_or_else(|| Error::DependencyInjection(format!("No context found for {what}.")))
    }
}

fn resolver_arc<F>(resolver: F) -> Resolver
where
    F: Fn(&Parameter) -> Result<Argument> + Send + Sync + 'static,
{
    Arc::new(resolver)
}

/// Resolve every parameter in declaration order.
pub async fn resolve_dependencies(
    parameters: &[Parameter],
    options: &DependenciesOptions,
) -> Result<Arguments> {
    let mut values = Vec::with_capacity(parameters.len());

    for parameter in parameters {
        let value = resolve_parameter(parameter, options).await?;
        values.push((parameter.name.clone(), value));
    }

    Ok(Arguments { values })
}

async fn resolve_parameter(parameter: &Parameter, options: &DependenciesOptions) -> Result<Argument> {
    if let Some(overwrite) = options.overwrites.get(&parameter.kind) {
        return overwrite(parameter);
    }

    let mut value = Argument::Null;

    if let Some(provide) = options.provides.get(&parameter.kind) {
        value = provide(parameter)?;
    }

    if let ParameterKind::Dependency { type_id, type_name } = parameter.kind
        && value.is_null()
    {
        match options.container.resolve_by_id(type_id, type_name) {
            Ok(instance) => value = Argument::Dependency(instance),
            Err(Error::ProviderNotFound(_)) if parameter.nullable => {}
            Err(e) => return Err(e),
        }
    }

    if parameter.attributes.is_empty() {
        if value.is_null()
            && let Some(fallback) = options.fallbacks.get(&parameter.kind)
        {
            value = fallback(parameter)?;
        }
    } else {
        for attribute in &parameter.attributes {
            attribute
                .on_parameter_mount(parameter, &mut value, options)
                .await?;
        }
    }

    if value.is_null() {
        if let Some(default) = &parameter.default {
            return Ok(default.clone());
        }
        if !parameter.nullable {
            return Err(Error::DependencyInjection(format!(
                "Could not resolve parameter `{}` of type {} for {}.",
                parameter.name,
                parameter.kind.name(),
                if options.key.is_empty() { "handler" } else { options.key.as_str() },
            )));
        }
    }

    Ok(value)
}

/// Resolved handler arguments, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Argument>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn raw(&self, name: &str) -> Option<&Argument> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Typed value of the parameter `name`.
    pub fn get<T: FromArgument>(&self, name: &str) -> Result<T> {
        match self.raw(name) {
            Some(value) => T::from_argument(value).map_err(|e| {
                Error::DependencyInjection(format!("Parameter `{name}`: {e}"))
            }),
            None => T::from_argument(&Argument::Null).map_err(|_| {
                Error::DependencyInjection(format!("Parameter `{name}` was not declared."))
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Conversion out of a resolved [`Argument`].
pub trait FromArgument: Sized {
    fn from_argument(argument: &Argument) -> Result<Self>;
}

fn mismatch(expected: &str, argument: &Argument) -> Error {
    Error::DependencyInjection(format!("expected {expected}, got {argument:?}"))
}

impl FromArgument for String {
    fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::String(s) => Ok(s.clone()),
            Argument::Int(i) => Ok(i.to_string()),
            Argument::Float(f) => Ok(f.to_string()),
            Argument::Bool(b) => Ok(if *b { "1".into() } else { String::new() }),
            Argument::Json(Value::String(s)) => Ok(s.clone()),
            Argument::Json(v) => Ok(v.to_string()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl FromArgument for i64 {
    fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::Int(i) => Ok(*i),
            Argument::Float(f) => Ok(f.trunc() as i64),
            Argument::Bool(b) => Ok(i64::from(*b)),
            Argument::String(s) => s.trim().parse().map_err(|_| mismatch("int", argument)),
            Argument::Json(v) => v.as_i64().ok_or_else(|| mismatch("int", argument)),
            other => Err(mismatch("int", other)),
        }
    }
}

impl FromArgument for f64 {
    fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::Float(f) => Ok(*f),
            Argument::Int(i) => Ok(*i as f64),
            Argument::String(s) => s.trim().parse().map_err(|_| mismatch("float", argument)),
            Argument::Json(v) => v.as_f64().ok_or_else(|| mismatch("float", argument)),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromArgument for bool {
    fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::Bool(b) => Ok(*b),
            Argument::Int(i) => Ok(*i != 0),
            Argument::String(s) => Ok(crate::query::truthy(s)),
            Argument::Json(Value::Bool(b)) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromArgument for Value {
    fn from_argument(argument: &Argument) -> Result<Self> {
        argument.to_json().ok_or_else(|| mismatch("value", argument))
    }
}

impl<T: FromArgument> FromArgument for Option<T> {
    fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::Null => Ok(None),
            other => T::from_argument(other).map(Some),
        }
    }
}

impl<T: Any + Send + Sync> FromArgument for Arc<T> {
    fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::Dependency(instance) => instance.clone().downcast::<T>().map_err(|_| {
                Error::DependencyInjection(format!(
                    "expected {}, got another type",
                    std::any::type_name::<T>()
                ))
            }),
            other => Err(mismatch(std::any::type_name::<T>(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Provider;

    struct Repository(&'static str);
    impl Provider for Repository {}

    #[tokio::test]
    async fn test_resolution_order() {
        let container = Container::new();
        container.register(Repository("users"));

        let options = DependenciesOptions::new(container)
            .overwrite(ParameterKind::Float, |_| Ok(Argument::Float(1.5)))
            .provide(ParameterKind::Int, |_| Ok(Argument::Int(3)))
            .fallback(ParameterKind::String, |p| Ok(Argument::String(p.name.clone())));

        let parameters = [
            Parameter::float("ratio"),
            Parameter::int("id"),
            Parameter::string("name"),
            Parameter::of::<Repository>("repository"),
        ];

        let arguments = resolve_dependencies(&parameters, &options).await.unwrap();
        assert_eq!(arguments.get::<f64>("ratio").unwrap(), 1.5);
        assert_eq!(arguments.get::<i64>("id").unwrap(), 3);
        assert_eq!(arguments.get::<String>("name").unwrap(), "name");
        assert_eq!(arguments.get::<Arc<Repository>>("repository").unwrap().0, "users");
    }

    #[tokio::test]
    async fn test_defaults_and_nullables() {
        let options = DependenciesOptions::default();
        let parameters = [
            Parameter::int("limit").with_default(25i64),
            Parameter::string("name").nullable(),
            Parameter::of::<Repository>("repository").nullable(),
        ];

        let arguments = resolve_dependencies(&parameters, &options).await.unwrap();
        assert_eq!(arguments.get::<i64>("limit").unwrap(), 25);
        assert_eq!(arguments.get::<Option<String>>("name").unwrap(), None);
        assert!(arguments.get::<Option<Arc<Repository>>>("repository").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_parameter() {
        let options = DependenciesOptions::default().with_key("GET:/");
        let err = resolve_dependencies(&[Parameter::string("name")], &options)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dependency injection error: Could not resolve parameter `name` of type string for GET:/."
        );
    }

    #[test]
    fn test_argument_conversions() {
        let arguments = Arguments::new()
            .with("count", "12")
            .with("flag", "yes")
            .with("data", serde_json::json!({"a": 1}));

        assert_eq!(arguments.get::<i64>("count").unwrap(), 12);
        assert!(arguments.get::<bool>("flag").unwrap());
        assert_eq!(arguments.get::<Value>("data").unwrap()["a"], 1);
        assert!(arguments.get::<i64>("missing").is_err());
        assert_eq!(arguments.get::<Option<i64>>("missing").unwrap(), None);
    }
}
