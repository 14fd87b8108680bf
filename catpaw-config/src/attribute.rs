// Parameter attribute injecting configuration values

use crate::ConfigManager;
use async_trait::async_trait;
use catpaw_core::{Argument, DependenciesOptions, Error, Parameter, ParameterAttribute, ParameterKind};
use std::any::Any;

/// Inject the configuration value at `key`.
///
/// Reads the [`ConfigManager`] registered in the container. A missing key
/// leaves the parameter to its default.
///
/// ```
/// use catpaw_config::Env;
/// use catpaw_core::Parameter;
///
/// let www = Parameter::string("www").with_attribute(Env::new("server.www"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    key: String,
}

impl Env {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl ParameterAttribute for Env {
    fn name(&self) -> &'static str {
        "Env"
    }

    async fn on_parameter_mount(
        &self,
        parameter: &Parameter,
        value: &mut Argument,
        options: &DependenciesOptions,
    ) -> catpaw_core::Result<()> {
        let manager = options.container.resolve::<ConfigManager>()?;
        if !manager.has(&self.key) {
            return Ok(());
        }

        *value = match parameter.kind {
            ParameterKind::String => Argument::String(manager.get_string(&self.key)?),
            ParameterKind::Int => Argument::Int(manager.get_int(&self.key)?),
            ParameterKind::Float => Argument::Float(manager.get_float(&self.key)?),
            ParameterKind::Bool => Argument::Bool(manager.get_bool(&self.key)?),
            ParameterKind::Value => Argument::Json(manager.get(&self.key)?),
            ParameterKind::Dependency { type_name, .. } => {
                return Err(Error::DependencyInjection(format!(
                    "Env parameter `{}` cannot be of type {type_name}.",
                    parameter.name
                )));
            }
        };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
