//! Standard preprocessors.

use crate::context::Context;
use crate::error::{FrameworkError, Result};
use crate::module::instance::Module;
use crate::module::process::{ModulePreprocessor, Preprocess, Priority};
use crate::module::value::{Value, ValueType};

/// Cancels modules whose descriptor has validity problems.
pub struct ValidityPreprocessor;

impl ModulePreprocessor for ValidityPreprocessor {
    fn name(&self) -> &str {
        "validity"
    }

    fn priority(&self) -> i32 {
        Priority::FIRST
    }

    fn process(&self, module: &mut dyn Module, _ctx: &Context) -> Result<Preprocess> {
        let info = module.info();
        if info.is_valid() {
            return Ok(Preprocess::Continue);
        }
        let problems: Vec<String> = info.problems().iter().map(|p| p.to_string()).collect();
        Ok(Preprocess::Cancel(format!(
            "{} is invalid: {}",
            info.title(),
            problems.join("; ")
        )))
    }
}

/// Injects service-typed inputs from the context.
pub struct ServicePreprocessor;

impl ModulePreprocessor for ServicePreprocessor {
    fn name(&self) -> &str {
        "services"
    }

    fn priority(&self) -> i32 {
        Priority::VERY_HIGH
    }

    fn process(&self, module: &mut dyn Module, ctx: &Context) -> Result<Preprocess> {
        inject_services(module, ctx)?;
        Ok(Preprocess::Continue)
    }
}

/// Fill unresolved service inputs from `ctx`, returning how many were set.
pub fn inject_services(module: &mut dyn Module, ctx: &Context) -> Result<usize> {
    let pending: Vec<(String, ValueType)> = module
        .info()
        .inputs()
        .iter()
        .filter(|item| item.value_type().is_service() && !module.is_resolved(item.name()))
        .map(|item| (item.name().to_string(), item.value_type().clone()))
        .collect();

    let mut injected = 0;
    for (name, ty) in pending {
        let ValueType::Service(key) = ty else { continue };
        match ctx.service_ref(&key) {
            Some(service) => {
                module.set_value(&name, Value::Service(service))?;
                module.set_resolved(&name, true);
                injected += 1;
            }
            None => tracing::debug!("No {} available for '{}'", key.name(), name),
        }
    }
    Ok(injected)
}

/// Fills unset inputs from their declared default.
pub struct DefaultValuePreprocessor;

impl ModulePreprocessor for DefaultValuePreprocessor {
    fn name(&self) -> &str {
        "default-values"
    }

    fn priority(&self) -> i32 {
        Priority::HIGH
    }

    fn process(&self, module: &mut dyn Module, _ctx: &Context) -> Result<Preprocess> {
        let mut defaults = Vec::new();
        for item in module.info().inputs() {
            let Some(default) = item.default_value() else { continue };
            if item.is_final() || module.is_resolved(item.name()) {
                continue;
            }
            if module.value(item.name())?.is_null() {
                defaults.push((item.name().to_string(), default.clone()));
            }
        }
        for (name, value) in defaults {
            module.set_value(&name, value)?;
        }
        Ok(Preprocess::Continue)
    }
}

/// Calls the module initializer.
pub struct InitPreprocessor;

impl ModulePreprocessor for InitPreprocessor {
    fn name(&self) -> &str {
        "init"
    }

    fn priority(&self) -> i32 {
        Priority::NORMAL
    }

    fn process(&self, module: &mut dyn Module, ctx: &Context) -> Result<Preprocess> {
        module
            .initialize(ctx)
            .map_err(|source| FrameworkError::Initialization {
                title: module.info().title(),
                source,
            })?;
        Ok(Preprocess::Continue)
    }
}

/// Cancels when a required input is still unset.
pub struct RequiredInputsPreprocessor {
    check_constraints: bool,
}

impl RequiredInputsPreprocessor {
    /// With `check_constraints`, inputs outside their range or choices also cancel.
    pub fn new(check_constraints: bool) -> Self {
        Self { check_constraints }
    }
}

impl ModulePreprocessor for RequiredInputsPreprocessor {
    fn name(&self) -> &str {
        "required-inputs"
    }

    fn priority(&self) -> i32 {
        Priority::LOW
    }

    fn process(&self, module: &mut dyn Module, _ctx: &Context) -> Result<Preprocess> {
        let info = module.info();
        for item in info.inputs() {
            if item.is_message() {
                continue;
            }
            let value = module.value(item.name())?;
            if value.is_null() && item.is_required() && !module.is_resolved(item.name()) {
                return Ok(Preprocess::Cancel(format!(
                    "Required input '{}' of {} is not set",
                    item.name(),
                    info.title()
                )));
            }
            if self.check_constraints {
                if let Some(problem) = item.check(&value) {
                    return Ok(Preprocess::Cancel(problem));
                }
            }
        }
        Ok(Preprocess::Continue)
    }
}
