//! Execution context: the explicit service registry handed to every collaborator.
//!
//! A [`Context`] is built once (usually through [`ContextBuilder::with_defaults`])
//! and shared as `Arc<Context>`. Services are keyed by their type, including
//! trait-object types, so `ctx.service::<dyn DisplayService>()` works the same
//! way as `ctx.service::<EventService>()`.

use crate::command::{ClassRegistry, CommandService};
use crate::config::FrameworkConfig;
use crate::error::{FrameworkError, Result};
use crate::event::{EventService, FrameworkEvent};
use crate::logging::{LogService, TracingLog};
use crate::module::{ModuleService, ProcessorChain};
use crate::options::{OptionsService, OptionsStore};
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Default number of events retained by the event service.
pub const DEFAULT_EVENT_BACKLOG: usize = 256;

/// Type token identifying a service.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.name)
    }
}

/// Type-erased handle on a registered service.
///
/// The slot holds an `Arc<T>`, which keeps unsized service types
/// (`dyn Trait`) retrievable by downcasting.
#[derive(Clone)]
pub struct ServiceRef {
    key: ServiceKey,
    slot: Arc<dyn Any + Send + Sync>,
}

impl ServiceRef {
    pub fn new<T: ?Sized + Send + Sync + 'static>(service: Arc<T>) -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            slot: Arc::new(service),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.slot.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn ptr_eq(&self, other: &ServiceRef) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceRef({})", self.key.name)
    }
}

/// Builder for [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    services: IndexMap<ServiceKey, ServiceRef>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the framework services configured from `config`:
    /// events, command registry, module execution and options.
    pub fn with_defaults(config: &FrameworkConfig) -> Self {
        let events = Arc::new(EventService::new(DEFAULT_EVENT_BACKLOG));
        let commands = Arc::new(CommandService::new(
            Arc::new(ClassRegistry::new()),
            Some(events.clone()),
        ));
        let modules = Arc::new(ModuleService::new(ProcessorChain::standard(
            &config.execution,
        )));
        let options = Arc::new(OptionsService::new(OptionsStore::in_memory()));

        Self::new()
            .with(events)
            .with(commands)
            .with(modules)
            .with(options)
    }

    /// Register `service` under its own type. A later registration of the same
    /// type replaces the earlier one.
    pub fn with<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        let service = ServiceRef::new(service);
        self.services.insert(*service.key(), service);
        self
    }

    pub fn build(self) -> Arc<Context> {
        tracing::debug!("Context built with {} services", self.services.len());
        Arc::new(Context {
            services: self.services,
        })
    }
}

/// Service registry shared by modules, processors and commands.
pub struct Context {
    services: IndexMap<ServiceKey, ServiceRef>,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// A context with no services.
    pub fn empty() -> Arc<Context> {
        ContextBuilder::new().build()
    }

    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&ServiceKey::of::<T>())
            .and_then(|s| s.get::<T>())
    }

    pub fn service_ref(&self, key: &ServiceKey) -> Option<ServiceRef> {
        self.services.get(key).cloned()
    }

    pub fn has_service(&self, key: &ServiceKey) -> bool {
        self.services.contains_key(key)
    }

    /// Like [`Context::service`] but absence is an error.
    pub fn require<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.service::<T>()
            .ok_or_else(|| FrameworkError::MissingService {
                service: std::any::type_name::<T>().to_string(),
            })
    }

    /// The registered log sink, or one that forwards to `tracing`.
    pub fn log(&self) -> Arc<dyn LogService> {
        self.service::<dyn LogService>()
            .unwrap_or_else(|| Arc::new(TracingLog))
    }

    pub fn events(&self) -> Option<Arc<EventService>> {
        self.service::<EventService>()
    }

    /// Publish through the event service if one is registered.
    pub fn publish(&self, event: FrameworkEvent) {
        if let Some(events) = self.events() {
            events.publish(event);
        }
    }

    pub fn service_keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.services.keys()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.services.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_trait_object_service() {
        let ctx = Context::builder()
            .with::<dyn Greeter>(Arc::new(English))
            .build();
        let greeter = ctx.service::<dyn Greeter>().expect("registered");
        assert_eq!(greeter.greet(), "hello");
        assert!(ctx.service::<English>().is_none());
    }

    #[test]
    fn test_require_missing_service() {
        let ctx = Context::empty();
        let err = ctx.require::<EventService>().err().unwrap();
        assert!(matches!(err, FrameworkError::MissingService { .. }));
        assert!(err.to_string().contains("EventService"));
    }

    #[test]
    fn test_log_falls_back_to_tracing() {
        let log = Arc::new(MemoryLog::new());
        let ctx = Context::builder().with::<dyn LogService>(log.clone()).build();
        ctx.log().warn("careful");
        assert_eq!(log.warnings(), vec!["careful".to_string()]);

        // No sink registered: must not panic
        Context::empty().log().warn("dropped into tracing");
    }

    #[test]
    fn test_later_registration_replaces() {
        let first = Arc::new(EventService::new(4));
        let second = Arc::new(EventService::new(4));
        let ctx = Context::builder()
            .with(first.clone())
            .with(second.clone())
            .build();
        assert!(Arc::ptr_eq(&ctx.service::<EventService>().unwrap(), &second));
        assert_eq!(ctx.service_keys().count(), 1);
    }

    #[test]
    fn test_defaults_register_framework_services() {
        let ctx = ContextBuilder::with_defaults(&FrameworkConfig::default()).build();
        assert!(ctx.service::<EventService>().is_some());
        assert!(ctx.service::<CommandService>().is_some());
        assert!(ctx.service::<ModuleService>().is_some());
        assert!(ctx.service::<OptionsService>().is_some());
    }

    #[test]
    fn test_service_ref_identity() {
        let events = Arc::new(EventService::new(1));
        let a = ServiceRef::new(events.clone());
        let b = a.clone();
        let c = ServiceRef::new(events);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.key(), c.key());
    }
}
