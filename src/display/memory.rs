//! In-process display service.

use crate::display::{Display, DisplayHandle, DisplayId, DisplayService};
use crate::module::value::Value;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Acceptor = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Scalars, paths and objects are displayable; containers, services and nulls
/// are not.
pub fn displayable(value: &Value) -> bool {
    !matches!(
        value,
        Value::Null | Value::List(_) | Value::Map(_) | Value::Service(_) | Value::Display(_)
    )
}

/// Surface that records the values shown on it.
pub struct MemoryDisplay {
    id: DisplayId,
    name: Mutex<Option<String>>,
    values: Mutex<Vec<Value>>,
    updates: AtomicUsize,
    accepts: Acceptor,
}

impl MemoryDisplay {
    fn new(accepts: Acceptor) -> Self {
        Self {
            id: DisplayId::next(),
            name: Mutex::new(None),
            values: Mutex::new(Vec::new()),
            updates: AtomicUsize::new(0),
            accepts,
        }
    }

    pub fn values(&self) -> Vec<Value> {
        self.values.lock().clone()
    }

    pub fn shows(&self, value: &Value) -> bool {
        self.values.lock().iter().any(|v| v == value)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }
}

impl Display for MemoryDisplay {
    fn id(&self) -> DisplayId {
        self.id
    }

    fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    fn set_name(&self, name: &str) {
        *self.name.lock() = Some(name.to_string());
    }

    fn can_display(&self, value: &Value) -> bool {
        (self.accepts)(value)
    }

    fn display(&self, value: &Value) {
        let mut values = self.values.lock();
        if !values.iter().any(|v| v == value) {
            values.push(value.clone());
        }
    }

    fn update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for MemoryDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDisplay")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("values", &self.values.lock().len())
            .finish()
    }
}

/// Keeps surfaces in creation order; the newest one becomes active.
pub struct MemoryDisplayService {
    displays: RwLock<Vec<Arc<MemoryDisplay>>>,
    active: Mutex<Option<DisplayId>>,
    accepts: Acceptor,
}

impl MemoryDisplayService {
    pub fn new() -> Self {
        Self::with_acceptor(displayable)
    }

    /// Service whose surfaces accept only values matching `accepts`.
    pub fn with_acceptor(accepts: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            displays: RwLock::new(Vec::new()),
            active: Mutex::new(None),
            accepts: Arc::new(accepts),
        }
    }

    /// Put `value` on a new named surface regardless of the acceptor.
    pub fn show(&self, name: &str, value: &Value) -> Arc<MemoryDisplay> {
        let display = Arc::new(MemoryDisplay::new(self.accepts.clone()));
        display.set_name(name);
        display.display(value);
        self.push(display.clone());
        display
    }

    pub fn displays(&self) -> Vec<Arc<MemoryDisplay>> {
        self.displays.read().clone()
    }

    pub fn display_named(&self, name: &str) -> Option<Arc<MemoryDisplay>> {
        self.displays
            .read()
            .iter()
            .find(|d| d.name().as_deref() == Some(name))
            .cloned()
    }

    pub fn set_active(&self, id: Option<DisplayId>) {
        *self.active.lock() = id;
    }

    pub fn len(&self) -> usize {
        self.displays.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.read().is_empty()
    }

    fn push(&self, display: Arc<MemoryDisplay>) {
        let id = display.id();
        self.displays.write().push(display);
        *self.active.lock() = Some(id);
    }
}

impl Default for MemoryDisplayService {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayService for MemoryDisplayService {
    fn displays_of(&self, value: &Value) -> Vec<DisplayHandle> {
        self.displays
            .read()
            .iter()
            .filter(|d| d.shows(value))
            .map(|d| d.clone() as DisplayHandle)
            .collect()
    }

    fn active_display(&self) -> Option<DisplayHandle> {
        let id = (*self.active.lock())?;
        self.displays
            .read()
            .iter()
            .find(|d| d.id() == id)
            .map(|d| d.clone() as DisplayHandle)
    }

    fn create_display(&self, value: &Value) -> Option<DisplayHandle> {
        if !(self.accepts)(value) {
            return None;
        }
        let created = Arc::new(MemoryDisplay::new(self.accepts.clone()));
        created.display(value);
        tracing::debug!("Created display {} for {}", created.id(), value.type_name());
        self.push(created.clone());
        Some(created)
    }
}
