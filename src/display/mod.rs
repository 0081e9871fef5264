//! Display surfaces and the output routing postprocessor.
//!
//! The framework does not render anything itself. A [`DisplayService`]
//! registered in the [`crate::context::Context`] (as `dyn DisplayService`)
//! owns the surfaces; [`DisplayPostprocessor`] decides which surfaces receive
//! each module output.

pub mod memory;
pub mod postprocessor;

pub use memory::{MemoryDisplay, MemoryDisplayService};
pub use postprocessor::{default_name, DisplayPostprocessor};

use crate::module::value::Value;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Process-unique display identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u32);

static NEXT_DISPLAY_ID: AtomicU32 = AtomicU32::new(1);

impl DisplayId {
    pub fn next() -> Self {
        Self(NEXT_DISPLAY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayId({})", self.0)
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stateful view onto one or more values.
pub trait Display: Send + Sync {
    fn id(&self) -> DisplayId;

    fn name(&self) -> Option<String>;

    fn set_name(&self, name: &str);

    fn can_display(&self, value: &Value) -> bool;

    /// Add `value` to the surface.
    fn display(&self, value: &Value);

    /// Refresh after the shown values changed.
    fn update(&self);
}

pub type DisplayHandle = Arc<dyn Display>;

/// Owner of the display surfaces.
pub trait DisplayService: Send + Sync {
    /// Surfaces currently showing `value`.
    fn displays_of(&self, value: &Value) -> Vec<DisplayHandle>;

    fn active_display(&self) -> Option<DisplayHandle>;

    /// A new surface showing `value`, or `None` when no surface type fits.
    fn create_display(&self, value: &Value) -> Option<DisplayHandle>;
}
