//! Prelude module for Tessera.
//!
//! ```ignore
//! use tessera::prelude::*;
//! ```

// ============================================================================
// Core Primitives
// ============================================================================

pub use tessera_core::{ConnectionId, Signal, TimerId, TimerService};

// ============================================================================
// Input
// ============================================================================

pub use crate::input::{
    DeviceId, GestureIdentity, InputEvent, InputEventKind, MouseButton, Point, SequenceId,
};

// ============================================================================
// Controllers
// ============================================================================

pub use crate::controller::{
    Controller, ControllerContext, ControllerFlags, ControllerId, ControllerState,
    EventController, LongPressConfig, LongPressController, LongPressEvent,
};

// ============================================================================
// Widgets
// ============================================================================

pub use crate::widget::{WeakWidget, Widget, WidgetId};

// ============================================================================
// Layout and Metadata
// ============================================================================

pub use crate::attributes::{AttributeStore, FileAttributes};
pub use crate::grid::{CellRect, OccupancyGrid};
pub use crate::settings::GestureSettings;

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{AttributeError, ConfigError};
