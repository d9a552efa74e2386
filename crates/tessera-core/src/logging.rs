//! Logging facilities for Tessera.
//!
//! Tessera uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every event is logged under one of the constants in [`targets`], so a
//! filter such as `RUST_LOG=tessera::long_press=debug,tessera_core::timer=trace`
//! selects individual subsystems.

/// Target names for log filtering.
pub mod targets {
    /// Timer system target.
    pub const TIMER: &str = "tessera_core::timer";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tessera_core::signal";
    /// Controller attach/detach and lifecycle target.
    pub const CONTROLLER: &str = "tessera::controller";
    /// Long-press recognizer target.
    pub const LONG_PRESS: &str = "tessera::long_press";
    /// Widget event delivery target.
    pub const WIDGET: &str = "tessera::widget";
    /// Occupancy grid target.
    pub const GRID: &str = "tessera::grid";
    /// File attribute persistence target.
    pub const ATTRIBUTES: &str = "tessera::attributes";
    /// Settings loading target.
    pub const SETTINGS: &str = "tessera::settings";
}
