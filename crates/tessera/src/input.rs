//! Raw input events delivered to event controllers.
//!
//! An [`InputEvent`] is what a widget forwards to each attached controller:
//! an event kind, the device that produced it, an optional touch sequence,
//! and a position. The (device, sequence) pair is the event's
//! [`GestureIdentity`]; controllers use it to bind a run of events to one
//! physical input stream.
//!
//! # Usage
//!
//! ```
//! use tessera::input::{DeviceId, InputEvent, MouseButton, Point, SequenceId};
//!
//! let mouse = DeviceId(1);
//! let press = InputEvent::button_press(mouse, MouseButton::Left, Point::new(10.0, 10.0));
//! assert!(press.is_press_begin());
//!
//! let finger = InputEvent::touch_begin(DeviceId(2), SequenceId(7), Point::new(50.0, 50.0));
//! assert_ne!(press.identity(), finger.identity());
//! ```

use std::ops::{Add, Sub};

/// A point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// The origin point (0, 0).
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Absolute per-axis distance to another point.
    #[inline]
    pub fn axis_delta(self, other: Point) -> (f32, f32) {
        ((self.x - other.x).abs(), (self.y - other.y).abs())
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(self, other: Point) -> f32 {
        let (dx, dy) = self.axis_delta(other);
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Identifies one input device (a mouse, a touchscreen, a pen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

/// Distinguishes concurrent touch points on the same device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(pub u64);

/// The (device, sequence) pair naming one physical input stream.
///
/// Pointer events carry no sequence; each touch point has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GestureIdentity {
    /// The device producing the stream.
    pub device: DeviceId,
    /// The touch sequence, `None` for pointer input.
    pub sequence: Option<SequenceId>,
}

impl GestureIdentity {
    /// Create a new identity.
    pub const fn new(device: DeviceId, sequence: Option<SequenceId>) -> Self {
        Self { device, sequence }
    }
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    /// Primary button (usually left).
    Left = 0,
    /// Secondary button (usually right).
    Right = 1,
    /// Middle button (scroll wheel click).
    Middle = 2,
    /// Additional button 1 (e.g., browser back).
    Button4 = 3,
    /// Additional button 2 (e.g., browser forward).
    Button5 = 4,
}

impl MouseButton {
    /// Returns true for the primary button.
    pub fn is_primary(self) -> bool {
        self == MouseButton::Left
    }
}

/// The kind of an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    /// A pointer button went down.
    ButtonPress(MouseButton),
    /// A pointer button went up.
    ButtonRelease(MouseButton),
    /// The pointer moved.
    Motion,
    /// A touch point made contact.
    TouchBegin,
    /// A touch point moved.
    TouchUpdate,
    /// A touch point lifted.
    TouchEnd,
    /// The platform took a touch point away (e.g. palm rejection).
    TouchCancel,
}

/// An input event as delivered to event controllers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    /// What happened.
    pub kind: InputEventKind,
    /// The device that produced the event.
    pub device: DeviceId,
    /// The touch sequence, if this is touch input.
    pub sequence: Option<SequenceId>,
    /// Position in widget-local coordinates.
    pub position: Point,
    /// Position in root (screen) coordinates, if the platform supplied one.
    pub root_position: Option<Point>,
}

impl InputEvent {
    /// Create an event from its parts.
    pub fn new(
        kind: InputEventKind,
        device: DeviceId,
        sequence: Option<SequenceId>,
        position: Point,
    ) -> Self {
        Self {
            kind,
            device,
            sequence,
            position,
            root_position: None,
        }
    }

    /// A pointer button press.
    pub fn button_press(device: DeviceId, button: MouseButton, position: Point) -> Self {
        Self::new(InputEventKind::ButtonPress(button), device, None, position)
    }

    /// A pointer button release.
    pub fn button_release(device: DeviceId, button: MouseButton, position: Point) -> Self {
        Self::new(InputEventKind::ButtonRelease(button), device, None, position)
    }

    /// A pointer motion.
    pub fn motion(device: DeviceId, position: Point) -> Self {
        Self::new(InputEventKind::Motion, device, None, position)
    }

    /// A touch point making contact.
    pub fn touch_begin(device: DeviceId, sequence: SequenceId, position: Point) -> Self {
        Self::new(InputEventKind::TouchBegin, device, Some(sequence), position)
    }

    /// A touch point moving.
    pub fn touch_update(device: DeviceId, sequence: SequenceId, position: Point) -> Self {
        Self::new(InputEventKind::TouchUpdate, device, Some(sequence), position)
    }

    /// A touch point lifting.
    pub fn touch_end(device: DeviceId, sequence: SequenceId, position: Point) -> Self {
        Self::new(InputEventKind::TouchEnd, device, Some(sequence), position)
    }

    /// A touch point taken away by the platform.
    pub fn touch_cancel(device: DeviceId, sequence: SequenceId, position: Point) -> Self {
        Self::new(InputEventKind::TouchCancel, device, Some(sequence), position)
    }

    /// Set an explicit root-coordinate position.
    pub fn with_root_position(mut self, root_position: Point) -> Self {
        self.root_position = Some(root_position);
        self
    }

    /// The identity of the input stream this event belongs to.
    pub fn identity(&self) -> GestureIdentity {
        GestureIdentity::new(self.device, self.sequence)
    }

    /// The root-coordinate position, or the widget-local one if none was supplied.
    pub fn root_position(&self) -> Point {
        self.root_position.unwrap_or(self.position)
    }

    /// Returns true for a primary-button press or a touch begin.
    pub fn is_press_begin(&self) -> bool {
        match self.kind {
            InputEventKind::ButtonPress(button) => button.is_primary(),
            InputEventKind::TouchBegin => true,
            _ => false,
        }
    }

    /// Returns true for a primary-button release, a touch end, or a touch cancel.
    pub fn is_release_end(&self) -> bool {
        match self.kind {
            InputEventKind::ButtonRelease(button) => button.is_primary(),
            InputEventKind::TouchEnd | InputEventKind::TouchCancel => true,
            _ => false,
        }
    }

    /// Returns true for pointer motion or touch updates.
    pub fn is_motion(&self) -> bool {
        matches!(self.kind, InputEventKind::Motion | InputEventKind::TouchUpdate)
    }

    /// Returns true for events produced by touch input.
    pub fn is_touch(&self) -> bool {
        matches!(
            self.kind,
            InputEventKind::TouchBegin
                | InputEventKind::TouchUpdate
                | InputEventKind::TouchEnd
                | InputEventKind::TouchCancel
        )
    }

    /// Rewrite primary-button pointer events as their touch equivalents.
    ///
    /// Press becomes touch-begin, motion becomes touch-update and release
    /// becomes touch-end. The identity is unchanged: emulated touches have no
    /// sequence. Any other event is returned as is.
    pub fn as_emulated_touch(&self) -> InputEvent {
        let kind = match self.kind {
            InputEventKind::ButtonPress(button) if button.is_primary() => {
                InputEventKind::TouchBegin
            }
            InputEventKind::ButtonRelease(button) if button.is_primary() => {
                InputEventKind::TouchEnd
            }
            InputEventKind::Motion => InputEventKind::TouchUpdate,
            other => other,
        };
        InputEvent { kind, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_distinguishes_sequences() {
        let device = DeviceId(3);
        let a = InputEvent::touch_begin(device, SequenceId(1), Point::ORIGIN);
        let b = InputEvent::touch_begin(device, SequenceId(2), Point::ORIGIN);
        let mouse = InputEvent::button_press(device, MouseButton::Left, Point::ORIGIN);

        assert_ne!(a.identity(), b.identity());
        assert_ne!(a.identity(), mouse.identity());
        assert_eq!(mouse.identity(), GestureIdentity::new(device, None));
    }

    #[test]
    fn test_press_and_release_classification() {
        let device = DeviceId(1);
        let left = InputEvent::button_press(device, MouseButton::Left, Point::ORIGIN);
        let right = InputEvent::button_press(device, MouseButton::Right, Point::ORIGIN);
        let cancel = InputEvent::touch_cancel(device, SequenceId(4), Point::ORIGIN);

        assert!(left.is_press_begin());
        assert!(!right.is_press_begin());
        assert!(cancel.is_release_end());
        assert!(cancel.is_touch());
        assert!(InputEvent::motion(device, Point::ORIGIN).is_motion());
    }

    #[test]
    fn test_root_position_falls_back_to_local() {
        let event = InputEvent::motion(DeviceId(1), Point::new(4.0, 5.0));
        assert_eq!(event.root_position(), Point::new(4.0, 5.0));

        let event = event.with_root_position(Point::new(104.0, 205.0));
        assert_eq!(event.root_position(), Point::new(104.0, 205.0));
        assert_eq!(event.position, Point::new(4.0, 5.0));
    }

    #[test]
    fn test_emulated_touch_rewrites_primary_button() {
        let device = DeviceId(1);
        let press = InputEvent::button_press(device, MouseButton::Left, Point::new(1.0, 2.0));
        let emulated = press.as_emulated_touch();
        assert_eq!(emulated.kind, InputEventKind::TouchBegin);
        assert_eq!(emulated.identity(), press.identity());
        assert_eq!(emulated.position, press.position);

        let right = InputEvent::button_press(device, MouseButton::Right, Point::ORIGIN);
        assert_eq!(right.as_emulated_touch(), right);

        let motion = InputEvent::motion(device, Point::ORIGIN).as_emulated_touch();
        assert_eq!(motion.kind, InputEventKind::TouchUpdate);
    }

    #[test]
    fn test_point_deltas() {
        let a = Point::new(100.0, 200.0);
        let b = Point::new(125.0, 190.0);
        assert_eq!(a.axis_delta(b), (25.0, 10.0));
        assert_eq!(b - a, Point::new(25.0, -10.0));
        assert_eq!(a + Point::new(1.0, 1.0), Point::new(101.0, 201.0));
        assert!((Point::ORIGIN.distance_to(Point::new(3.0, 4.0)) - 5.0).abs() < f32::EPSILON);
    }
}
