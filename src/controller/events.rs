//! Controller event types.
//!
//! Every event the pilot can react to is one variant of [`ControllerEvent`];
//! the payload shape is fixed per variant, so an axis event always carries a
//! value and a button event never does.

/// Largest magnitude a raw axis value can take.
pub const AXIS_MAX_VALUE: i32 = 32768;

/// Digital inputs, named after the DualShock 4 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Cross,
    Circle,
    Square,
    Triangle,
    L1,
    R1,
    L2,
    R2,
    Share,
    Options,
    Ps,
    L3,
    R3,
    Touchpad,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

/// Analog stick axes. Positive is right (X) or down (Y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// One input occurrence from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A button went down.
    ButtonPress(Button),
    /// An axis moved to a new signed position in `-32768..=32767`.
    Axis(Axis, i16),
}
