//! # Command Translator
//!
//! Turns controller events into vehicle commands.
//!
//! ## Axis Bindings
//!
//! Each stick axis drives a pair of opposite motions. A raw value `>= 0`
//! (stick right or down) selects the first member of the pair, a negative
//! value the second. The magnitude is always `|raw| / 32768`, clamped to 1.0.
//!
//! | Axis | raw >= 0 | raw < 0 |
//! |------|----------|---------|
//! | Right Stick Y | Backward | Forward |
//! | Right Stick X | Right | Left |
//! | Left Stick Y | Down | Up |
//! | Left Stick X | Clockwise | Counter-clockwise |
//!
//! ## Button Bindings
//!
//! | Button | Action |
//! |--------|--------|
//! | Triangle (△) | Takeoff |
//! | Cross (×) | Land |
//! | Square (□) | Throw takeoff (not supported by the Tello SDK link) |
//! | Circle (○) | Print status line |
//! | Options | Toggle speed |
//! | Touchpad | Toggle bounce (not supported by the Tello SDK link) |
//! | D-Pad | Flip in the pressed direction |
//!
//! The SDK link rejects throw takeoff and bounce, and the dispatcher logs a
//! warning, so with that link Square and Touchpad do nothing.
//!
//! Any other button does nothing. Commands go out regardless of the
//! connection state; delivery is the link's problem.

use tracing::{debug, info};

use super::calibration::Calibration;
use super::events::{Axis, Button, ControllerEvent};
use crate::context::PilotContext;
use crate::vehicle::command::{
    FlipDirection, Magnitude, MoveDirection, RotateDirection, VehicleCommand,
};

/// What a single controller event asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Send this command to the vehicle.
    Dispatch(VehicleCommand),
    /// Print the current telemetry.
    ReportStatus,
}

/// Motion pair bound to one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisBinding {
    Translate {
        positive: MoveDirection,
        negative: MoveDirection,
    },
    Yaw {
        positive: RotateDirection,
        negative: RotateDirection,
    },
}

fn axis_binding(axis: Axis) -> AxisBinding {
    match axis {
        Axis::RightY => AxisBinding::Translate {
            positive: MoveDirection::Backward,
            negative: MoveDirection::Forward,
        },
        Axis::RightX => AxisBinding::Translate {
            positive: MoveDirection::Right,
            negative: MoveDirection::Left,
        },
        Axis::LeftY => AxisBinding::Translate {
            positive: MoveDirection::Down,
            negative: MoveDirection::Up,
        },
        Axis::LeftX => AxisBinding::Yaw {
            positive: RotateDirection::Clockwise,
            negative: RotateDirection::CounterClockwise,
        },
    }
}

fn button_action(button: Button) -> Option<Action> {
    let command = match button {
        Button::Triangle => VehicleCommand::Takeoff,
        Button::Cross => VehicleCommand::Land,
        Button::Square => VehicleCommand::ThrowTakeoff,
        Button::Options => VehicleCommand::ToggleSpeed,
        Button::Touchpad => VehicleCommand::ToggleBounce,
        Button::DpadUp => VehicleCommand::Flip(FlipDirection::Forward),
        Button::DpadDown => VehicleCommand::Flip(FlipDirection::Backward),
        Button::DpadLeft => VehicleCommand::Flip(FlipDirection::Left),
        Button::DpadRight => VehicleCommand::Flip(FlipDirection::Right),
        Button::Circle => return Some(Action::ReportStatus),
        Button::L1
        | Button::R1
        | Button::L2
        | Button::R2
        | Button::Share
        | Button::Ps
        | Button::L3
        | Button::R3 => return None,
    };
    Some(Action::Dispatch(command))
}

/// Maps one controller event to at most one action and performs it.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    calibration: Calibration,
    context: PilotContext,
}

impl CommandTranslator {
    #[must_use]
    pub fn new(calibration: Calibration, context: PilotContext) -> Self {
        Self {
            calibration,
            context,
        }
    }

    /// Pure mapping from event to action.
    ///
    /// Axis events always produce a command, even at zero magnitude.
    #[must_use]
    pub fn translate(&self, event: ControllerEvent) -> Option<Action> {
        match event {
            ControllerEvent::ButtonPress(button) => button_action(button),
            ControllerEvent::Axis(axis, raw) => {
                let magnitude = self.calibration.apply(raw);
                Some(Action::Dispatch(axis_command(axis, raw, magnitude)))
            }
        }
    }

    /// Translates `event` and carries out the result immediately.
    pub fn handle(&self, event: ControllerEvent) {
        match self.translate(event) {
            Some(Action::Dispatch(command)) => {
                debug!("{:?} -> {:?}", event, command);
                self.context.commands.send(command);
            }
            Some(Action::ReportStatus) => {
                let line = self.context.status_line();
                info!("{}", line);
                println!("{}", line);
            }
            None => debug!("No binding for {:?}", event),
        }
    }
}

fn axis_command(axis: Axis, raw: i16, magnitude: Magnitude) -> VehicleCommand {
    let positive = raw >= 0;
    match axis_binding(axis) {
        AxisBinding::Translate { positive: pos, negative: neg } => VehicleCommand::Move {
            direction: if positive { pos } else { neg },
            magnitude,
        },
        AxisBinding::Yaw { positive: pos, negative: neg } => VehicleCommand::Rotate {
            direction: if positive { pos } else { neg },
            magnitude,
        },
    }
}
