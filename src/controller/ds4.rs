//! # DualShock 4 Controller Module
//!
//! Detects a PS4 DualShock 4 controller through the Linux evdev interface and
//! turns its raw input events into [`ControllerEvent`]s.
//!
//! ## Controller Detection
//!
//! The DualShock 4 is identified by:
//! - Vendor ID: 0x054c (Sony)
//! - Product ID: 0x05c4 (first revision), 0x09cc (second revision) or
//!   0x0ba0 (USB wireless adaptor)
//!
//! The kernel exposes several event nodes per controller. The gamepad node is
//! the one reporting `BTN_SOUTH`; the touchpad node, when present, reports its
//! click as `BTN_LEFT`.
//!
//! ## Input Mapping
//!
//! | evdev Code | Range | Event |
//! |------------|-------|-------|
//! | ABS_X / ABS_Y | 0-255 | Left stick X / Y |
//! | ABS_RX / ABS_RY | 0-255 | Right stick X / Y |
//! | ABS_HAT0X | -1/0/1 | D-Pad left / right press |
//! | ABS_HAT0Y | -1/0/1 | D-Pad up / down press |
//! | BTN_* | 0/1 | Button press (releases ignored) |
//!
//! Stick values are re-centred onto the signed range `-32768..=32767`.

use evdev::{AbsoluteAxisType, Device, InputEvent, InputEventKind, Key};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::events::{Axis, Button, ControllerEvent};
use crate::error::{PilotError, Result};

/// Sony vendor ID
const SONY_VENDOR_ID: u16 = 0x054c;

/// DualShock 4 product IDs (v1, v2, wireless adaptor)
const DUALSHOCK4_PRODUCT_IDS: &[u16] = &[0x05c4, 0x09cc, 0x0ba0];

/// Raw stick centre reported by the DualShock 4.
pub const AXIS_CENTER: i32 = 128;

/// Scale from the 8-bit stick range to the signed 16-bit range.
const AXIS_SCALE: i32 = 256;

/// One opened evdev node.
struct InputNode {
    device: Device,
    path: String,
}

/// DualShock 4 controller handle.
pub struct DualShock4 {
    gamepad: InputNode,
    touchpad: Option<InputNode>,
}

impl std::fmt::Debug for DualShock4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualShock4")
            .field("gamepad", &self.gamepad.path)
            .field("touchpad", &self.touchpad.as_ref().map(|t| &t.path))
            .finish()
    }
}

impl DualShock4 {
    /// Detect and open the first available DualShock 4.
    ///
    /// Scans `/dev/input/event*` in sorted order and matches vendor and
    /// product IDs.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no DualShock 4 gamepad node found
    /// - `Controller`: `/dev/input` cannot be read
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tello_pilot::controller::ds4::DualShock4;
    ///
    /// let controller = DualShock4::open()?;
    /// println!("Connected to controller at: {}", controller.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(PilotError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(input_dir)
            .map_err(|e| PilotError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();

        // Deterministic selection when several controllers are connected
        entries.sort();

        let mut gamepad = None;
        let mut touchpad = None;

        for path in entries {
            let device = match Device::open(&path) {
                Ok(device) => device,
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                    continue;
                }
            };

            let id = device.input_id();
            debug!(
                "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                path.display(),
                id.vendor(),
                id.product()
            );

            if id.vendor() != SONY_VENDOR_ID || !DUALSHOCK4_PRODUCT_IDS.contains(&id.product()) {
                continue;
            }

            let node = InputNode {
                path: path.to_string_lossy().to_string(),
                device,
            };
            if gamepad.is_none() && supports_key(&node.device, Key::BTN_SOUTH) {
                info!("Found DualShock 4 gamepad at: {}", node.path);
                gamepad = Some(node);
            } else if touchpad.is_none() && supports_key(&node.device, Key::BTN_LEFT) {
                info!("Found DualShock 4 touchpad at: {}", node.path);
                touchpad = Some(node);
            }
        }

        match gamepad {
            Some(gamepad) => Ok(Self { gamepad, touchpad }),
            None => Err(PilotError::ControllerNotFound),
        }
    }

    /// Open an explicit gamepad node, skipping detection. No touchpad is used.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path)
            .map_err(|e| {
                PilotError::Controller(format!("Failed to open {}: {}", path.display(), e))
            })?;
        info!("Opened controller at: {}", path.display());
        Ok(Self {
            gamepad: InputNode {
                device,
                path: path.to_string_lossy().to_string(),
            },
            touchpad: None,
        })
    }

    /// Path of the gamepad event node.
    pub fn device_path(&self) -> &str {
        &self.gamepad.path
    }

    /// Human-readable device name, e.g. "Wireless Controller".
    pub fn name(&self) -> Option<&str> {
        self.gamepad.device.name()
    }

    /// Starts one blocking reader per event node, each pushing decoded events
    /// into `tx` in arrival order.
    ///
    /// A reader stops when its device fails (e.g. controller unplugged) or
    /// when the receiving side of `tx` is dropped.
    pub fn spawn_readers(self, tx: mpsc::Sender<ControllerEvent>) -> Vec<JoinHandle<()>> {
        let mut handles = vec![spawn_reader(self.gamepad, tx.clone())];
        if let Some(touchpad) = self.touchpad {
            handles.push(spawn_reader(touchpad, tx));
        }
        handles
    }
}

fn supports_key(device: &Device, key: Key) -> bool {
    device
        .supported_keys()
        .map(|keys| keys.contains(key))
        .unwrap_or(false)
}

fn spawn_reader(mut node: InputNode, tx: mpsc::Sender<ControllerEvent>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || loop {
        let events = match node.device.fetch_events() {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to fetch events from {}: {}", node.path, e);
                return;
            }
        };
        for event in events {
            if let Some(event) = decode_event(&event) {
                if tx.blocking_send(event).is_err() {
                    debug!("Controller channel closed, stopping reader for {}", node.path);
                    return;
                }
            }
        }
    })
}

/// Converts one raw evdev event into a controller event.
///
/// Returns `None` for sync events, button releases, D-Pad releases and any
/// code without a binding.
#[must_use]
pub fn decode_event(event: &InputEvent) -> Option<ControllerEvent> {
    match event.kind() {
        InputEventKind::AbsAxis(axis) => decode_axis(axis, event.value()),
        // 1 = press, 0 = release, 2 = autorepeat
        InputEventKind::Key(key) if event.value() == 1 => {
            decode_button(key).map(ControllerEvent::ButtonPress)
        }
        _ => None,
    }
}

fn decode_axis(axis: AbsoluteAxisType, value: i32) -> Option<ControllerEvent> {
    let stick = |axis| Some(ControllerEvent::Axis(axis, center_axis(value)));
    match axis {
        AbsoluteAxisType::ABS_X => stick(Axis::LeftX),
        AbsoluteAxisType::ABS_Y => stick(Axis::LeftY),
        AbsoluteAxisType::ABS_RX => stick(Axis::RightX),
        AbsoluteAxisType::ABS_RY => stick(Axis::RightY),
        AbsoluteAxisType::ABS_HAT0X => match value {
            v if v < 0 => Some(ControllerEvent::ButtonPress(Button::DpadLeft)),
            v if v > 0 => Some(ControllerEvent::ButtonPress(Button::DpadRight)),
            _ => None,
        },
        AbsoluteAxisType::ABS_HAT0Y => match value {
            v if v < 0 => Some(ControllerEvent::ButtonPress(Button::DpadUp)),
            v if v > 0 => Some(ControllerEvent::ButtonPress(Button::DpadDown)),
            _ => None,
        },
        // Triggers, gyro and accelerometer are unused
        _ => None,
    }
}

fn decode_button(key: Key) -> Option<Button> {
    let button = match key {
        Key::BTN_SOUTH => Button::Cross,
        Key::BTN_EAST => Button::Circle,
        Key::BTN_WEST => Button::Square,
        Key::BTN_NORTH => Button::Triangle,
        Key::BTN_TL => Button::L1,
        Key::BTN_TR => Button::R1,
        Key::BTN_TL2 => Button::L2,
        Key::BTN_TR2 => Button::R2,
        Key::BTN_SELECT => Button::Share,
        Key::BTN_START => Button::Options,
        Key::BTN_MODE => Button::Ps,
        Key::BTN_THUMBL => Button::L3,
        Key::BTN_THUMBR => Button::R3,
        // Touchpad click on the separate touchpad node
        Key::BTN_LEFT => Button::Touchpad,
        _ => return None,
    };
    Some(button)
}

/// Maps a raw 0-255 stick value onto `-32768..=32767` (128 = 0).
#[must_use]
pub fn center_axis(raw: i32) -> i16 {
    raw.saturating_sub(AXIS_CENTER)
        .saturating_mul(AXIS_SCALE)
        .clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    #[test]
    fn test_sony_ids() {
        assert_eq!(SONY_VENDOR_ID, 0x054c, "Sony vendor ID should be 0x054c");
        assert!(DUALSHOCK4_PRODUCT_IDS.contains(&0x05c4));
        assert!(DUALSHOCK4_PRODUCT_IDS.contains(&0x09cc));
    }

    // ==================== Axis Tests ====================

    #[test]
    fn test_center_axis() {
        assert_eq!(center_axis(128), 0);
        assert_eq!(center_axis(0), i16::MIN);
        assert_eq!(center_axis(255), 32512);
        assert_eq!(center_axis(64), -16384);
    }

    #[test]
    fn test_center_axis_out_of_range() {
        assert_eq!(center_axis(-500), i16::MIN);
        assert_eq!(center_axis(1000), i16::MAX);
        assert_eq!(center_axis(i32::MAX), i16::MAX);
        assert_eq!(center_axis(i32::MIN), i16::MIN);
    }

    #[test]
    fn test_decode_stick_axes() {
        let cases = [
            (AbsoluteAxisType::ABS_X, Axis::LeftX),
            (AbsoluteAxisType::ABS_Y, Axis::LeftY),
            (AbsoluteAxisType::ABS_RX, Axis::RightX),
            (AbsoluteAxisType::ABS_RY, Axis::RightY),
        ];
        for (code, axis) in cases {
            assert_eq!(
                decode_event(&make_axis_event(code, 0)),
                Some(ControllerEvent::Axis(axis, i16::MIN)),
                "{:?} should map to {:?}",
                code,
                axis
            );
        }
    }

    #[test]
    fn test_decode_triggers_ignored() {
        assert_eq!(decode_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 255)), None);
        assert_eq!(decode_event(&make_axis_event(AbsoluteAxisType::ABS_RZ, 255)), None);
    }

    #[test]
    fn test_decode_dpad() {
        let cases = [
            (AbsoluteAxisType::ABS_HAT0X, -1, Button::DpadLeft),
            (AbsoluteAxisType::ABS_HAT0X, 1, Button::DpadRight),
            (AbsoluteAxisType::ABS_HAT0Y, -1, Button::DpadUp),
            (AbsoluteAxisType::ABS_HAT0Y, 1, Button::DpadDown),
        ];
        for (code, value, button) in cases {
            assert_eq!(
                decode_event(&make_axis_event(code, value)),
                Some(ControllerEvent::ButtonPress(button))
            );
        }
    }

    #[test]
    fn test_decode_dpad_release_ignored() {
        assert_eq!(decode_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 0)), None);
        assert_eq!(decode_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, 0)), None);
    }

    // ==================== Button Tests ====================

    #[test]
    fn test_decode_face_buttons() {
        let cases = [
            (Key::BTN_SOUTH, Button::Cross),
            (Key::BTN_EAST, Button::Circle),
            (Key::BTN_WEST, Button::Square),
            (Key::BTN_NORTH, Button::Triangle),
        ];
        for (key, button) in cases {
            assert_eq!(
                decode_event(&make_key_event(key, 1)),
                Some(ControllerEvent::ButtonPress(button))
            );
        }
    }

    #[test]
    fn test_decode_system_buttons() {
        assert_eq!(
            decode_event(&make_key_event(Key::BTN_START, 1)),
            Some(ControllerEvent::ButtonPress(Button::Options))
        );
        assert_eq!(
            decode_event(&make_key_event(Key::BTN_LEFT, 1)),
            Some(ControllerEvent::ButtonPress(Button::Touchpad))
        );
        assert_eq!(
            decode_event(&make_key_event(Key::BTN_MODE, 1)),
            Some(ControllerEvent::ButtonPress(Button::Ps))
        );
    }

    #[test]
    fn test_decode_release_and_repeat_ignored() {
        assert_eq!(decode_event(&make_key_event(Key::BTN_SOUTH, 0)), None);
        assert_eq!(decode_event(&make_key_event(Key::BTN_SOUTH, 2)), None);
    }

    #[test]
    fn test_decode_unknown_key_ignored() {
        assert_eq!(decode_event(&make_key_event(Key::KEY_A, 1)), None);
    }

    #[test]
    fn test_decode_sync_ignored() {
        let sync = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(decode_event(&sync), None);
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_open_with_real_hardware() {
        // This test requires a connected DualShock 4
        let result = DualShock4::open();
        assert!(result.is_ok(), "Should detect connected DualShock 4");

        let controller = result.unwrap();
        assert!(controller.device_path().starts_with("/dev/input/event"));
        assert!(controller.name().is_some());
    }
}
