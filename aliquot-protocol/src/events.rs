//! Run lifecycle and raw hardware events

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Overall status of a protocol run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum RunStatus {
    /// Commands may be queued; nothing executes yet
    Idle,
    /// Queued commands are being executed
    Running,
    /// Paused by a client; the running command finishes, no new one starts
    Paused,
    /// Paused because the robot door was opened
    BlockedByOpenDoor,
    /// Stop requested; waiting for the hardware to halt
    StopRequested,
    /// Run stopped by request
    Stopped,
    /// Finish requested; waiting for the hardware to settle
    Finishing,
    /// Run finished with an error
    Failed,
    /// Run finished cleanly
    Succeeded,
}

impl RunStatus {
    /// Check if the run can never execute another command
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Stopped | RunStatus::Failed | RunStatus::Succeeded
        )
    }

    /// Check if the queue should be worked
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    /// Check if new commands may still be queued
    pub fn accepts_commands(&self) -> bool {
        !self.is_terminal()
            && !matches!(self, RunStatus::StopRequested | RunStatus::Finishing)
    }
}

/// Why a run was paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum PauseSource {
    Client,
    Door,
}

/// Raw event reported by the hardware controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum HardwareEvent {
    /// Front door opened
    DoorOpened,
    /// Front door closed
    DoorClosed,
    /// Emergency stop button pressed
    EstopEngaged,
}

// Wire format values
const EVENT_DOOR_OPENED: u8 = 0x01;
const EVENT_DOOR_CLOSED: u8 = 0x02;
const EVENT_ESTOP_ENGAGED: u8 = 0x10;

impl HardwareEvent {
    /// Parse an event from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            EVENT_DOOR_OPENED => Some(HardwareEvent::DoorOpened),
            EVENT_DOOR_CLOSED => Some(HardwareEvent::DoorClosed),
            EVENT_ESTOP_ENGAGED => Some(HardwareEvent::EstopEngaged),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            HardwareEvent::DoorOpened => EVENT_DOOR_OPENED,
            HardwareEvent::DoorClosed => EVENT_DOOR_CLOSED,
            HardwareEvent::EstopEngaged => EVENT_ESTOP_ENGAGED,
        }
    }
}
