//! Simulated robot
//!
//! Tracks gantry position and pipette bookkeeping without moving anything.
//! The engine drives it exactly as it would a real controller, which makes
//! it the backend for protocol analysis and for tests.

use alloc::format;
use alloc::vec::Vec;

use heapless::Deque;

use aliquot_core::motion::Waypoint;
use aliquot_core::protocol::{MotorAxis, Mount, PipetteName, Point};
use aliquot_core::traits::{HardwareControl, MotionError, PipetteError, PipetteHardwareInfo};

/// Highest reachable point of either mount
pub const DEFAULT_MAX_HEIGHT: f64 = 205.0;

/// Gantry XY after homing
pub const HOME_XY: (f64, f64) = (418.0, 353.0);

/// Moves kept in the log; older moves are dropped
pub const MOVE_LOG_CAPACITY: usize = 64;

/// One move as the simulator received it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedMove {
    pub mount: Mount,
    pub waypoint: Waypoint,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone)]
struct SimulatedPipette {
    info: PipetteHardwareInfo,
    /// Capacity with the current tip
    working_volume: f64,
}

impl SimulatedPipette {
    fn new(name: PipetteName) -> Self {
        let (min_volume, max_volume) = volume_range(name);
        let generation = if name.as_str().ends_with("_gen2") {
            "v2.0"
        } else {
            "v1.5"
        };
        Self {
            info: PipetteHardwareInfo {
                name,
                model: format!("{}_{}", name.as_str(), generation),
                min_volume,
                max_volume,
                channels: name.channels(),
                has_tip: false,
                ready_to_aspirate: false,
                current_volume: 0.0,
            },
            working_volume: 0.0,
        }
    }
}

/// Volume range in µL for each pipette model
fn volume_range(name: PipetteName) -> (f64, f64) {
    use PipetteName::*;
    match name {
        P10Single | P10Multi => (1.0, 10.0),
        P20SingleGen2 | P20MultiGen2 => (1.0, 20.0),
        P50Single | P50Multi => (5.0, 50.0),
        P300Single | P300Multi => (30.0, 300.0),
        P300SingleGen2 | P300MultiGen2 => (20.0, 300.0),
        P1000Single | P1000SingleGen2 => (100.0, 1000.0),
    }
}

/// A robot that exists only in memory
#[derive(Debug, Clone)]
pub struct SimulatedHardware {
    pipettes: [Option<SimulatedPipette>; 2],
    positions: [Point; 2],
    max_height: f64,
    homed: bool,
    halted: bool,
    /// Park every move forever, until the caller gives up on it
    hold_moves: bool,
    /// Fail the next move with this error
    motion_fault: Option<MotionError>,
    /// Fail the next plunger or tip action with this error
    pipette_fault: Option<PipetteError>,
    moves: Deque<RecordedMove, MOVE_LOG_CAPACITY>,
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHardware {
    /// A homed robot with no pipettes
    pub fn new() -> Self {
        let home = Point::new(HOME_XY.0, HOME_XY.1, DEFAULT_MAX_HEIGHT);
        Self {
            pipettes: [None, None],
            positions: [home, home],
            max_height: DEFAULT_MAX_HEIGHT,
            homed: true,
            halted: false,
            hold_moves: false,
            motion_fault: None,
            pipette_fault: None,
            moves: Deque::new(),
        }
    }

    pub fn with_pipette(mut self, mount: Mount, name: PipetteName) -> Self {
        self.attach_pipette(mount, name);
        self
    }

    pub fn attach_pipette(&mut self, mount: Mount, name: PipetteName) {
        info!("attach {} to mount {}", name.as_str(), mount.index());
        self.pipettes[mount.index()] = Some(SimulatedPipette::new(name));
    }

    pub fn detach_pipette(&mut self, mount: Mount) {
        self.pipettes[mount.index()] = None;
    }

    pub fn set_max_height(&mut self, max_height: f64) {
        self.max_height = max_height;
    }

    pub fn set_position(&mut self, mount: Mount, position: Point) {
        self.positions[mount.index()] = position;
    }

    /// Make every following move wait until it is cancelled
    pub fn hold_moves(&mut self, hold: bool) {
        self.hold_moves = hold;
    }

    /// Fail the next move with `error`
    pub fn inject_motion_fault(&mut self, error: MotionError) {
        self.motion_fault = Some(error);
    }

    /// Fail the next plunger or tip action with `error`
    pub fn inject_pipette_fault(&mut self, error: PipetteError) {
        self.pipette_fault = Some(error);
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Recent moves, oldest first
    pub fn moves(&self) -> Vec<RecordedMove> {
        self.moves.iter().copied().collect()
    }

    pub fn clear_moves(&mut self) {
        self.moves.clear();
    }

    pub fn pipette(&self, mount: Mount) -> Option<&PipetteHardwareInfo> {
        self.pipettes[mount.index()].as_ref().map(|p| &p.info)
    }

    fn pipette_mut(&mut self, mount: Mount) -> Result<&mut SimulatedPipette, PipetteError> {
        if let Some(error) = self.pipette_fault.take() {
            warn!("injected pipette fault");
            return Err(error);
        }
        self.pipettes[mount.index()]
            .as_mut()
            .ok_or(PipetteError::NotAttached(mount))
    }

    fn pipette_with_tip(&mut self, mount: Mount) -> Result<&mut SimulatedPipette, PipetteError> {
        let pipette = self.pipette_mut(mount)?;
        if !pipette.info.has_tip {
            return Err(PipetteError::NoTipAttached(mount));
        }
        Ok(pipette)
    }

    fn record(&mut self, mv: RecordedMove) {
        if self.moves.is_full() {
            self.moves.pop_front();
        }
        let _ = self.moves.push_back(mv);
    }
}

impl HardwareControl for SimulatedHardware {
    async fn move_to(
        &mut self,
        mount: Mount,
        waypoint: Waypoint,
        speed: Option<f64>,
    ) -> Result<(), MotionError> {
        if let Some(error) = self.motion_fault.take() {
            warn!("injected motion fault");
            return Err(error);
        }
        if !self.homed {
            return Err(MotionError::NotHomed(z_axis(mount)));
        }
        if waypoint.position.z > self.max_height {
            return Err(MotionError::OutOfBounds {
                z: waypoint.position.z,
                max_height: self.max_height,
            });
        }
        if self.hold_moves {
            core::future::pending::<()>().await;
        }
        trace!(
            "move mount {} to ({}, {}, {})",
            mount.index(),
            waypoint.position.x,
            waypoint.position.y,
            waypoint.position.z
        );
        self.record(RecordedMove {
            mount,
            waypoint,
            speed,
        });
        self.positions[mount.index()] = waypoint.position;
        Ok(())
    }

    async fn home(&mut self, axes: Option<&[MotorAxis]>) -> Result<(), MotionError> {
        let homes = |axis: MotorAxis| axes.map_or(true, |axes| axes.contains(&axis));
        for mount in Mount::ALL {
            let position = &mut self.positions[mount.index()];
            if homes(MotorAxis::X) {
                position.x = HOME_XY.0;
            }
            if homes(MotorAxis::Y) {
                position.y = HOME_XY.1;
            }
            if homes(z_axis(mount)) {
                position.z = self.max_height;
            }
            if homes(plunger_axis(mount)) {
                if let Some(pipette) = self.pipettes[mount.index()].as_mut() {
                    pipette.info.ready_to_aspirate = false;
                    pipette.info.current_volume = 0.0;
                }
            }
        }
        self.homed = true;
        self.halted = false;
        Ok(())
    }

    async fn prepare_for_aspirate(&mut self, mount: Mount) -> Result<(), PipetteError> {
        let pipette = self.pipette_mut(mount)?;
        pipette.info.ready_to_aspirate = true;
        Ok(())
    }

    async fn aspirate(
        &mut self,
        mount: Mount,
        volume: f64,
        _flow_rate: f64,
    ) -> Result<(), PipetteError> {
        let pipette = self.pipette_with_tip(mount)?;
        if !pipette.info.ready_to_aspirate && pipette.info.current_volume <= 0.0 {
            return Err(PipetteError::NotReadyToAspirate(mount));
        }
        let available = pipette.working_volume - pipette.info.current_volume;
        if volume > available {
            return Err(PipetteError::VolumeExceeded {
                requested: volume,
                available,
            });
        }
        pipette.info.current_volume += volume;
        pipette.info.ready_to_aspirate = true;
        Ok(())
    }

    async fn dispense(
        &mut self,
        mount: Mount,
        volume: f64,
        _flow_rate: f64,
    ) -> Result<(), PipetteError> {
        let pipette = self.pipette_with_tip(mount)?;
        if volume > pipette.info.current_volume {
            return Err(PipetteError::VolumeExceeded {
                requested: volume,
                available: pipette.info.current_volume,
            });
        }
        pipette.info.current_volume -= volume;
        Ok(())
    }

    async fn blow_out(&mut self, mount: Mount, _flow_rate: f64) -> Result<(), PipetteError> {
        let pipette = self.pipette_with_tip(mount)?;
        pipette.info.current_volume = 0.0;
        pipette.info.ready_to_aspirate = false;
        Ok(())
    }

    async fn pick_up_tip(
        &mut self,
        mount: Mount,
        _tip_length: f64,
        tip_volume: f64,
    ) -> Result<(), PipetteError> {
        let pipette = self.pipette_mut(mount)?;
        if pipette.info.has_tip {
            return Err(PipetteError::TipAlreadyAttached(mount));
        }
        pipette.info.has_tip = true;
        pipette.info.current_volume = 0.0;
        pipette.info.ready_to_aspirate = false;
        pipette.working_volume = tip_volume.min(pipette.info.max_volume);
        Ok(())
    }

    async fn drop_tip(&mut self, mount: Mount, home_after: bool) -> Result<(), PipetteError> {
        let pipette = self.pipette_with_tip(mount)?;
        pipette.info.has_tip = false;
        pipette.info.current_volume = 0.0;
        pipette.info.ready_to_aspirate = false;
        pipette.working_volume = 0.0;
        if home_after {
            self.positions[mount.index()].z = self.max_height;
        }
        Ok(())
    }

    async fn halt(&mut self) {
        info!("halt");
        self.halted = true;
        self.homed = false;
        self.hold_moves = false;
    }

    fn get_attached_pipette(&self, mount: Mount) -> Option<PipetteHardwareInfo> {
        self.pipette(mount).cloned()
    }

    fn instrument_max_height(&self, _mount: Mount) -> f64 {
        self.max_height
    }

    fn gantry_position(&self, mount: Mount) -> Point {
        self.positions[mount.index()]
    }
}

fn z_axis(mount: Mount) -> MotorAxis {
    match mount {
        Mount::Left => MotorAxis::LeftZ,
        Mount::Right => MotorAxis::RightZ,
    }
}

fn plunger_axis(mount: Mount) -> MotorAxis {
    match mount {
        Mount::Left => MotorAxis::LeftPlunger,
        Mount::Right => MotorAxis::RightPlunger,
    }
}
