//! Hardware abstraction traits
//!
//! These traits define the interface between the engine and whatever
//! drives the robot: real controllers, or the simulator used for protocol
//! analysis. The engine calls them the same way in both cases.

pub mod clock;
pub mod hardware;
pub mod labware;

pub use clock::Clock;
pub use hardware::{HardwareControl, HardwareError, MotionError, PipetteError, PipetteHardwareInfo};
pub use labware::LabwareProvider;
