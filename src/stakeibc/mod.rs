//! Host Zone Registration
//!
//! - `HostZoneRegistry` owns registered zones and their account slots
//! - `RegistrationOrchestrator` runs the registration state machine and the
//!   admin operations built on top of it

pub mod error;
pub mod orchestrator;
pub mod registry;

pub use error::{RegistrationError, RegistryError};
pub use orchestrator::{RegistrationOrchestrator, RegistrationStage};
pub use registry::HostZoneRegistry;
