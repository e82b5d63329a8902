//! ClipSage Core: data model, configuration, errors and the change bus
//! shared by every state container.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod status;
pub mod types;

pub use config::ClipSageConfig;
pub use error::{Error, Result};
pub use events::{ChangeBus, Notifier, StateChange, StoreKind};
pub use ids::IdGenerator;
pub use status::{InFlight, OpStatus, StatusCell};
pub use types::*;
