//! Core types and traits for HomeLink.
//!
//! This crate defines the device/rule data model, the normalized reading
//! representation, and the store traits the pipeline and evaluator are
//! built against.

pub mod config;
pub mod model;
pub mod reading;
pub mod store;

pub use model::{
    AutomationRule, Comparator, Device, DeviceId, DeviceKind, DeviceLog, RelayAction, RuleId,
    RuleKind,
};
pub use reading::Reading;
pub use store::{DeviceStore, LogStore, RuleStore, StoreError};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::model::{
        AutomationRule, Comparator, Device, DeviceId, DeviceKind, DeviceLog, RelayAction, RuleId,
        RuleKind,
    };
    pub use crate::reading::Reading;
    pub use crate::store::{DeviceStore, LogStore, RuleStore, StoreError};
}
