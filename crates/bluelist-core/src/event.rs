//! Typed notifications emitted by the external device registry.

use crate::device::PropertyValue;

/// One notification from the Bluetooth daemon, keyed by object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    DeviceAdded { path: String },
    DeviceRemoved { path: String },
    BatteryAdded { path: String },
    PropertyChanged {
        path: String,
        key: String,
        value: PropertyValue,
    },
}

impl RegistryEvent {
    /// Object path the event refers to.
    pub fn path(&self) -> &str {
        match self {
            RegistryEvent::DeviceAdded { path }
            | RegistryEvent::DeviceRemoved { path }
            | RegistryEvent::BatteryAdded { path }
            | RegistryEvent::PropertyChanged { path, .. } => path,
        }
    }
}
