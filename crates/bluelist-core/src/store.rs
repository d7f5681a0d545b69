//! PropertyStore - in-memory device registry with change notification.
//!
//! Stands in for the daemon's object model: it owns the per-device property
//! maps, answers `DeviceSource` reads, and tells subscribers about
//! membership and property changes as `RegistryEvent`s.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::trace;

use crate::callbacks::{CallbackId, Callbacks};
use crate::device::{DeviceProperties, DeviceSource, PropertyValue};
use crate::event::RegistryEvent;

#[derive(Default)]
pub struct PropertyStore {
    devices: RefCell<HashMap<String, DeviceProperties>>,
    adapters: RefCell<HashMap<String, String>>,
    callbacks: Callbacks<RegistryEvent>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to registry events. Keep the id to cancel later.
    pub fn connect<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&RegistryEvent) + 'static,
    {
        self.callbacks.register(callback)
    }

    pub fn disconnect(&self, id: CallbackId) -> bool {
        self.callbacks.unregister(id)
    }

    /// Publish a device.
    ///
    /// Re-adding a known path is not a second announcement: each key whose
    /// value differs is applied as a property change, and keys missing from
    /// `properties` keep their current values.
    pub fn add_device(&self, path: &str, properties: DeviceProperties) {
        if self.contains(path) {
            trace!("PropertyStore: {} already published, merging", path);
            for (key, value) in properties.iter() {
                self.set_property(path, key, value.clone());
            }
            return;
        }

        self.devices
            .borrow_mut()
            .insert(path.to_string(), properties);
        self.emit(RegistryEvent::DeviceAdded {
            path: path.to_string(),
        });
    }

    /// Withdraw a device. Returns false (and emits nothing) for unknown paths.
    pub fn remove_device(&self, path: &str) -> bool {
        let removed = self.devices.borrow_mut().remove(path).is_some();
        if removed {
            self.emit(RegistryEvent::DeviceRemoved {
                path: path.to_string(),
            });
        }
        removed
    }

    pub fn add_battery(&self, path: &str) {
        self.emit(RegistryEvent::BatteryAdded {
            path: path.to_string(),
        });
    }

    /// Update one property. Subscribers hear about it only if the value
    /// actually changed; unknown devices are ignored.
    pub fn set_property(&self, path: &str, key: &str, value: impl Into<PropertyValue>) -> bool {
        let value = value.into();
        let changed = match self.devices.borrow_mut().get_mut(path) {
            Some(props) => props.insert(key, value.clone()),
            None => {
                trace!("PropertyStore: ignoring {} for unknown device {}", key, path);
                false
            }
        };

        if changed {
            self.emit(RegistryEvent::PropertyChanged {
                path: path.to_string(),
                key: key.to_string(),
                value,
            });
        }
        changed
    }

    pub fn set_adapter_name(&self, adapter_path: &str, name: &str) {
        self.adapters
            .borrow_mut()
            .insert(adapter_path.to_string(), name.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.devices.borrow().contains_key(path)
    }

    /// Object paths currently published, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.devices.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn emit(&self, event: RegistryEvent) {
        trace!("PropertyStore: {:?}", event);
        self.callbacks.notify(&event);
    }
}

impl DeviceSource for PropertyStore {
    fn properties(&self, path: &str) -> Option<DeviceProperties> {
        self.devices.borrow().get(path).cloned()
    }

    fn adapter_name(&self, adapter_path: &str) -> Option<String> {
        self.adapters.borrow().get(adapter_path).cloned()
    }
}
