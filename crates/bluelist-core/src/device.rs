//! Device property model as published by the Bluetooth daemon.
//!
//! The engine only ever reads these values. Every getter is total: a missing
//! key or a value of the wrong type yields the neutral default, so one
//! device's malformed data can never stall the event pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property keys the engine reacts to.
pub mod keys {
    pub const ADDRESS: &str = "Address";
    pub const ALIAS: &str = "Alias";
    pub const NAME: &str = "Name";
    pub const CLASS: &str = "Class";
    pub const APPEARANCE: &str = "Appearance";
    pub const PAIRED: &str = "Paired";
    pub const TRUSTED: &str = "Trusted";
    pub const BLOCKED: &str = "Blocked";
    pub const CONNECTED: &str = "Connected";
    pub const ICON: &str = "Icon";
    pub const ADAPTER: &str = "Adapter";
    pub const PERCENTAGE: &str = "Percentage";
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Property mapping of one device.
///
/// Ordered so that replaying a full property set (on add or revival) visits
/// keys in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceProperties(BTreeMap<String, PropertyValue>);

impl DeviceProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning true if it differs from what was stored.
    pub fn insert(&mut self, key: &str, value: impl Into<PropertyValue>) -> bool {
        let value = value.into();
        if self.0.get(key) == Some(&value) {
            return false;
        }
        self.0.insert(key.to_string(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn string(&self, key: &str) -> &str {
        self.get(key).and_then(PropertyValue::as_str).unwrap_or("")
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(PropertyValue::as_bool).unwrap_or(false)
    }

    fn number(&self, key: &str) -> i64 {
        self.get(key).and_then(PropertyValue::as_int).unwrap_or(0)
    }

    /// Alias, or `None` if the daemon has not published one.
    pub fn alias(&self) -> Option<&str> {
        self.get(keys::ALIAS).and_then(PropertyValue::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(keys::NAME).and_then(PropertyValue::as_str)
    }

    pub fn address(&self) -> &str {
        self.string(keys::ADDRESS)
    }

    pub fn icon(&self) -> &str {
        self.string(keys::ICON)
    }

    /// Adapter object path, e.g. `/org/bluez/hci0`.
    pub fn adapter(&self) -> &str {
        self.string(keys::ADAPTER)
    }

    /// Class of Device bitfield. Out-of-range values collapse to 0.
    pub fn class(&self) -> u32 {
        u32::try_from(self.number(keys::CLASS)).unwrap_or(0)
    }

    /// GATT appearance code, 0 when absent.
    pub fn appearance(&self) -> u16 {
        u16::try_from(self.number(keys::APPEARANCE)).unwrap_or(0)
    }

    pub fn paired(&self) -> bool {
        self.flag(keys::PAIRED)
    }

    pub fn trusted(&self) -> bool {
        self.flag(keys::TRUSTED)
    }

    pub fn blocked(&self) -> bool {
        self.flag(keys::BLOCKED)
    }

    pub fn connected(&self) -> bool {
        self.flag(keys::CONNECTED)
    }
}

impl FromIterator<(String, PropertyValue)> for DeviceProperties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Last path component of an adapter object path (`/org/bluez/hci0` -> `hci0`).
pub fn adapter_short_name(adapter_path: &str) -> &str {
    adapter_path.rsplit('/').next().unwrap_or(adapter_path)
}

/// Read access to the external device registry.
pub trait DeviceSource {
    /// Current properties of the device at `path`, if the daemon knows it.
    fn properties(&self, path: &str) -> Option<DeviceProperties>;

    /// Human-readable name of the adapter at `adapter_path`.
    fn adapter_name(&self, _adapter_path: &str) -> Option<String> {
        None
    }
}
