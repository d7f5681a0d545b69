//! bluelist-core - synchronization engine for a live Bluetooth device list.
//!
//! This crate mirrors an externally owned device registry into ordered,
//! filtered presentation rows:
//! - `store` / `device` / `event`: device properties and registry events
//! - `row` / `device_class` / `quality`: per-row derived state
//! - `registry` / `removal` / `ordering`: membership, deferred teardown, order
//! - `controller`: the dispatch loop tying it together
//! - `presenter`: the command set consumed by a widget layer
//!
//! Ambient pieces: `config`, `error`, `logging`, `callbacks`.

pub mod callbacks;
pub mod config;
pub mod controller;
pub mod device;
pub mod device_class;
pub mod error;
pub mod event;
pub mod logging;
pub mod ordering;
pub mod presenter;
pub mod quality;
pub mod registry;
pub mod removal;
pub mod row;
pub mod store;

pub use config::{Config, ConfigLoadResult};
pub use controller::SyncController;
pub use device::{DeviceProperties, DeviceSource, PropertyValue};
pub use error::{Error, Result};
pub use event::RegistryEvent;
pub use presenter::{ListModel, PresentationCommand, Presenter, PresenterEvent};
pub use quality::{QualitySource, RawQuality, TelemetryError, TelemetryTable};
pub use row::{RowPhase, RowState};
pub use store::PropertyStore;
