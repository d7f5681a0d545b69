//! Link-quality telemetry: acquisition, normalization, and bucketing.
//!
//! Raw values come from the kernel's connection-info query for an
//! (address, adapter) pair. They are mapped to a percentage in `[10, 100]`
//! and then to a bucket (a multiple of 10) that selects one of the fixed
//! `blueman-{rssi,lq,tpl}-{bucket}.png` assets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::device::adapter_short_name;

/// Lowest percentage and bucket ever displayed.
pub const MIN_LEVEL: f64 = 10.0;
const MAX_LEVEL: f64 = 100.0;

/// Why a telemetry read produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("failed to read connection info: {0}")]
    ReadFailed(String),
    /// Typically Low Energy links, which do not report these values.
    #[error("device does not report link quality")]
    Unsupported,
}

/// Raw connection-info values. Individual reads may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawQuality {
    pub rssi: Option<i32>,
    pub link_quality: Option<i32>,
    pub transmit_power: Option<i32>,
}

/// Telemetry collaborator.
pub trait QualitySource {
    /// Synchronous read for a device on the given adapter (`hci0`, ...).
    fn read_quality(&self, address: &str, adapter: &str) -> Result<RawQuality, TelemetryError>;
}

impl<T: QualitySource + ?Sized> QualitySource for Arc<T> {
    fn read_quality(&self, address: &str, adapter: &str) -> Result<RawQuality, TelemetryError> {
        (**self).read_quality(address, adapter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityMetric {
    Rssi,
    LinkQuality,
    TransmitPower,
}

impl QualityMetric {
    pub const ALL: [QualityMetric; 3] = [
        QualityMetric::Rssi,
        QualityMetric::LinkQuality,
        QualityMetric::TransmitPower,
    ];

    /// Asset-name prefix.
    pub fn short_name(self) -> &'static str {
        match self {
            QualityMetric::Rssi => "rssi",
            QualityMetric::LinkQuality => "lq",
            QualityMetric::TransmitPower => "tpl",
        }
    }

    /// Map a raw reading to a percentage in `[10, 100]`.
    pub fn normalize(self, raw: i32) -> f64 {
        let raw = f64::from(raw);
        let value = match self {
            QualityMetric::Rssi | QualityMetric::TransmitPower => 50.0 + raw / 127.0 * 50.0,
            QualityMetric::LinkQuality => raw / 255.0 * 100.0,
        };
        value.clamp(MIN_LEVEL, MAX_LEVEL)
    }

    pub fn asset_name(self, bucket: u8) -> String {
        format!("blueman-{}-{}.png", self.short_name(), bucket)
    }

    pub fn asset_path(self, pixmap_dir: &Path, bucket: u8) -> PathBuf {
        pixmap_dir.join(self.asset_name(bucket))
    }
}

/// Round a percentage to the nearest multiple of 10 (ties to even), never
/// below 10.
pub fn bucket(percent: f64) -> u8 {
    let percent = if percent.is_nan() {
        MIN_LEVEL
    } else {
        percent.clamp(MIN_LEVEL, MAX_LEVEL)
    };
    let rounded = (percent / 10.0).round_ties_even() * 10.0;
    rounded.max(MIN_LEVEL) as u8
}

/// Normalized view of one raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityLevel {
    pub percent: f64,
    pub bucket: u8,
}

impl QualityLevel {
    pub fn from_raw(metric: QualityMetric, raw: i32) -> Self {
        let percent = metric.normalize(raw);
        Self {
            percent,
            bucket: bucket(percent),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricReading {
    pub raw: Option<i32>,
    pub level: Option<QualityLevel>,
}

/// Result of one acquisition. When `failed` is set no reading carries a
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySample {
    pub rssi: MetricReading,
    pub link_quality: MetricReading,
    pub transmit_power: MetricReading,
    pub failed: bool,
}

impl QualitySample {
    pub fn failed() -> Self {
        Self {
            rssi: MetricReading::default(),
            link_quality: MetricReading::default(),
            transmit_power: MetricReading::default(),
            failed: true,
        }
    }

    pub fn from_raw(raw: RawQuality) -> Self {
        let reading = |metric: QualityMetric, value: Option<i32>| MetricReading {
            raw: value,
            level: value.map(|v| QualityLevel::from_raw(metric, v)),
        };
        Self {
            rssi: reading(QualityMetric::Rssi, raw.rssi),
            link_quality: reading(QualityMetric::LinkQuality, raw.link_quality),
            transmit_power: reading(QualityMetric::TransmitPower, raw.transmit_power),
            failed: false,
        }
    }

    pub fn reading(&self, metric: QualityMetric) -> &MetricReading {
        match metric {
            QualityMetric::Rssi => &self.rssi,
            QualityMetric::LinkQuality => &self.link_quality,
            QualityMetric::TransmitPower => &self.transmit_power,
        }
    }

    /// Buckets of every metric that produced a level, in display order.
    pub fn buckets(&self) -> Vec<(QualityMetric, u8)> {
        QualityMetric::ALL
            .iter()
            .filter_map(|&m| self.reading(m).level.map(|l| (m, l.bucket)))
            .collect()
    }
}

/// Acquires fresh samples from a `QualitySource`.
pub struct QualityMonitor {
    source: Box<dyn QualitySource>,
}

impl QualityMonitor {
    pub fn new(source: Box<dyn QualitySource>) -> Self {
        Self { source }
    }

    /// Read a new sample. `adapter_path` is the device's Adapter object path.
    ///
    /// Acquisition errors never escape: they produce a failed sample.
    pub fn sample(&self, address: &str, adapter_path: &str) -> QualitySample {
        let adapter = adapter_short_name(adapter_path);
        match self.source.read_quality(address, adapter) {
            Ok(raw) => {
                debug!(
                    "QualityMonitor: {} on {}: rssi {:?} lq {:?} tpl {:?}",
                    address, adapter, raw.rssi, raw.link_quality, raw.transmit_power
                );
                QualitySample::from_raw(raw)
            }
            Err(TelemetryError::Unsupported) => {
                warn!(
                    "QualityMonitor: {} does not report power levels, probably a LE device",
                    address
                );
                QualitySample::failed()
            }
            Err(e) => {
                warn!("QualityMonitor: {} on {}: {}", address, adapter, e);
                QualitySample::failed()
            }
        }
    }
}

/// Thread-safe table of the latest telemetry per device address.
///
/// A poller (possibly on another thread) stores readings; the event loop
/// reads them synchronously. Addresses without an entry fail to read.
#[derive(Default)]
pub struct TelemetryTable {
    entries: RwLock<HashMap<String, Result<RawQuality, TelemetryError>>>,
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: &str, reading: Result<RawQuality, TelemetryError>) {
        self.entries.write().insert(address.to_string(), reading);
    }
}

impl QualitySource for TelemetryTable {
    fn read_quality(&self, address: &str, adapter: &str) -> Result<RawQuality, TelemetryError> {
        self.entries.read().get(address).cloned().unwrap_or_else(|| {
            Err(TelemetryError::ReadFailed(format!(
                "no connection to {} on {}",
                address, adapter
            )))
        })
    }
}
