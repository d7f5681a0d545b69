//! RowState - derived presentation record for one device.
//!
//! A row caches the handful of device properties the list needs for
//! ordering and filtering, and turns property changes into batches of
//! `PresentationCommand`s. Derivation never fails: any well-formed property
//! value produces a command batch.

use chrono::{DateTime, Local};
use tracing::{debug, trace};

use crate::config::Config;
use crate::device::{DeviceProperties, PropertyValue, adapter_short_name, keys};
use crate::device_class::resolve_description;
use crate::presenter::{Emblem, IconComposite, LabelTarget, PresentationCommand};
use crate::quality::{QualityMonitor, QualitySample};

/// Lifecycle phase of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    Active,
    ExitAnimating,
    Destroyed,
}

/// Set of emblems currently painted over the device icon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IconOverlays {
    pub paired: bool,
    pub trusted: bool,
    pub blocked: bool,
}

impl IconOverlays {
    /// Union of whichever flags are set on the device.
    pub fn from_properties(props: &DeviceProperties) -> Self {
        Self {
            paired: props.paired(),
            trusted: props.trusted(),
            blocked: props.blocked(),
        }
    }

    pub fn emblems(&self) -> Vec<Emblem> {
        let mut emblems = Vec::with_capacity(3);
        if self.paired {
            emblems.push(Emblem::Paired);
        }
        if self.trusted {
            emblems.push(Emblem::Trusted);
        }
        if self.blocked {
            emblems.push(Emblem::Blocked);
        }
        emblems
    }

    pub fn is_empty(&self) -> bool {
        !(self.paired || self.trusted || self.blocked)
    }
}

/// Build the icon composite for a device from scratch.
pub fn compute_icon_composite(props: &DeviceProperties, config: &Config) -> IconComposite {
    IconComposite {
        base: props.icon().to_string(),
        size: config.icons.size,
        emblems: IconOverlays::from_properties(props).emblems(),
        emblem_size: config.icons.emblem_size,
        emblem_alpha: config.icons.emblem_alpha,
    }
}

/// Text of the adapter label, e.g. `laptop (hci0)`.
pub fn adapter_label(adapter_path: &str, adapter_name: Option<&str>) -> String {
    let hci = adapter_short_name(adapter_path);
    match adapter_name {
        Some(name) if !name.is_empty() => format!("{} ({})", name, hci),
        _ => hci.to_string(),
    }
}

/// What a property change means for ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowUpdate {
    /// Alias or pairing changed, so the container must be re-sorted.
    pub resort: bool,
}

/// Per-device presentation state.
#[derive(Debug, Clone)]
pub struct RowState {
    pub object_path: String,
    pub created_at: DateTime<Local>,
    pub alias: Option<String>,
    pub address: String,
    pub adapter: String,
    pub paired: bool,
    pub connected: bool,
    pub description: String,
    pub icon_overlays: IconOverlays,
    pub quality: Option<QualitySample>,
    pub visible: bool,
    pub selected: bool,
    pub phase: RowPhase,
}

impl RowState {
    pub fn new(object_path: &str) -> Self {
        Self {
            object_path: object_path.to_string(),
            created_at: Local::now(),
            alias: None,
            address: String::new(),
            adapter: String::new(),
            paired: false,
            connected: false,
            description: String::new(),
            icon_overlays: IconOverlays::default(),
            quality: None,
            visible: true,
            selected: false,
            phase: RowPhase::Active,
        }
    }

    /// Alias used for ordering. Missing aliases sort as the empty string.
    pub fn sort_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or("")
    }

    /// Derive everything from a full property set, as on creation or
    /// revival. Keys are visited in a stable order.
    ///
    /// Every derived field starts over from its initial value, so nothing
    /// from a previous life of the row survives a key missing from `props`.
    /// A device that is connected at this point triggers one quality read.
    pub fn sync_all(
        &mut self,
        props: &DeviceProperties,
        config: &Config,
        monitor: &QualityMonitor,
        adapter_name: Option<&str>,
        out: &mut Vec<PresentationCommand>,
    ) -> RowUpdate {
        let previous_sort_key = (self.paired, self.alias.take());
        *self = Self {
            object_path: std::mem::take(&mut self.object_path),
            created_at: self.created_at,
            selected: self.selected,
            phase: self.phase,
            ..Self::new("")
        };
        self.icon_overlays = IconOverlays::from_properties(props);

        for (key, value) in props.iter() {
            self.apply_change(key, value, props, config, monitor, adapter_name, out);
        }

        // Labels of absent keys are cleared rather than left as they were.
        for (key, target) in [
            (keys::ALIAS, LabelTarget::Alias),
            (keys::ADDRESS, LabelTarget::Address),
            (keys::ADAPTER, LabelTarget::Adapter),
        ] {
            if !props.contains(key) {
                out.push(PresentationCommand::SetLabel {
                    target,
                    text: String::new(),
                });
            }
        }
        // The icon is always composed, even for devices without emblem flags.
        if !props.contains(keys::ICON) {
            out.push(PresentationCommand::SetIconComposite(compute_icon_composite(
                props, config,
            )));
        }
        if !props.contains(keys::CONNECTED) {
            out.push(self.set_description(props));
            out.push(PresentationCommand::RevealQuality(false));
        }

        let (was_paired, old_alias) = previous_sort_key;
        RowUpdate {
            resort: self.paired != was_paired || self.alias != old_alias,
        }
    }

    /// React to one property change. `props` already holds the new value.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_change(
        &mut self,
        key: &str,
        value: &PropertyValue,
        props: &DeviceProperties,
        config: &Config,
        monitor: &QualityMonitor,
        adapter_name: Option<&str>,
        out: &mut Vec<PresentationCommand>,
    ) -> RowUpdate {
        trace!("{} {} {}", key, value, self.object_path);
        let mut update = RowUpdate::default();

        match key {
            keys::ALIAS => {
                let alias = value.as_str().map(str::to_string);
                update.resort = alias != self.alias;
                out.push(PresentationCommand::SetLabel {
                    target: LabelTarget::Alias,
                    text: alias.clone().unwrap_or_default(),
                });
                self.alias = alias;
            }
            keys::PAIRED | keys::TRUSTED | keys::BLOCKED | keys::ICON => {
                if key == keys::PAIRED {
                    let paired = value.as_bool().unwrap_or(false);
                    update.resort = paired != self.paired;
                    self.paired = paired;
                }
                self.icon_overlays = IconOverlays::from_properties(props);
                out.push(PresentationCommand::SetIconComposite(compute_icon_composite(
                    props, config,
                )));
            }
            keys::CONNECTED => {
                let connected = value.as_bool().unwrap_or(false);
                out.push(self.set_description(props));
                self.update_quality(connected, props, config, monitor, out);
            }
            keys::CLASS | keys::APPEARANCE => {
                out.push(self.set_description(props));
            }
            keys::ADDRESS => {
                self.address = value.as_str().unwrap_or("").to_string();
                out.push(PresentationCommand::SetLabel {
                    target: LabelTarget::Address,
                    text: self.address.clone(),
                });
            }
            keys::ADAPTER => {
                self.adapter = value.as_str().unwrap_or("").to_string();
                out.push(PresentationCommand::SetLabel {
                    target: LabelTarget::Adapter,
                    text: adapter_label(&self.adapter, adapter_name),
                });
            }
            _ => {}
        }

        update
    }

    fn set_description(&mut self, props: &DeviceProperties) -> PresentationCommand {
        self.description = resolve_description(props);
        PresentationCommand::SetLabel {
            target: LabelTarget::Description,
            text: self.description.clone(),
        }
    }

    /// Read telemetry on a transition to connected; clear it on disconnect.
    fn update_quality(
        &mut self,
        connected: bool,
        props: &DeviceProperties,
        config: &Config,
        monitor: &QualityMonitor,
        out: &mut Vec<PresentationCommand>,
    ) {
        let was_connected = self.connected;
        self.connected = connected;

        if !connected {
            if was_connected || self.quality.is_some() {
                debug!("{}: disconnected, clearing quality", self.object_path);
            }
            self.quality = None;
            out.push(PresentationCommand::RevealQuality(false));
            return;
        }

        if was_connected || !config.quality.enabled {
            return;
        }

        let sample = monitor.sample(props.address(), props.adapter());
        if sample.failed {
            out.push(PresentationCommand::RevealQuality(false));
        } else {
            for (metric, bucket) in sample.buckets() {
                out.push(PresentationCommand::SetQualityBucket {
                    metric,
                    bucket,
                    asset: metric.asset_path(&config.quality.pixmap_dir, bucket),
                    width: config.quality.image_width,
                    height: config.quality.image_height,
                });
            }
            out.push(PresentationCommand::RevealQuality(true));
        }
        self.quality = Some(sample);
    }
}
