//! Scripted registry feed.
//!
//! A replay script is JSON Lines, one step per line. Blank lines and lines
//! starting with `#` are skipped. Steps mutate an in-memory `PropertyStore`
//! whose notifications are queued into the controller, then the queue is
//! drained at the simulated time of the step.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use bluelist_core::{
    Config, DeviceProperties, ListModel, PropertyStore, PropertyValue, RawQuality,
    SyncController, TelemetryError, TelemetryTable,
};

/// One line of a replay script.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Publish a device with its initial properties.
    Add {
        path: String,
        #[serde(default)]
        properties: DeviceProperties,
    },
    Remove {
        path: String,
    },
    /// Change a single property.
    Set {
        path: String,
        key: String,
        value: PropertyValue,
    },
    Battery {
        path: String,
    },
    Select {
        #[serde(default)]
        path: Option<String>,
    },
    /// Name an adapter, e.g. `/org/bluez/hci0` -> `laptop`.
    Adapter {
        path: String,
        name: String,
    },
    /// Telemetry the next quality read for `address` will see.
    Quality {
        address: String,
        #[serde(default)]
        rssi: Option<i32>,
        #[serde(default)]
        lq: Option<i32>,
        #[serde(default)]
        tpl: Option<i32>,
        /// `"unsupported"` or a read-failure message.
        #[serde(default)]
        error: Option<String>,
    },
    /// Advance the simulated clock.
    Wait {
        ms: u64,
    },
}

impl Step {
    fn telemetry(
        rssi: Option<i32>,
        lq: Option<i32>,
        tpl: Option<i32>,
        error: Option<String>,
    ) -> std::result::Result<RawQuality, TelemetryError> {
        match error.as_deref() {
            Some("unsupported") => Err(TelemetryError::Unsupported),
            Some(message) => Err(TelemetryError::ReadFailed(message.to_string())),
            None => Ok(RawQuality {
                rssi,
                link_quality: lq,
                transmit_power: tpl,
            }),
        }
    }
}

/// Parse a whole script, reporting the offending line number on error.
pub fn parse_script(script: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step: Step = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid step", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

/// Engine wired to an in-memory registry and a simulated clock.
pub struct Replay {
    store: Rc<PropertyStore>,
    telemetry: Arc<TelemetryTable>,
    controller: SyncController<ListModel>,
    start: Instant,
    now: Instant,
}

impl Replay {
    pub fn new(config: Config) -> Self {
        let store = Rc::new(PropertyStore::new());
        let telemetry = Arc::new(TelemetryTable::new());
        let controller = SyncController::new(
            config,
            store.clone(),
            Box::new(telemetry.clone()),
            ListModel::new(),
        );

        let tx = controller.event_sender();
        store.connect(move |event| {
            // The receiver lives as long as the controller.
            let _ = tx.send(event.clone());
        });

        let now = Instant::now();
        Self {
            store,
            telemetry,
            controller,
            start: now,
            now,
        }
    }

    pub fn run(&mut self, steps: Vec<Step>) -> Result<()> {
        for (index, step) in steps.into_iter().enumerate() {
            self.apply(step)
                .with_context(|| format!("step {}", index + 1))?;
        }
        Ok(())
    }

    pub fn apply(&mut self, step: Step) -> Result<()> {
        debug!("replay @{:?}: {:?}", self.elapsed(), step);
        match step {
            Step::Add { path, properties } => self.store.add_device(&path, properties),
            Step::Remove { path } => {
                if !self.store.remove_device(&path) {
                    // Forward the bogus removal so the engine reports it.
                    self.controller
                        .event_sender()
                        .send(bluelist_core::RegistryEvent::DeviceRemoved { path })?;
                }
            }
            Step::Set { path, key, value } => {
                self.store.set_property(&path, &key, value);
            }
            Step::Battery { path } => self.store.add_battery(&path),
            Step::Select { path } => {
                self.pump()?;
                self.controller.select(path.as_deref())?;
            }
            Step::Adapter { path, name } => self.store.set_adapter_name(&path, &name),
            Step::Quality {
                address,
                rssi,
                lq,
                tpl,
                error,
            } => self
                .telemetry
                .set(&address, Step::telemetry(rssi, lq, tpl, error)),
            Step::Wait { ms } => {
                self.pump()?;
                self.now += Duration::from_millis(ms);
                let destroyed = self.controller.tick(self.now)?;
                if destroyed > 0 {
                    debug!("replay: {} row(s) destroyed", destroyed);
                }
            }
        }
        self.pump()
    }

    /// Let every pending exit transition finish and return the final list.
    pub fn finish(mut self) -> Result<ListModel> {
        self.pump()?;
        while let Some(deadline) = self.controller.next_deadline() {
            self.now = self.now.max(deadline);
            self.controller.tick(self.now)?;
        }
        info!(
            "replay finished after {:?} simulated, {} row(s) remain",
            self.elapsed(),
            self.controller.registry().active_len()
        );
        Ok(self.controller.into_presenter())
    }

    pub fn controller(&self) -> &SyncController<ListModel> {
        &self.controller
    }

    fn pump(&mut self) -> Result<()> {
        self.controller.dispatch_pending(self.now)?;
        Ok(())
    }

    fn elapsed(&self) -> Duration {
        self.now - self.start
    }
}
