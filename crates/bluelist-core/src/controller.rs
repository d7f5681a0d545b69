//! SyncController - binds registry events to rows, ordering and removal.
//!
//! The controller is the single dispatch point of the engine. Events arrive
//! either directly through `handle` or through the queue behind
//! `event_sender`, and every resulting presentation change is pushed to the
//! presenter in order. Time is passed in by the host so removal deadlines
//! are deterministic; the host calls `tick` whenever `next_deadline` passes.

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use tracing::{debug, error, trace, warn};

use crate::config::Config;
use crate::device::{DeviceProperties, DeviceSource, PropertyValue};
use crate::error::{Error, Result};
use crate::event::RegistryEvent;
use crate::ordering::{OrderingPolicy, hide_unnamed};
use crate::presenter::{PresentationCommand, Presenter, PresenterEvent};
use crate::quality::{QualityMonitor, QualitySource};
use crate::registry::{AddOutcome, DeviceRegistry};
use crate::removal::RemovalScheduler;
use crate::row::RowState;

pub struct SyncController<P: Presenter> {
    config: Config,
    source: Rc<dyn DeviceSource>,
    monitor: QualityMonitor,
    registry: DeviceRegistry,
    policy: OrderingPolicy,
    presenter: P,
    /// Container order as last sent to the presenter.
    order: Vec<String>,
    selected: Option<String>,
    tx: Sender<RegistryEvent>,
    rx: Receiver<RegistryEvent>,
}

impl<P: Presenter> SyncController<P> {
    pub fn new(
        config: Config,
        source: Rc<dyn DeviceSource>,
        quality: Box<dyn QualitySource>,
        presenter: P,
    ) -> Self {
        let removals = RemovalScheduler::new(
            config.list.transition_duration(),
            config.list.removal_slack(),
        );
        let policy = if config.list.hide_unnamed {
            OrderingPolicy::with_filter(hide_unnamed)
        } else {
            OrderingPolicy::new()
        };
        let (tx, rx) = mpsc::channel();

        Self {
            config,
            source,
            monitor: QualityMonitor::new(quality),
            registry: DeviceRegistry::new(removals),
            policy,
            presenter,
            order: Vec::new(),
            selected: None,
            tx,
            rx,
        }
    }

    /// Sender feeding the dispatch queue drained by `dispatch_pending`.
    pub fn event_sender(&self) -> Sender<RegistryEvent> {
        self.tx.clone()
    }

    /// Handle every queued event in arrival order.
    ///
    /// Stops at the first contract violation and returns it; events queued
    /// behind it stay queued.
    pub fn dispatch_pending(&mut self, now: Instant) -> Result<usize> {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            if let Err(e) = self.handle(event, now) {
                error!("SyncController: {}", e);
                return Err(e);
            }
            handled += 1;
        }
        Ok(handled)
    }

    /// Process one registry event. Removals already due at `now` are fired
    /// first, so a re-add after the deadline creates a fresh row.
    pub fn handle(&mut self, event: RegistryEvent, now: Instant) -> Result<()> {
        self.tick(now)?;

        match event {
            RegistryEvent::DeviceAdded { path } => self.device_added(&path),
            RegistryEvent::DeviceRemoved { path } => self.device_removed(&path, now),
            RegistryEvent::BatteryAdded { path } => {
                self.registry.on_battery_added(&path);
                Ok(())
            }
            RegistryEvent::PropertyChanged { path, key, value } => {
                self.property_changed(&path, &key, &value)
            }
        }
    }

    /// Destroy every row whose exit transition has elapsed by `now`.
    pub fn tick(&mut self, now: Instant) -> Result<usize> {
        let due = self.registry.take_due(now);
        if due.is_empty() {
            return Ok(0);
        }

        for row in &due {
            debug!("SyncController: destroying row {}", row.object_path);
            self.presenter.present(PresenterEvent::RowDestroyed {
                path: row.object_path.clone(),
            })?;
        }
        self.reorder()?;
        Ok(due.len())
    }

    /// When the host must call `tick` next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.registry.next_deadline()
    }

    /// Select one active row, or clear the selection.
    pub fn select(&mut self, path: Option<&str>) -> Result<()> {
        if let Some(p) = path.filter(|p| !self.registry.is_active(p)) {
            return Err(Error::NotRegistered(p.to_string()));
        }
        if self.selected.as_deref() == path {
            return Ok(());
        }

        if let Some(old) = self.selected.take() {
            if let Some(row) = self.registry.get_active_mut(&old) {
                row.selected = false;
            }
        }
        if let Some(p) = path {
            if let Some(row) = self.registry.get_active_mut(p) {
                row.selected = true;
            }
        }
        self.selected = path.map(str::to_string);
        self.presenter
            .present(PresenterEvent::SelectionChanged(self.selected.clone()))
    }

    /// Replace the visibility predicate and re-filter every active row.
    pub fn set_filter<F>(&mut self, filter: F) -> Result<()>
    where
        F: Fn(&RowState) -> bool + 'static,
    {
        self.policy.set_filter(filter);
        self.refilter()
    }

    pub fn clear_filter(&mut self) -> Result<()> {
        self.policy.clear_filter();
        self.refilter()
    }

    /// Re-evaluate the filter for every active row, emitting `SetVisible`
    /// for rows whose visibility changed.
    pub fn refilter(&mut self) -> Result<()> {
        let mut changed = Vec::new();
        for row in self.registry.active_rows_mut() {
            let visible = self.policy.is_visible(row);
            if visible != row.visible {
                row.visible = visible;
                changed.push((row.object_path.clone(), visible));
            }
        }
        changed.sort();

        for (path, visible) in changed {
            self.present_command(&path, PresentationCommand::SetVisible(visible))?;
        }
        Ok(())
    }

    pub fn row(&self, path: &str) -> Option<&RowState> {
        self.registry.get(path)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Current container order, exiting rows included.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    fn device_added(&mut self, path: &str) -> Result<()> {
        match self.registry.on_device_added(path) {
            AddOutcome::AlreadyActive => return Ok(()),
            AddOutcome::Created => {
                self.presenter.present(PresenterEvent::RowCreated {
                    path: path.to_string(),
                })?;
            }
            AddOutcome::Revived => {}
        }

        let props = self.read_properties(path);
        let adapter_name = self.source.adapter_name(props.adapter());
        let Some(row) = self.registry.get_active_mut(path) else {
            return Err(Error::NotRegistered(path.to_string()));
        };

        let mut commands = Vec::new();
        row.sync_all(
            &props,
            &self.config,
            &self.monitor,
            adapter_name.as_deref(),
            &mut commands,
        );
        row.visible = self.policy.is_visible(row);
        commands.push(PresentationCommand::SetVisible(row.visible));
        commands.push(PresentationCommand::RevealRow(true));

        self.present_commands(path, commands)?;
        self.reorder()
    }

    fn device_removed(&mut self, path: &str, now: Instant) -> Result<()> {
        self.registry.on_device_removed(path, now)?;
        self.present_command(path, PresentationCommand::RevealRow(false))?;

        if self.selected.as_deref() == Some(path) {
            self.selected = None;
            self.presenter
                .present(PresenterEvent::SelectionChanged(None))?;
        }
        Ok(())
    }

    fn property_changed(&mut self, path: &str, key: &str, value: &PropertyValue) -> Result<()> {
        if !self.registry.is_active(path) {
            trace!("SyncController: dropping {} for inactive {}", key, path);
            return Ok(());
        }

        let mut props = self.read_properties(path);
        props.insert(key, value.clone());
        let adapter_name = self.source.adapter_name(props.adapter());
        let Some(row) = self.registry.get_active_mut(path) else {
            return Ok(());
        };

        let mut commands = Vec::new();
        let update = row.apply_change(
            key,
            value,
            &props,
            &self.config,
            &self.monitor,
            adapter_name.as_deref(),
            &mut commands,
        );
        let visible = self.policy.is_visible(row);
        if visible != row.visible {
            row.visible = visible;
            commands.push(PresentationCommand::SetVisible(visible));
        }

        self.present_commands(path, commands)?;
        if update.resort {
            self.reorder()?;
        }
        Ok(())
    }

    fn read_properties(&self, path: &str) -> DeviceProperties {
        self.source.properties(path).unwrap_or_else(|| {
            warn!("SyncController: no properties for {}", path);
            DeviceProperties::new()
        })
    }

    fn reorder(&mut self) -> Result<()> {
        let order = self.policy.order(self.registry.all_rows());
        if order != self.order {
            self.order = order.clone();
            self.presenter.present(PresenterEvent::Reordered(order))?;
        }
        Ok(())
    }

    fn present_command(&mut self, path: &str, command: PresentationCommand) -> Result<()> {
        self.presenter.present(PresenterEvent::Command {
            path: path.to_string(),
            command,
        })
    }

    fn present_commands(&mut self, path: &str, commands: Vec<PresentationCommand>) -> Result<()> {
        for command in commands {
            self.present_command(path, command)?;
        }
        Ok(())
    }
}
