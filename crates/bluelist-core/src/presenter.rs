//! Presentation commands and the presenter seam.
//!
//! The engine never draws. It emits a closed set of commands per row and the
//! widget layer pattern-matches on them. `ListModel` is the in-memory
//! presenter used by the headless binary and by tests.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::trace;

use crate::error::{Error, Result};
use crate::quality::QualityMetric;

/// Text elements of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelTarget {
    Alias,
    Description,
    Address,
    Adapter,
}

impl LabelTarget {
    pub fn name(self) -> &'static str {
        match self {
            LabelTarget::Alias => "alias_label",
            LabelTarget::Description => "appearance_label",
            LabelTarget::Address => "btaddress_label",
            LabelTarget::Adapter => "adapter_label",
        }
    }
}

/// Corner of the device icon an emblem is painted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    BottomLeft,
    TopRight,
}

impl Corner {
    /// Column of this corner in a rendered emblem strip.
    fn slot(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::BottomLeft => 1,
            Corner::TopRight => 2,
        }
    }
}

/// Status emblem drawn over the device icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Emblem {
    Paired,
    Trusted,
    Blocked,
}

impl Emblem {
    pub fn icon_name(self) -> &'static str {
        match self {
            Emblem::Paired => "blueman-paired-emblem",
            Emblem::Trusted => "blueman-trusted-emblem",
            Emblem::Blocked => "blueman-blocked-emblem",
        }
    }

    pub fn corner(self) -> Corner {
        match self {
            Emblem::Paired => Corner::TopLeft,
            Emblem::Trusted => Corner::BottomLeft,
            Emblem::Blocked => Corner::TopRight,
        }
    }

    fn letter(self) -> char {
        match self {
            Emblem::Paired => 'P',
            Emblem::Trusted => 'T',
            Emblem::Blocked => 'B',
        }
    }
}

/// Text form of an icon's emblems, one column per corner.
fn emblem_strip(emblems: &[Emblem]) -> String {
    let mut slots = [' '; 3];
    for emblem in emblems {
        slots[emblem.corner().slot()] = emblem.letter();
    }
    slots.iter().collect()
}

/// Everything the widget layer needs to composite a device icon.
#[derive(Debug, Clone, PartialEq)]
pub struct IconComposite {
    pub base: String,
    pub size: u32,
    pub emblems: Vec<Emblem>,
    pub emblem_size: u32,
    pub emblem_alpha: f64,
}

/// One presentation change for a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationCommand {
    SetLabel { target: LabelTarget, text: String },
    SetIconComposite(IconComposite),
    /// Show the bar asset for `bucket`, scaled to `width` x `height`.
    SetQualityBucket {
        metric: QualityMetric,
        bucket: u8,
        asset: PathBuf,
        width: u32,
        height: u32,
    },
    RevealQuality(bool),
    RevealRow(bool),
    SetVisible(bool),
}

/// Lifecycle events and command batches delivered to the presenter.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    RowCreated { path: String },
    RowDestroyed { path: String },
    Command {
        path: String,
        command: PresentationCommand,
    },
    /// Full container order after a structural change or re-sort.
    Reordered(Vec<String>),
    SelectionChanged(Option<String>),
}

/// Widget-layer consumer.
pub trait Presenter {
    fn present(&mut self, event: PresenterEvent) -> Result<()>;
}

/// Presenter that records every event, for tests.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Vec<PresenterEvent>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, event: PresenterEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// One quality bar as last set on a row.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityImage {
    pub metric: QualityMetric,
    pub bucket: u8,
    pub asset: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Per-row view state kept by `ListModel`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowView {
    pub labels: HashMap<LabelTarget, String>,
    pub icon: Option<IconComposite>,
    pub quality: Vec<QualityImage>,
    pub quality_revealed: bool,
    pub revealed: bool,
    pub visible: bool,
}

impl RowView {
    pub fn label(&self, target: LabelTarget) -> &str {
        self.labels.get(&target).map(String::as_str).unwrap_or("")
    }
}

/// In-memory list presenter.
#[derive(Debug, Default)]
pub struct ListModel {
    rows: HashMap<String, RowView>,
    order: Vec<String>,
    selected: Option<String>,
    created: usize,
    destroyed: usize,
}

impl ListModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, path: &str) -> Option<&RowView> {
        self.rows.get(path)
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows created and destroyed since construction.
    pub fn lifecycle_counts(&self) -> (usize, usize) {
        (self.created, self.destroyed)
    }

    fn row_mut(&mut self, path: &str, target: &str) -> Result<&mut RowView> {
        self.rows.get_mut(path).ok_or_else(|| Error::UnknownTarget {
            path: path.to_string(),
            target: target.to_string(),
        })
    }

    fn apply(&mut self, path: &str, command: PresentationCommand) -> Result<()> {
        match command {
            PresentationCommand::SetLabel { target, text } => {
                self.row_mut(path, target.name())?.labels.insert(target, text);
            }
            PresentationCommand::SetIconComposite(icon) => {
                self.row_mut(path, "device_icon")?.icon = Some(icon);
            }
            PresentationCommand::SetQualityBucket {
                metric,
                bucket,
                asset,
                width,
                height,
            } => {
                let target = format!("{}_image", metric.short_name());
                let row = self.row_mut(path, &target)?;
                row.quality.retain(|image| image.metric != metric);
                row.quality.push(QualityImage {
                    metric,
                    bucket,
                    asset,
                    width,
                    height,
                });
                row.quality.sort_by_key(|image| image.metric);
            }
            PresentationCommand::RevealQuality(reveal) => {
                let row = self.row_mut(path, "quality_revealer")?;
                row.quality_revealed = reveal;
                if !reveal {
                    row.quality.clear();
                }
            }
            PresentationCommand::RevealRow(reveal) => {
                self.row_mut(path, "row_revealer")?.revealed = reveal;
            }
            PresentationCommand::SetVisible(visible) => {
                self.row_mut(path, "row")?.visible = visible;
            }
        }
        Ok(())
    }

    /// Text rendering of the visible rows, in container order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for path in &self.order {
            let Some(row) = self.rows.get(path) else {
                continue;
            };
            if !row.visible {
                continue;
            }

            let marker = if self.selected.as_deref() == Some(path.as_str()) {
                '>'
            } else {
                ' '
            };
            let emblems = row
                .icon
                .as_ref()
                .map(|icon| emblem_strip(&icon.emblems))
                .unwrap_or_else(|| emblem_strip(&[]));

            let _ = write!(
                out,
                "{} {:<24} {:<28} [{:<3}] {}",
                marker,
                row.label(LabelTarget::Alias),
                row.label(LabelTarget::Description),
                emblems,
                row.label(LabelTarget::Address),
            );
            if row.quality_revealed {
                for image in &row.quality {
                    let _ = write!(out, " {}={}", image.metric.short_name(), image.bucket);
                }
            }
            if !row.revealed {
                out.push_str(" (leaving)");
            }
            out.push('\n');
        }
        out
    }
}

impl Presenter for ListModel {
    fn present(&mut self, event: PresenterEvent) -> Result<()> {
        trace!("ListModel: {:?}", event);
        match event {
            PresenterEvent::RowCreated { path } => {
                self.rows.insert(
                    path,
                    RowView {
                        visible: true,
                        ..RowView::default()
                    },
                );
                self.created += 1;
            }
            PresenterEvent::RowDestroyed { path } => {
                if self.rows.remove(&path).is_none() {
                    return Err(Error::UnknownTarget {
                        path,
                        target: "row".to_string(),
                    });
                }
                self.order.retain(|p| *p != path);
                if self.selected.as_deref() == Some(path.as_str()) {
                    self.selected = None;
                }
                self.destroyed += 1;
            }
            PresenterEvent::Command { path, command } => self.apply(&path, command)?,
            PresenterEvent::Reordered(order) => self.order = order,
            PresenterEvent::SelectionChanged(selected) => self.selected = selected,
        }
        Ok(())
    }
}
