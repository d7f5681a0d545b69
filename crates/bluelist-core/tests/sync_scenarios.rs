//! End-to-end scenarios: PropertyStore -> SyncController -> ListModel.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bluelist_core::device::keys;
use bluelist_core::presenter::LabelTarget;
use bluelist_core::quality::QualityMetric;
use bluelist_core::{
    Config, DeviceProperties, ListModel, PropertyStore, RawQuality, SyncController,
    TelemetryError, TelemetryTable,
};

struct Harness {
    store: Rc<PropertyStore>,
    telemetry: Arc<TelemetryTable>,
    controller: SyncController<ListModel>,
    now: Instant,
}

impl Harness {
    fn new(config: Config) -> Self {
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
            let _ = tx.send(event.clone());
        });

        Self {
            store,
            telemetry,
            controller,
            now: Instant::now(),
        }
    }

    fn pump(&mut self) {
        self.controller
            .dispatch_pending(self.now)
            .expect("dispatch failed");
    }

    /// Advance the clock and fire whatever became due.
    fn wait(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
        self.controller.tick(self.now).expect("tick failed");
    }

    fn model(&self) -> &ListModel {
        self.controller.presenter()
    }
}

fn device(address: &str, alias: &str, class: u32) -> DeviceProperties {
    DeviceProperties::new()
        .with(keys::ADDRESS, address)
        .with(keys::ALIAS, alias)
        .with(keys::CLASS, class)
        .with(keys::ICON, "bluetooth")
        .with(keys::ADAPTER, "/org/bluez/hci0")
        .with(keys::PAIRED, false)
        .with(keys::TRUSTED, false)
        .with(keys::BLOCKED, false)
        .with(keys::CONNECTED, false)
}

#[test]
fn test_speaker_scenario() {
    let mut h = Harness::new(Config::default());
    let path = "/org/bluez/hci0/dev_AA";
    h.telemetry.set(
        "AA",
        Ok(RawQuality {
            rssi: Some(-60),
            link_quality: Some(255),
            transmit_power: Some(-127),
        }),
    );

    h.store.add_device(path, device("AA", "Speaker", 0x240400));
    h.pump();
    let view = h.model().row(path).unwrap();
    assert_eq!(view.label(LabelTarget::Description), "Audio/Video");
    assert!(!view.quality_revealed);
    assert!(h.controller.row(path).unwrap().quality.is_none());

    h.store.set_property(path, keys::CONNECTED, true);
    h.pump();
    let view = h.model().row(path).unwrap();
    assert!(view.quality_revealed);
    assert_eq!(
        view.label(LabelTarget::Description),
        "Audio/Video - Connected"
    );
    let buckets: Vec<(QualityMetric, u8)> = view
        .quality
        .iter()
        .map(|image| (image.metric, image.bucket))
        .collect();
    assert_eq!(
        buckets,
        vec![
            (QualityMetric::Rssi, 30),
            (QualityMetric::LinkQuality, 100),
            (QualityMetric::TransmitPower, 10),
        ]
    );
    assert!(view.quality[0].asset.ends_with("blueman-rssi-30.png"));
    assert_eq!((view.quality[0].width, view.quality[0].height), (14, 48));

    h.store.set_property(path, keys::CONNECTED, false);
    h.pump();
    let view = h.model().row(path).unwrap();
    assert!(!view.quality_revealed);
    assert!(view.quality.is_empty());
    assert!(h.controller.row(path).unwrap().quality.is_none());
}

#[test]
fn test_le_device_without_telemetry() {
    let mut h = Harness::new(Config::default());
    let path = "/org/bluez/hci0/dev_LE";
    h.telemetry.set("LE", Err(TelemetryError::Unsupported));

    h.store.add_device(
        path,
        device("LE", "Watch", 0).with(keys::APPEARANCE, 0x00c1u32),
    );
    h.store.set_property(path, keys::CONNECTED, true);
    h.pump();

    let row = h.controller.row(path).unwrap();
    let sample = row.quality.as_ref().unwrap();
    assert!(sample.failed);
    assert!(sample.rssi.level.is_none());
    assert!(!h.model().row(path).unwrap().quality_revealed);
    assert_eq!(row.description, "Sports Watch - Connected");
}

#[test]
fn test_pairing_dominates_alphabetical_order() {
    let mut h = Harness::new(Config::default());
    h.store
        .add_device("/dev_a", device("A1", "B", 0).with(keys::PAIRED, true));
    h.store.add_device("/dev_b", device("B1", "A", 0));
    h.pump();

    assert_eq!(h.model().order(), ["/dev_a", "/dev_b"]);
    let rendered = h.model().render();
    let first = rendered.lines().next().unwrap();
    assert!(first.contains("[P"));
}

#[test]
fn test_removal_timing() {
    let mut h = Harness::new(Config::default());
    h.store.add_device("/dev_x", device("X", "X", 0));
    h.pump();

    h.store.remove_device("/dev_x");
    h.pump();
    let deadline = h.controller.next_deadline().unwrap();
    assert_eq!(deadline, h.now + Duration::from_millis(255));
    assert!(h.model().render().contains("(leaving)"));

    h.wait(249);
    assert!(h.model().row("/dev_x").is_some());
    h.wait(1);
    assert!(h.model().row("/dev_x").is_some());
    h.wait(5);
    assert!(h.model().row("/dev_x").is_none());
    assert!(h.model().order().is_empty());
    assert!(h.controller.next_deadline().is_none());
}

#[test]
fn test_churn_keeps_one_row_per_path() {
    let mut h = Harness::new(Config::default());
    for round in 0..5u64 {
        for i in 0..6 {
            let path = format!("/dev_{}", i);
            if round % 2 == 0 || i % 2 == 0 {
                h.store
                    .add_device(&path, device(&format!("{}", i), &format!("d{}", (i * 5) % 6), 0));
            } else {
                h.store.remove_device(&path);
            }
        }
        h.store.set_property("/dev_0", keys::PAIRED, round % 2 == 1);
        h.pump();
        h.wait(100 + round * 60);

        let order = h.model().order().to_vec();
        let mut deduped = order.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(order.len(), deduped.len(), "duplicate row in {:?}", order);
        assert_eq!(order.len(), h.model().len());
    }

    h.wait(10_000);
    let (created, destroyed) = h.model().lifecycle_counts();
    assert_eq!(created - destroyed, h.controller.registry().active_len());
}

#[test]
fn test_configured_transition_is_respected() {
    let config = Config::load_with_defaults(
        "[list]\ntransition_duration_ms = 1000\nremoval_slack_ms = 0\n",
    )
    .unwrap();
    let mut h = Harness::new(config);
    h.store.add_device("/dev_x", device("X", "X", 0));
    h.store.remove_device("/dev_x");
    h.pump();

    h.wait(999);
    assert!(h.model().row("/dev_x").is_some());
    h.wait(1);
    assert!(h.model().row("/dev_x").is_none());
}
