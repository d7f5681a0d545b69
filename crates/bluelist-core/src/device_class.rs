//! Human-readable device categories from Class of Device and GATT Appearance.
//!
//! Class of Device layout (Bluetooth Assigned Numbers, baseband):
//!   bits 2..=7   minor device class
//!   bits 8..=12  major device class
//!
//! Appearance layout: bits 6..=15 category, bits 0..=5 sub-category.

use crate::device::DeviceProperties;

const MAJOR_UNCATEGORIZED: u32 = 0x1f;

/// Suffix appended to the description while the device is connected.
pub const CONNECTED_SUFFIX: &str = " - Connected";

/// Result of minor-class lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinorClass {
    Known(&'static str),
    /// The major class defines the minor code as "uncategorized".
    Uncategorized,
    /// No class, or a major/minor combination without a name.
    Unknown,
}

fn major_index(class: u32) -> u32 {
    (class >> 8) & 0x1f
}

fn minor_index(class: u32) -> u32 {
    (class >> 2) & 0x3f
}

/// Name of the major device class.
pub fn major_class_name(class: u32) -> &'static str {
    match major_index(class) {
        0 => "Miscellaneous",
        1 => "Computer",
        2 => "Phone",
        3 => "Network Access Point",
        4 => "Audio/Video",
        5 => "Peripheral",
        6 => "Imaging",
        7 => "Wearable",
        8 => "Toy",
        9 => "Health",
        MAJOR_UNCATEGORIZED => "Uncategorized",
        _ => "Unknown",
    }
}

fn named(table: &[&'static str], index: u32) -> MinorClass {
    match table.get(index as usize) {
        Some(&"") | None => MinorClass::Unknown,
        Some(&"Uncategorized") => MinorClass::Uncategorized,
        Some(name) => MinorClass::Known(*name),
    }
}

const COMPUTER: &[&str] = &[
    "Uncategorized",
    "Desktop",
    "Server",
    "Laptop",
    "Handheld",
    "Palm-size",
    "Wearable Computer",
    "Tablet",
];

const PHONE: &[&str] = &[
    "Uncategorized",
    "Cellular",
    "Cordless",
    "Smartphone",
    "Modem",
    "ISDN Access",
];

const NETWORK_LOAD: &[&str] = &[
    "Fully Available",
    "1-17% Utilized",
    "17-33% Utilized",
    "33-50% Utilized",
    "50-67% Utilized",
    "67-83% Utilized",
    "83-99% Utilized",
    "No Service Available",
];

const AUDIO_VIDEO: &[&str] = &[
    "Uncategorized",
    "Headset",
    "Hands-free",
    "",
    "Microphone",
    "Loudspeaker",
    "Headphones",
    "Portable Audio",
    "Car Audio",
    "Set-top Box",
    "HiFi Audio",
    "VCR",
    "Video Camera",
    "Camcorder",
    "Video Monitor",
    "Video Display and Loudspeaker",
    "Video Conferencing",
    "",
    "Gaming/Toy",
];

const PERIPHERAL_KIND: &[&str] = &["", "Keyboard", "Pointing Device", "Combo Keyboard/Pointing"];

const PERIPHERAL_SUBTYPE: &[&str] = &[
    "",
    "Joystick",
    "Gamepad",
    "Remote Control",
    "Sensing Device",
    "Digitizer Tablet",
    "Card Reader",
    "Digital Pen",
    "Handheld Scanner",
    "Gestural Input",
];

const WEARABLE: &[&str] = &["", "Wristwatch", "Pager", "Jacket", "Helmet", "Glasses"];

const TOY: &[&str] = &["", "Robot", "Vehicle", "Doll", "Controller", "Game"];

const HEALTH: &[&str] = &[
    "Uncategorized",
    "Blood Pressure Monitor",
    "Thermometer",
    "Weighing Scale",
    "Glucose Meter",
    "Pulse Oximeter",
    "Heart Rate Monitor",
    "Health Data Display",
    "Step Counter",
    "Body Composition Analyzer",
    "Peak Flow Monitor",
    "Medication Monitor",
    "Knee Prosthesis",
    "Ankle Prosthesis",
    "Generic Health Manager",
    "Personal Mobility Device",
];

/// Minor class of a Class of Device value.
pub fn minor_class(class: u32) -> MinorClass {
    if class == 0 {
        return MinorClass::Unknown;
    }

    let minor = minor_index(class);
    match major_index(class) {
        1 => named(COMPUTER, minor),
        2 => named(PHONE, minor),
        3 => named(NETWORK_LOAD, minor >> 3),
        4 => named(AUDIO_VIDEO, minor),
        5 => {
            // Bits 6-7 carry keyboard/pointing, bits 2-5 a device subtype.
            match named(PERIPHERAL_SUBTYPE, minor & 0x0f) {
                MinorClass::Known(name) => MinorClass::Known(name),
                _ if minor & 0x0f != 0 => MinorClass::Unknown,
                _ => match named(PERIPHERAL_KIND, minor >> 4) {
                    MinorClass::Known(name) => MinorClass::Known(name),
                    _ => MinorClass::Uncategorized,
                },
            }
        }
        6 => {
            // Imaging uses a bitmask in bits 4-7; report the first set bit.
            let bits = minor >> 2;
            if bits & 0x1 != 0 {
                MinorClass::Known("Display")
            } else if bits & 0x2 != 0 {
                MinorClass::Known("Camera")
            } else if bits & 0x4 != 0 {
                MinorClass::Known("Scanner")
            } else if bits & 0x8 != 0 {
                MinorClass::Known("Printer")
            } else {
                MinorClass::Unknown
            }
        }
        7 => named(WEARABLE, minor),
        8 => named(TOY, minor),
        9 => named(HEALTH, minor),
        MAJOR_UNCATEGORIZED => MinorClass::Uncategorized,
        _ => MinorClass::Unknown,
    }
}

fn appearance_category(category: u16) -> Option<&'static str> {
    let name = match category {
        0 => return None,
        1 => "Phone",
        2 => "Computer",
        3 => "Watch",
        4 => "Clock",
        5 => "Display",
        6 => "Remote Control",
        7 => "Eye-glasses",
        8 => "Tag",
        9 => "Keyring",
        10 => "Media Player",
        11 => "Barcode Scanner",
        12 => "Thermometer",
        13 => "Heart Rate Sensor",
        14 => "Blood Pressure",
        15 => "Human Interface Device",
        16 => "Glucose Meter",
        17 => "Running Walking Sensor",
        18 => "Cycling",
        49 => "Pulse Oximeter",
        50 => "Weight Scale",
        51 => "Personal Mobility Device",
        52 => "Continuous Glucose Monitor",
        53 => "Insulin Pump",
        54 => "Medication Delivery",
        81 => "Outdoor Sports Activity",
        _ => return None,
    };
    Some(name)
}

fn appearance_subcategory(category: u16, sub: u16) -> Option<&'static str> {
    let name = match (category, sub) {
        (3, 1) => "Sports Watch",
        (12, 1) => "Ear Thermometer",
        (13, 1) => "Heart Rate Belt",
        (14, 1) => "Arm Blood Pressure",
        (14, 2) => "Wrist Blood Pressure",
        (15, 1) => "Keyboard",
        (15, 2) => "Mouse",
        (15, 3) => "Joystick",
        (15, 4) => "Gamepad",
        (15, 5) => "Digitizer Tablet",
        (15, 6) => "Card Reader",
        (15, 7) => "Digital Pen",
        (15, 8) => "Barcode Scanner",
        (17, 1) => "In-Shoe Sensor",
        (17, 2) => "On-Shoe Sensor",
        (17, 3) => "On-Hip Sensor",
        (18, 1) => "Cycling Computer",
        (18, 2) => "Speed Sensor",
        (18, 3) => "Cadence Sensor",
        (18, 4) => "Power Sensor",
        (18, 5) => "Speed and Cadence Sensor",
        (49, 1) => "Fingertip Pulse Oximeter",
        (49, 2) => "Wrist Worn Pulse Oximeter",
        (51, 1) => "Powered Wheelchair",
        (51, 2) => "Mobility Scooter",
        _ => return None,
    };
    Some(name)
}

/// Name for a GATT appearance code. Sub-categories win over their category.
pub fn appearance_name(appearance: u16) -> &'static str {
    let category = appearance >> 6;
    let sub = appearance & 0x3f;
    appearance_subcategory(category, sub)
        .or_else(|| appearance_category(category))
        .unwrap_or("Unknown")
}

/// Category text for a device, without the connection suffix.
///
/// Precedence: a named minor class, then (only when the minor class is
/// unknown) a non-zero appearance, then the major class.
pub fn category(class: u32, appearance: u16) -> &'static str {
    match minor_class(class) {
        MinorClass::Known(name) => name,
        MinorClass::Unknown if appearance != 0 => appearance_name(appearance),
        _ => major_class_name(class),
    }
}

/// Full description line for a device.
pub fn resolve_description(props: &DeviceProperties) -> String {
    let mut description = category(props.class(), props.appearance()).to_string();
    if props.connected() {
        description.push_str(CONNECTED_SUFFIX);
    }
    description
}
