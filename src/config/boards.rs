//! Board catalog

use serde::Serialize;
use std::collections::BTreeMap;

/// A board target the toolchain can compile for
#[derive(Debug, Clone, Serialize)]
pub struct BoardTarget {
    /// Fully qualified board name, e.g. `arduino:avr:uno`
    pub fqbn: &'static str,
    pub name: &'static str,
}

const BUILTIN_BOARDS: &[BoardTarget] = &[
    BoardTarget {
        fqbn: "arduino:avr:nano",
        name: "Arduino Nano",
    },
    BoardTarget {
        fqbn: "arduino:avr:uno",
        name: "Arduino Uno",
    },
    BoardTarget {
        fqbn: "arduino:avr:mega",
        name: "Arduino Mega 2560",
    },
    BoardTarget {
        fqbn: "esp32:esp32:esp32",
        name: "ESP32 Dev Module",
    },
    BoardTarget {
        fqbn: "esp32:esp32:esp32s3",
        name: "ESP32-S3 Module",
    },
    BoardTarget {
        fqbn: "esp8266:esp8266:nodemcuv2",
        name: "ESP8266 NodeMCU",
    },
];

/// Static catalog of supported board targets
pub struct BoardCatalog;

impl BoardCatalog {
    pub fn boards() -> &'static [BoardTarget] {
        BUILTIN_BOARDS
    }

    /// FQBN -> display name, in stable order
    pub fn as_map() -> BTreeMap<&'static str, &'static str> {
        BUILTIN_BOARDS.iter().map(|b| (b.fqbn, b.name)).collect()
    }

    pub fn lookup(fqbn: &str) -> Option<&'static BoardTarget> {
        BUILTIN_BOARDS.iter().find(|b| b.fqbn == fqbn)
    }
}
