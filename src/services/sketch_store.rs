//! Sketch and template storage
//!
//! Plain text files under `sketches/` and `templates/`. Names are validated
//! before they touch the filesystem so a request can never address a path
//! outside those directories.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::errors::SketchError;
use crate::models::{SKETCH_EXTENSION, Sketch, SketchInfo, TemplateInfo};

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (
        "blink.ino",
        r#"
// Arduino Blink Example
// Blinks an LED connected to pin 13

void setup() {
  // Initialize digital pin 13 as an output
  pinMode(13, OUTPUT);
}

void loop() {
  digitalWrite(13, HIGH);   // Turn the LED on
  delay(1000);              // Wait for a second
  digitalWrite(13, LOW);    // Turn the LED off
  delay(1000);              // Wait for a second
}
"#,
    ),
    (
        "serial_hello.ino",
        r#"
// Arduino Serial Hello World
// Sends "Hello World!" to serial monitor

void setup() {
  // Initialize serial communication at 9600 baud
  Serial.begin(9600);
}

void loop() {
  Serial.println("Hello World!");
  delay(1000);
}
"#,
    ),
    (
        "analog_read.ino",
        r#"
// Arduino Analog Read Example
// Reads analog input and prints to serial

void setup() {
  Serial.begin(9600);
}

void loop() {
  int sensorValue = analogRead(A0);
  Serial.print("Sensor Value: ");
  Serial.println(sensorValue);
  delay(100);
}
"#,
    ),
    (
        "servo_control.ino",
        r#"
// Arduino Servo Control Example
// Sweeps a servo motor on pin 9

#include <Servo.h>

Servo myservo;
int pos = 0;

void setup() {
  myservo.attach(9);
}

void loop() {
  for (pos = 0; pos <= 180; pos += 1) {
    myservo.write(pos);
    delay(15);
  }
  for (pos = 180; pos >= 0; pos -= 1) {
    myservo.write(pos);
    delay(15);
  }
}
"#,
    ),
    (
        "esp32_wifi.ino",
        r#"
// ESP32 WiFi Connection Example
// Connects to WiFi and prints IP address

#include <WiFi.h>

const char* ssid = "YOUR_SSID";
const char* password = "YOUR_PASSWORD";

void setup() {
  Serial.begin(115200);

  WiFi.begin(ssid, password);

  while (WiFi.status() != WL_CONNECTED) {
    delay(1000);
    Serial.println("Connecting to WiFi...");
  }

  Serial.println("Connected to WiFi!");
  Serial.print("IP address: ");
  Serial.println(WiFi.localIP());
}

void loop() {
}
"#,
    ),
];

/// File-backed store for sketches and templates
#[derive(Debug, Clone)]
pub struct SketchStore {
    sketches_dir: PathBuf,
    templates_dir: PathBuf,
}

impl SketchStore {
    pub fn new(sketches_dir: impl Into<PathBuf>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            sketches_dir: sketches_dir.into(),
            templates_dir: templates_dir.into(),
        }
    }

    /// Create the storage directories and write any missing default templates
    pub async fn init(&self) -> Result<(), SketchError> {
        for dir in [&self.sketches_dir, &self.templates_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| SketchError::Io {
                    path: dir.clone(),
                    source,
                })?;
        }

        for (name, content) in DEFAULT_TEMPLATES {
            let path = self.templates_dir.join(name);
            if !path.exists() {
                tokio::fs::write(&path, content)
                    .await
                    .map_err(|source| SketchError::Io {
                        path: path.clone(),
                        source,
                    })?;
                log::debug!("Created default template {}", name);
            }
        }

        Ok(())
    }

    /// Resolve a validated sketch name to its path
    pub fn sketch_path(&self, name: &str) -> Result<PathBuf, SketchError> {
        validate_name(name)?;
        Ok(self.sketches_dir.join(name))
    }

    pub async fn read_sketch(&self, name: &str) -> Result<Sketch, SketchError> {
        let path = self.sketch_path(name)?;
        read_text(&path, "Sketch", name).await
    }

    /// Write a sketch, appending the extension if missing and normalizing
    /// line endings to `\n`. Returns the stored name.
    pub async fn write_sketch(&self, name: &str, content: &str) -> Result<String, SketchError> {
        let name = with_extension(name);
        let path = self.sketch_path(&name)?;
        let normalized = normalize_line_endings(content);

        tokio::fs::write(&path, normalized)
            .await
            .map_err(|source| SketchError::Io {
                path: path.clone(),
                source,
            })?;

        log::info!("Saved sketch {}", name);
        Ok(name)
    }

    pub async fn delete_sketch(&self, name: &str) -> Result<(), SketchError> {
        let path = self.sketch_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Deleted sketch {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SketchError::NotFound {
                what: "Sketch",
                name: name.to_string(),
            }),
            Err(source) => Err(SketchError::Io { path, source }),
        }
    }

    pub fn list_sketches(&self) -> Result<Vec<SketchInfo>, SketchError> {
        let mut sketches = Vec::new();
        for path in self.glob_sketch_files(&self.sketches_dir)? {
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .map_err(|source| SketchError::Io {
                    path: path.clone(),
                    source,
                })?;
            let epoch_secs = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or_default();

            sketches.push(SketchInfo {
                name: file_name(&path),
                path: path.display().to_string(),
                modified: epoch_secs,
                modified_at: DateTime::<Local>::from(modified),
            });
        }
        Ok(sketches)
    }

    pub fn list_templates(&self) -> Result<Vec<TemplateInfo>, SketchError> {
        Ok(self
            .glob_sketch_files(&self.templates_dir)?
            .into_iter()
            .map(|path| TemplateInfo {
                name: file_name(&path),
                path: path.display().to_string(),
            })
            .collect())
    }

    pub async fn read_template(&self, name: &str) -> Result<Sketch, SketchError> {
        validate_name(name)?;
        read_text(&self.templates_dir.join(name), "Template", name).await
    }

    fn glob_sketch_files(&self, dir: &Path) -> Result<Vec<PathBuf>, SketchError> {
        let pattern = dir.join(format!("*.{}", SKETCH_EXTENSION));
        let pattern = pattern.to_string_lossy();
        let paths = glob::glob(&pattern).map_err(|e| SketchError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        })?;

        let mut files: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
        files.sort();
        Ok(files)
    }
}

async fn read_text(path: &Path, what: &'static str, name: &str) -> Result<Sketch, SketchError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Sketch {
            name: name.to_string(),
            content,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SketchError::NotFound {
            what,
            name: name.to_string(),
        }),
        Err(source) => Err(SketchError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn validate_name(name: &str) -> Result<(), SketchError> {
    let invalid = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.contains("..")
        || name.starts_with('.');
    if invalid {
        return Err(SketchError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn with_extension(name: &str) -> String {
    let suffix = format!(".{}", SKETCH_EXTENSION);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
