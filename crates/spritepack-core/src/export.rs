use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Result, SpritePackError};

/// One sprite as seen by metadata exporters.
///
/// `x, y, width, height` locate the stored (trimmed, unrotated) pixels in the
/// atlas. `frame_*` describe the logical frame: `frame_x = -trim_x`, and
/// `frame_width/height` is the animation's canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpriteRecord {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub frame_x: i32,
    pub frame_y: i32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub rotated: bool,
    #[serde(default)]
    pub flipped_x: bool,
    #[serde(default)]
    pub flipped_y: bool,
    pub source_width: u32,
    pub source_height: u32,
    pub animation: String,
    pub index: usize,
}

impl SpriteRecord {
    pub fn trimmed(&self) -> bool {
        self.frame_x != 0
            || self.frame_y != 0
            || self.width != self.frame_width
            || self.height != self.frame_height
    }

    /// Size occupied in the atlas (post-rotation).
    pub fn placed_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Generator provenance carried into every metadata file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    pub app: String,
    pub version: String,
    pub packer: String,
    pub heuristic: String,
    pub efficiency: f64,
}

impl Provenance {
    pub fn new(packer: impl Into<String>, heuristic: impl Into<String>, efficiency: f64) -> Self {
        Self {
            app: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            packer: packer.into(),
            heuristic: heuristic.into(),
            efficiency,
        }
    }
}

/// Everything an exporter needs to describe one atlas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasMetadata {
    /// Image file name relative to the metadata file.
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub sprites: Vec<SpriteRecord>,
    pub provenance: Provenance,
}

/// Serializes atlas metadata into one text format.
pub trait MetadataExporter {
    /// Registry key (`json`, `json-array`, ...).
    fn key(&self) -> &'static str;
    /// File extension without the dot.
    fn extension(&self) -> &'static str;
    fn export(&self, meta: &AtlasMetadata) -> Result<String>;
}

/// Keys understood by [`exporter_for`].
pub const EXPORT_FORMATS: &[&str] = &["json", "json-array"];

/// Looks up an exporter by key.
pub fn exporter_for(key: &str) -> Result<Box<dyn MetadataExporter + Send + Sync>> {
    match key.to_ascii_lowercase().as_str() {
        "json" | "json-hash" => Ok(Box::new(JsonHashExporter)),
        "json-array" | "jsonarray" => Ok(Box::new(JsonArrayExporter)),
        _ => Err(SpritePackError::UnknownExportFormat(key.to_string())),
    }
}

fn meta_value(meta: &AtlasMetadata) -> Value {
    json!({
        "app": meta.provenance.app,
        "version": meta.provenance.version,
        "image": meta.image,
        "format": "RGBA8888",
        "size": {"w": meta.width, "h": meta.height},
        "scale": "1",
        "packer": meta.provenance.packer,
        "heuristic": meta.provenance.heuristic,
        "efficiency": meta.provenance.efficiency,
    })
}

fn frame_value(s: &SpriteRecord) -> Value {
    let (w, h) = s.placed_size();
    json!({
        "frame": {"x": s.x, "y": s.y, "w": w, "h": h},
        "rotated": s.rotated,
        "trimmed": s.trimmed(),
        "spriteSourceSize": {"x": -s.frame_x, "y": -s.frame_y, "w": s.width, "h": s.height},
        "sourceSize": {"w": s.frame_width, "h": s.frame_height},
        "flippedX": s.flipped_x,
        "flippedY": s.flipped_y,
        "animation": s.animation,
        "index": s.index,
    })
}

/// `{ frames: { name: {...} }, meta }`, the TexturePacker-style JSON hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHashExporter;

impl MetadataExporter for JsonHashExporter {
    fn key(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, meta: &AtlasMetadata) -> Result<String> {
        let mut frames = serde_json::Map::new();
        for s in &meta.sprites {
            frames.insert(s.name.clone(), frame_value(s));
        }
        let doc = json!({"frames": frames, "meta": meta_value(meta)});
        serde_json::to_string_pretty(&doc).map_err(|e| SpritePackError::Encode(e.to_string()))
    }
}

/// `{ frames: [ { filename, ... } ], meta }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArrayExporter;

impl MetadataExporter for JsonArrayExporter {
    fn key(&self) -> &'static str {
        "json-array"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, meta: &AtlasMetadata) -> Result<String> {
        let frames: Vec<Value> = meta
            .sprites
            .iter()
            .map(|s| {
                let mut v = frame_value(s);
                if let Value::Object(m) = &mut v {
                    m.insert("filename".into(), Value::String(s.name.clone()));
                }
                v
            })
            .collect();
        let doc = json!({"frames": frames, "meta": meta_value(meta)});
        serde_json::to_string_pretty(&doc).map_err(|e| SpritePackError::Encode(e.to_string()))
    }
}
