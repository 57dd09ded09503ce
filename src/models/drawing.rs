use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// The kind of a scene element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Rect,
    Text,
    Image,
}

/// One element of a drawing's canvas.
///
/// Elements are an opaque ordered payload from the persistence layer's
/// point of view; insertion order is the z-order fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneElement {
    /// Unique within a drawing.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub w: Option<f64>,
    pub h: Option<f64>,
    pub rotation: Option<f64>,
    pub scale: Option<f64>,
    pub z: Option<i32>,
    /// Image source, for `image` elements.
    pub src: Option<String>,
    /// Label text, for `text` elements.
    pub text: Option<String>,
    pub style: Option<serde_json::Map<String, serde_json::Value>>,
    pub locked: Option<bool>,
}

/// A named, persisted warehouse layout owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drawing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub elements: Vec<SceneElement>,
    /// Path of the background image in the asset store, if any.
    pub background_path: Option<String>,
    /// Set by the writer on every create/update; sole ordering key for
    /// capacity decisions.
    pub updated_at: DateTime<Utc>,
}

/// Identity of the drawing evicted by an over-capacity create, with its
/// prior title for user feedback.
#[derive(Debug, Clone, Serialize)]
pub struct ReplacedDrawing {
    pub id: Uuid,
    pub title: String,
}
