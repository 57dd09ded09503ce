use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::drawing::SceneElement;

/// The locally cached editor state, persisted across reloads.
///
/// `background_url` is only trusted verbatim when no `background_path` is
/// set; signed URLs expire, so a path always wins on restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorSnapshot {
    /// The drawing this state belongs to, if it was ever saved.
    pub drawing_id: Option<Uuid>,
    pub title: Option<String>,
    #[serde(default)]
    pub elements: Vec<SceneElement>,
    pub background_path: Option<String>,
    pub background_url: Option<String>,
}
