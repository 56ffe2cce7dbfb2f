//! Loads a directory of pipeline TOML files into a lookup the other
//! commands can share. `mimir_pipeline::from_file` assigns a fresh random
//! id on every parse (appropriate for a library that doesn't know about
//! persistence); the CLI pins a stable id per file so schedules and queued
//! tasks keep resolving the same pipeline across restarts.

use std::collections::HashMap;
use std::path::Path;

use mimir_types::PipelineDefinition;
use mimir_worker::PipelineSource;
use uuid::Uuid;

/// Fixed namespace so `Uuid::new_v5` is stable across runs for the same
/// file name.
const PIPELINE_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6d, 0x69, 0x6d, 0x69, 0x72, 0x2d, 0x70, 0x69, 0x70, 0x65, 0x6c, 0x69, 0x6e, 0x65, 0x00, 0x00,
]);

pub struct PipelineSet {
    by_id: HashMap<Uuid, PipelineDefinition>,
    by_name: HashMap<String, Uuid>,
}

impl PipelineSet {
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();

        if dir.is_dir() {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                    continue;
                }
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                let mut def = mimir_pipeline::from_file(&path)?;
                def.id = Uuid::new_v5(&PIPELINE_ID_NAMESPACE, stem.as_bytes());
                by_name.insert(def.name.clone(), def.id);
                by_id.insert(def.id, def);
            }
        }

        Ok(Self { by_id, by_name })
    }

    pub fn get(&self, id: Uuid) -> Option<&PipelineDefinition> {
        self.by_id.get(&id)
    }

    pub fn resolve_id(&self, name_or_id: &str) -> Option<Uuid> {
        if let Ok(id) = Uuid::parse_str(name_or_id) {
            if self.by_id.contains_key(&id) {
                return Some(id);
            }
        }
        self.by_name.get(name_or_id).copied()
    }
}

impl PipelineSource for PipelineSet {
    fn get(&self, id: Uuid) -> Option<PipelineDefinition> {
        self.by_id.get(&id).cloned()
    }
}
