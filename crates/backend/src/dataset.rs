use std::path::Path;

use chrono::{DateTime, Utc};
use vacaturekaart_shared::filter::apply_filters;
use vacaturekaart_shared::geo::{prepare_points, Rejection, NETHERLANDS};
use vacaturekaart_shared::models::{FilterState, GeoPoint, GeoPointInput};

/// Company feed validated once at startup.
pub struct Dataset {
    pub points: Vec<GeoPoint>,
    pub rejected: Vec<(String, Rejection)>,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let inputs: Vec<GeoPointInput> = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

        let dataset = Self::from_inputs(&inputs);
        tracing::info!(
            path = %path.display(),
            points = dataset.points.len(),
            rejected = dataset.rejected.len(),
            "Loaded company feed"
        );
        Ok(dataset)
    }

    pub fn from_inputs(inputs: &[GeoPointInput]) -> Self {
        let prepared = prepare_points(inputs, &NETHERLANDS);
        Dataset {
            points: prepared.points,
            rejected: prepared.rejected,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::from_inputs(&[])
    }

    pub fn filtered(&self, filter: &FilterState) -> Vec<GeoPoint> {
        apply_filters(&self.points, filter)
    }
}
