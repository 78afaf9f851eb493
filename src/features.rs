// Feature encoding: impute, one-hot expand, then project onto the frozen schema.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::DiagnosisError;
use crate::models::{
    ErrorKind, SENTINEL_DBM, SENTINEL_MS, TOTAL_LOSS_PCT, WindowedObservation,
};

/// Column prefix for the one-hot `error_kind` expansion.
pub const ERROR_COLUMN_PREFIX: &str = "err_";

/// Ordered input columns fixed when the model was built. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct FrozenSchema {
    version: u32,
    model_id: String,
    columns: Arc<[String]>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct SchemaFile {
    version: u32,
    model_id: String,
    columns: Vec<String>,
}

impl FrozenSchema {
    pub fn new(
        version: u32,
        model_id: impl Into<String>,
        columns: Vec<String>,
    ) -> Result<Self, DiagnosisError> {
        if columns.is_empty() {
            return Err(DiagnosisError::InvalidArtifact(
                "schema has no columns".into(),
            ));
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, c) in columns.iter().enumerate() {
            if c.is_empty() {
                return Err(DiagnosisError::InvalidArtifact(format!(
                    "schema column {} is empty",
                    i
                )));
            }
            if index.insert(c.clone(), i).is_some() {
                return Err(DiagnosisError::InvalidArtifact(format!(
                    "schema column {:?} appears twice",
                    c
                )));
            }
        }
        Ok(Self {
            version,
            model_id: model_id.into(),
            columns: columns.into(),
            index,
        })
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let file: SchemaFile = serde_json::from_str(s)?;
        Self::new(file.version, file.model_id, file.columns).map_err(serde::de::Error::custom)
    }

    pub fn load(path: &Path) -> Result<Self, DiagnosisError> {
        let s = std::fs::read_to_string(path).map_err(|source| DiagnosisError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&s).map_err(|source| DiagnosisError::ArtifactParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }
}

/// Values in schema column order. Always exactly as long as the schema it was encoded against.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == column)?;
        self.values.get(i).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// True if this vector was projected onto exactly these columns.
    pub fn matches(&self, schema: &FrozenSchema) -> bool {
        Arc::ptr_eq(&self.columns, &schema.columns) || *self.columns == *schema.columns
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (c, v) in self.iter() {
            map.serialize_entry(c, &v)?;
        }
        map.end()
    }
}

/// Encodes an observation against `schema`. Pure; identical inputs give bit-identical output.
pub fn encode(obs: &WindowedObservation, schema: &FrozenSchema) -> FeatureVector {
    let encoded = expand(obs);
    let values = schema
        .columns()
        .iter()
        .map(|col| {
            encoded
                .iter()
                .find(|(name, _)| name == col)
                .map(|(_, v)| *v)
                .unwrap_or(0.0)
        })
        .collect();
    FeatureVector {
        columns: Arc::clone(&schema.columns),
        values,
    }
}

/// Imputed numeric columns plus the single hot `err_<kind>` column.
fn expand(obs: &WindowedObservation) -> Vec<(String, f64)> {
    vec![
        ("latency".into(), impute(obs.latency_ms, SENTINEL_MS)),
        ("packet_loss".into(), impute(obs.packet_loss_pct, TOTAL_LOSS_PCT)),
        ("connected".into(), if obs.connected { 1.0 } else { 0.0 }),
        ("jitter".into(), impute(obs.jitter_ms, SENTINEL_MS)),
        ("bandwidth_usage".into(), impute(obs.bandwidth_pct, TOTAL_LOSS_PCT)),
        (
            "signal_strength".into(),
            impute(obs.signal_strength_dbm, SENTINEL_DBM),
        ),
        ("dns_resolution_time".into(), impute(obs.dns_time_ms, SENTINEL_MS)),
        ("connection_drops".into(), obs.connection_drops as f64),
        (error_column(obs.error_kind), 1.0),
    ]
}

pub fn error_column(kind: ErrorKind) -> String {
    format!("{}{}", ERROR_COLUMN_PREFIX, kind.as_str())
}

fn impute(v: f64, sentinel: f64) -> f64 {
    if v.is_finite() { v } else { sentinel }
}
