// Model artifact + frozen schema, loaded and validated as one unit.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::forest::{Forest, Tree};
use crate::error::DiagnosisError;
use crate::features::FrozenSchema;
use crate::models::Label;

/// Artifact layout this build understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct ArtifactFile {
    format_version: u32,
    model_id: String,
    feature_names: Vec<String>,
    classes: Vec<String>,
    trees: Vec<Tree>,
}

/// A forest together with the schema it was trained against.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    model_id: String,
    schema: FrozenSchema,
    classes: Vec<Label>,
    forest: Forest,
}

impl ModelBundle {
    /// Reads both files, then checks that they pair up before anything is returned.
    pub fn load(artifact_path: &Path, schema_path: &Path) -> Result<Self, DiagnosisError> {
        let schema = FrozenSchema::load(schema_path)?;
        let raw = std::fs::read_to_string(artifact_path).map_err(|source| {
            DiagnosisError::ArtifactIo {
                path: artifact_path.to_path_buf(),
                source,
            }
        })?;
        let bundle = Self::from_json(&raw, schema).map_err(|e| match e {
            ParseOrInvalid::Parse(source) => DiagnosisError::ArtifactParse {
                path: artifact_path.to_path_buf(),
                source,
            },
            ParseOrInvalid::Invalid(e) => e,
        })?;
        info!(
            model_id = %bundle.model_id,
            schema_version = bundle.schema.version(),
            trees = bundle.forest.tree_count(),
            artifact = %artifact_path.display(),
            "model loaded"
        );
        Ok(bundle)
    }

    /// Builds a bundle from artifact JSON text and an already-loaded schema.
    pub fn from_parts(artifact_json: &str, schema: FrozenSchema) -> Result<Self, DiagnosisError> {
        Self::from_json(artifact_json, schema).map_err(|e| match e {
            ParseOrInvalid::Parse(source) => DiagnosisError::InvalidArtifact(source.to_string()),
            ParseOrInvalid::Invalid(e) => e,
        })
    }

    fn from_json(s: &str, schema: FrozenSchema) -> Result<Self, ParseOrInvalid> {
        let file: ArtifactFile = serde_json::from_str(s).map_err(ParseOrInvalid::Parse)?;

        if file.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ParseOrInvalid::Invalid(DiagnosisError::InvalidArtifact(
                format!(
                    "format_version {} not supported (expected {})",
                    file.format_version, SUPPORTED_FORMAT_VERSION
                ),
            )));
        }
        if file.model_id != schema.model_id() {
            return Err(ParseOrInvalid::Invalid(DiagnosisError::SchemaMismatch(
                format!(
                    "artifact model_id {:?} does not match schema model_id {:?}",
                    file.model_id,
                    schema.model_id()
                ),
            )));
        }
        if file.feature_names.as_slice() != schema.columns() {
            return Err(ParseOrInvalid::Invalid(DiagnosisError::SchemaMismatch(
                describe_column_mismatch(&file.feature_names, schema.columns()),
            )));
        }

        let classes = parse_classes(&file.classes).map_err(ParseOrInvalid::Invalid)?;
        let forest = Forest::new(file.trees, schema.len(), classes.len())
            .map_err(|e| ParseOrInvalid::Invalid(DiagnosisError::InvalidArtifact(e)))?;

        Ok(Self {
            model_id: file.model_id,
            schema,
            classes,
            forest,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn schema(&self) -> &FrozenSchema {
        &self.schema
    }

    /// Labels in artifact order; index `i` matches probability `i`.
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

enum ParseOrInvalid {
    Parse(serde_json::Error),
    Invalid(DiagnosisError),
}

fn parse_classes(names: &[String]) -> Result<Vec<Label>, DiagnosisError> {
    if names.is_empty() {
        return Err(DiagnosisError::InvalidArtifact("artifact has no classes".into()));
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let label: Label = name
            .parse()
            .map_err(|e| DiagnosisError::InvalidArtifact(format!("{}", e)))?;
        if !seen.insert(label) {
            return Err(DiagnosisError::InvalidArtifact(format!(
                "class {:?} listed twice",
                name
            )));
        }
        out.push(label);
    }
    Ok(out)
}

fn describe_column_mismatch(artifact: &[String], schema: &[String]) -> String {
    if artifact.len() != schema.len() {
        return format!(
            "artifact expects {} features, schema has {} columns",
            artifact.len(),
            schema.len()
        );
    }
    match artifact.iter().zip(schema).position(|(a, s)| a != s) {
        Some(i) => format!(
            "column {} differs: artifact {:?}, schema {:?}",
            i, artifact[i], schema[i]
        ),
        None => "feature names differ from schema columns".into(),
    }
}
