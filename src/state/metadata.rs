/// Study metadata ingestion
///
/// The surrounding application normally hands the viewer its metadata
/// directly; in the standalone binary that role is played by a JSON study
/// manifest, or by scanning a folder of images when no manifest is given.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::data::{Annotation, ImageRecord, ViewerEntry};

/// Image formats the folder scan picks up.
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no images found in {0}")]
    EmptyFolder(PathBuf),
}

/// On-disk manifest schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    images: Vec<ManifestImage>,
    #[serde(default)]
    annotations: HashMap<String, Vec<Annotation>>,
    #[serde(default)]
    instrument_marks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestImage {
    uuid: String,
    path: PathBuf,
    #[serde(default)]
    thumbnail: Option<PathBuf>,
    #[serde(default)]
    tag_count: usize,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    reference_id: Option<String>,
}

/// Everything the viewer needs from the metadata collaborator.
#[derive(Debug, Clone, Default)]
pub struct Study {
    pub entries: Vec<ViewerEntry>,
    pub annotations: HashMap<String, Vec<Annotation>>,
    pub instrument_marks: HashSet<String>,
}

impl Study {
    pub fn annotations_for(&self, uuid: &str) -> &[Annotation] {
        self.annotations.get(uuid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every assay identity present in the study, for the visibility filter.
    pub fn identities(&self) -> HashSet<String> {
        self.annotations
            .values()
            .flatten()
            .map(|a| a.identity.clone())
            .collect()
    }
}

/// Load a study, dispatching on whether the path is a manifest file or an
/// image folder. Runs on a blocking task because the folder scan walks the
/// filesystem.
pub async fn load_study(path: PathBuf) -> Result<Study, String> {
    tokio::task::spawn_blocking(move || {
        let result = if path.is_dir() {
            scan_folder(&path)
        } else {
            load_manifest(&path)
        };
        result.map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("task join error: {}", e))?
}

/// Parse a JSON study manifest.
pub fn load_manifest(path: &Path) -> Result<Study, MetadataError> {
    let text = std::fs::read_to_string(path)?;
    let manifest: Manifest = serde_json::from_str(&text)?;
    Ok(study_from_manifest(manifest, path.parent()))
}

fn study_from_manifest(manifest: Manifest, base: Option<&Path>) -> Study {
    let resolve = |path: PathBuf| -> PathBuf {
        match (path.is_relative(), base) {
            (true, Some(base)) => base.join(path),
            _ => path,
        }
    };

    let entries = manifest
        .images
        .into_iter()
        .enumerate()
        .map(|(index, image)| ViewerEntry {
            index,
            record: ImageRecord {
                uuid: image.uuid,
                path: resolve(image.path),
                thumbnail: image.thumbnail.map(resolve),
            },
            tag_count: image.tag_count,
            title: image.title,
            reference_id: image.reference_id,
        })
        .collect();

    Study {
        entries,
        annotations: manifest.annotations,
        instrument_marks: manifest.instrument_marks.into_iter().collect(),
    }
}

/// Build a study from a plain folder of images. Entries get their filename
/// as title and their path as identity; there are no annotations or marks.
pub fn scan_folder(folder: &Path) -> Result<Study, MetadataError> {
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    IMAGE_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(MetadataError::EmptyFolder(folder.to_path_buf()));
    }

    let entries = paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string());
            ViewerEntry {
                index,
                record: ImageRecord {
                    uuid: path.to_string_lossy().to_string(),
                    path,
                    thumbnail: None,
                },
                tag_count: 0,
                title,
                reference_id: None,
            }
        })
        .collect();

    Ok(Study {
        entries,
        ..Study::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "images": [
            {
                "uuid": "img-1",
                "path": "slides/one.png",
                "thumbnail": "thumbs/one.png",
                "tag_count": 2,
                "title": "Sediment 10x",
                "reference_id": "RUN-42"
            },
            { "uuid": "img-2", "path": "/abs/two.png" }
        ],
        "annotations": {
            "img-1": [
                { "identity": "wbc", "label": "WBC", "type": "point", "x": 10.0, "y": 20.0 },
                { "identity": "rbc", "label": "RBC", "type": "object", "center_x": 5.0, "center_y": 6.0 }
            ]
        },
        "instrument_marks": ["img-2"]
    }"#;

    #[test]
    fn manifest_parses_and_resolves_paths() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let study = study_from_manifest(manifest, Some(Path::new("/study")));

        assert_eq!(study.entries.len(), 2);
        assert_eq!(study.entries[0].index, 0);
        assert_eq!(
            study.entries[0].record.path,
            PathBuf::from("/study/slides/one.png")
        );
        assert_eq!(
            study.entries[0].record.thumbnail,
            Some(PathBuf::from("/study/thumbs/one.png"))
        );
        // Absolute paths are left alone.
        assert_eq!(study.entries[1].record.path, PathBuf::from("/abs/two.png"));

        assert_eq!(study.annotations_for("img-1").len(), 2);
        assert!(study.annotations_for("img-2").is_empty());
        assert!(study.instrument_marks.contains("img-2"));
    }

    #[test]
    fn identities_collects_across_images() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let study = study_from_manifest(manifest, None);
        let identities = study.identities();
        assert!(identities.contains("wbc"));
        assert!(identities.contains("rbc"));
        assert_eq!(identities.len(), 2);
    }
}
