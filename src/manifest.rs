use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::errors::{BgStripError, Result};
use crate::job::{DestinationRule, ImageJob};

/// Job list loaded from a JSON file.
///
/// ```json
/// {
///   "source_dir": "attached_assets/generated_images",
///   "destination": { "mode": "suffix", "output_dir": "client/public/mascot" },
///   "jobs": [
///     "orbit_mascot_thinking_pose.png",
///     { "source": "logo.png", "destination": "public/logo.png" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobManifest {
    /// Base directory for relative sources.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Rule applied to entries without an explicit destination.
    #[serde(default)]
    pub destination: DestinationRule,

    pub jobs: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Source(PathBuf),
    Explicit {
        source: PathBuf,
        destination: PathBuf,
    },
}

impl JobManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BgStripError::FileSystem {
            path: path.to_path_buf(),
            operation: "read manifest".to_string(),
            source: e,
        })?;
        Self::from_json(&text).map_err(|err| match err {
            BgStripError::Manifest { message, .. } => BgStripError::Manifest {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BgStripError::Manifest {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    fn resolve(&self, source: &Path) -> PathBuf {
        match &self.source_dir {
            Some(dir) if source.is_relative() => dir.join(source),
            _ => source.to_path_buf(),
        }
    }

    /// Expand entries into jobs, in file order.
    pub fn into_jobs(self) -> Result<Vec<ImageJob>> {
        self.jobs
            .iter()
            .map(|entry| match entry {
                ManifestEntry::Source(source) => {
                    ImageJob::with_rule(self.resolve(source), &self.destination)
                }
                ManifestEntry::Explicit {
                    source,
                    destination,
                } => Ok(ImageJob::new(self.resolve(source), destination.clone())),
            })
            .collect()
    }
}

/// Whether `path` has an extension the enabled `image` decoders can read.
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path)
        .map(|format| format.reading_enabled())
        .unwrap_or(false)
}

/// Collect supported images directly under `dir` (or down to `max_depth`),
/// sorted by path so repeated runs print in the same order.
pub fn scan_source_dir(dir: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BgStripError::FileSystem {
            path: dir.to_path_buf(),
            operation: "scan source directory".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source directory does not exist",
            ),
        });
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth.max(1))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_supported_image(e.path()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    Ok(paths)
}

/// Resolve specific known filenames against `dir` without checking existence.
/// Missing files surface later as skipped jobs.
pub fn known_files(dir: &Path, names: &[String]) -> Vec<PathBuf> {
    names.iter().map(|name| dir.join(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_entry_forms() -> Result<()> {
        let manifest = JobManifest::from_json(
            r#"{
                "source_dir": "generated",
                "destination": { "mode": "suffix", "output_dir": "mascot" },
                "jobs": [
                    "orbit_thinking.png",
                    { "source": "/abs/logo.png", "destination": "public/logo.png" }
                ]
            }"#,
        )?;

        let jobs = manifest.into_jobs()?;
        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0],
            ImageJob::new(
                "generated/orbit_thinking.png",
                "mascot/orbit_thinking_transparent.png"
            )
        );
        assert_eq!(jobs[1], ImageJob::new("/abs/logo.png", "public/logo.png"));
        Ok(())
    }

    #[test]
    fn test_manifest_defaults() -> Result<()> {
        let manifest = JobManifest::from_json(r#"{ "jobs": ["a/b.png"] }"#)?;
        assert_eq!(manifest.destination, DestinationRule::default());

        let jobs = manifest.into_jobs()?;
        assert_eq!(jobs[0].destination, Path::new("a/b_transparent.png"));
        Ok(())
    }

    #[test]
    fn test_manifest_in_place_rule() -> Result<()> {
        let manifest = JobManifest::from_json(
            r#"{ "destination": { "mode": "in_place" }, "jobs": ["public/favicon.png"] }"#,
        )?;
        let jobs = manifest.into_jobs()?;
        assert!(jobs[0].is_in_place());
        Ok(())
    }

    #[test]
    fn test_manifest_load_reports_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("jobs.json");
        fs::write(&path, "{ not json")?;

        match JobManifest::load(&path) {
            Err(BgStripError::Manifest { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_supported_image_extensions() {
        let test_cases = vec![
            ("test.jpg", true),
            ("test.jpeg", true),
            ("test.PNG", true),
            ("test.webp", true),
            ("test.txt", false),
            ("test", false),
        ];

        for (filename, expected) in test_cases {
            assert_eq!(
                is_supported_image(Path::new(filename)),
                expected,
                "{}",
                filename
            );
        }
    }

    #[test]
    fn test_scan_is_sorted_and_filtered() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        fs::write(dir.join("b.png"), b"x")?;
        fs::write(dir.join("a.jpg"), b"x")?;
        fs::write(dir.join("notes.txt"), b"x")?;
        fs::create_dir_all(dir.join("nested"))?;
        fs::write(dir.join("nested/c.png"), b"x")?;

        let shallow = scan_source_dir(dir, 1)?;
        assert_eq!(shallow, vec![dir.join("a.jpg"), dir.join("b.png")]);

        let deep = scan_source_dir(dir, 2)?;
        assert_eq!(deep.len(), 3);
        Ok(())
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        assert!(scan_source_dir(Path::new("/definitely/not/here"), 1).is_err());
    }

    #[test]
    fn test_known_files_keep_order() {
        let names = vec!["z.png".to_string(), "a.png".to_string()];
        let paths = known_files(Path::new("src"), &names);
        assert_eq!(paths, vec![PathBuf::from("src/z.png"), PathBuf::from("src/a.png")]);
    }
}
