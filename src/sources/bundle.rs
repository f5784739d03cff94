use crate::error::CatalogError;
use crate::model::{AppRecord, LaunchSpec};
use crate::sources::Source;
use directories::BaseDirs;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const BUNDLE_SUFFIX: &str = ".app";

pub fn default_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        Path::new("/Applications").to_path_buf(),
        Path::new("/System/Applications").to_path_buf(),
    ];
    if let Some(base_dirs) = BaseDirs::new() {
        dirs.push(base_dirs.home_dir().join("Applications"));
    }
    dirs
}

/// macOS source: `.app` bundles directly under the application folders.
pub struct BundleSource {
    dirs: Vec<PathBuf>,
}

impl BundleSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl Source for BundleSource {
    fn scan(&self) -> Result<Vec<AppRecord>, CatalogError> {
        let mut records = Vec::new();

        for dir in &self.dirs {
            if !dir.exists() {
                debug!("Application folder {:?} does not exist, skipping", dir);
                continue;
            }
            let read_dir = match fs::read_dir(dir) {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    warn!("BundleSource: failed to list {:?}: {}", dir, e);
                    continue;
                }
            };

            for entry in read_dir.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                if let Some(record) = file_name(&path).and_then(|n| parse_bundle(&path, &n)) {
                    records.push(record);
                }
            }
        }

        info!("BundleSource: found {} entries", records.len());
        Ok(records)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|s| s.to_str()).map(str::to_string)
}

fn parse_bundle(path: &Path, file_name: &str) -> Option<AppRecord> {
    let name = file_name.strip_suffix(BUNDLE_SUFFIX)?;
    if name.is_empty() {
        return None;
    }

    let mut record = AppRecord::new(
        name.to_string(),
        name.to_string(),
        path.to_string_lossy().to_string(),
        LaunchSpec::Open(path.to_path_buf()),
    );
    record.icon = "🖥️".to_string();
    if path.join("Contents").join("Info.plist").exists() {
        record.description = format!("macOS application: {}", name);
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundles_are_listed_without_recursing() {
        let root = tempfile::tempdir().unwrap();
        let safari = root.path().join("Safari.app");
        fs::create_dir_all(safari.join("Contents")).unwrap();
        fs::write(safari.join("Contents").join("Info.plist"), "<plist/>").unwrap();
        fs::create_dir_all(root.path().join("Bare.app")).unwrap();
        fs::create_dir_all(root.path().join("Utilities").join("Nested.app")).unwrap();
        fs::write(root.path().join("Fake.app"), "not a directory").unwrap();

        let mut records = BundleSource::new(vec![root.path().to_path_buf()]).scan().unwrap();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let names: Vec<_> = records.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["Bare", "Safari"]);

        let safari_record = &records[1];
        assert_eq!(safari_record.description, "macOS application: Safari");
        assert_eq!(safari_record.launch_path, safari.to_string_lossy());
        assert_eq!(safari_record.launch, LaunchSpec::Open(safari.clone()));
        assert_eq!(records[0].description, "");
    }
}
