use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use zip::ZipArchive;

use crate::error::{PipelineError, Result};
use crate::filename::has_spreadsheet_extension;

const DEFAULT_METADATA_FOLDER: &str = "__MACOSX/";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFormat {
    ArchiveFolder { folder: String },
    Mixed {
        #[serde(default = "default_metadata_folder")]
        exclude_folder: String,
    },
}

fn default_metadata_folder() -> String {
    DEFAULT_METADATA_FOLDER.to_string()
}

impl Default for SourceFormat {
    fn default() -> Self {
        SourceFormat::Mixed {
            exclude_folder: default_metadata_folder(),
        }
    }
}

impl SourceFormat {
    pub fn accepts_loose_files(&self) -> bool {
        matches!(self, SourceFormat::Mixed { .. })
    }

    pub fn accepts_entry(&self, name: &str) -> bool {
        if !has_spreadsheet_extension(name) {
            return false;
        }
        match self {
            SourceFormat::ArchiveFolder { folder } => name.starts_with(folder.as_str()),
            SourceFormat::Mixed { exclude_folder } => {
                exclude_folder.is_empty() || !name.starts_with(exclude_folder.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Archive,
    Spreadsheet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

pub fn discover_sources(dir: &Path, format: &SourceFormat) -> Result<Vec<SourceFile>> {
    let entries = fs::read_dir(dir).map_err(|err| PipelineError::io(dir, err))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(dir, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_archive_name(&name) {
            out.push(SourceFile {
                path,
                kind: SourceKind::Archive,
            });
        } else if format.accepts_loose_files() && format.accepts_entry(&name) {
            out.push(SourceFile {
                path,
                kind: SourceKind::Spreadsheet,
            });
        } else {
            tracing::debug!(file = %name, "skipping non-source file");
        }
    }
    out.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(out)
}

fn is_archive_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("zip"))
}

pub struct ArchiveSource {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl ArchiveSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| PipelineError::io(path, err))?;
        let archive = ZipArchive::new(file).map_err(|source| PipelineError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn entry_names(&self, format: &SourceFormat) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/') && format.accepts_entry(name))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let malformed = |reason: String| PipelineError::MalformedSpreadsheet {
            entry: format!("{}:{name}", self.path.display()),
            reason,
        };
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|err| malformed(err.to_string()))?;
        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)
            .map_err(|err| malformed(err.to_string()))?;
        Ok(bytes)
    }
}

pub fn read_loose_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| PipelineError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_folder_requires_prefix() {
        let format = SourceFormat::ArchiveFolder {
            folder: "SEC Players/".to_string(),
        };
        assert!(format.accepts_entry("SEC Players/Player stats A.xlsx"));
        assert!(!format.accepts_entry("Other/Player stats A.xlsx"));
        assert!(!format.accepts_entry("SEC Players/notes.txt"));
        assert!(!format.accepts_loose_files());
    }

    #[test]
    fn mixed_skips_metadata_folder() {
        let format = SourceFormat::default();
        assert!(format.accepts_entry("Players/Player stats A.xlsx"));
        assert!(format.accepts_entry("Player stats A.xlsx"));
        assert!(!format.accepts_entry("__MACOSX/Players/._Player stats A.xlsx"));
        assert!(format.accepts_loose_files());
    }

    #[test]
    fn discovers_sources_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.zip", "a.ZIP", "Player stats C.xlsx", "readme.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.zip")).unwrap();

        let mixed = discover_sources(dir.path(), &SourceFormat::default()).unwrap();
        let labels: Vec<String> = mixed.iter().map(SourceFile::label).collect();
        assert_eq!(labels, vec!["Player stats C.xlsx", "a.ZIP", "b.zip"]);
        assert_eq!(mixed[0].kind, SourceKind::Spreadsheet);

        let archives_only = discover_sources(
            dir.path(),
            &SourceFormat::ArchiveFolder {
                folder: "SEC Players/".to_string(),
            },
        )
        .unwrap();
        assert_eq!(archives_only.len(), 2);
        assert!(archives_only.iter().all(|s| s.kind == SourceKind::Archive));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = discover_sources(Path::new("/definitely/not/here"), &SourceFormat::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
