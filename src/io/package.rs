//! Reading and writing `.sb3` project packages.
//!
//! An `.sb3` file is a zip archive holding `project.json` next to the
//! project's costume and sound assets. Only the manifest is decoded; every
//! other entry is copied to the output archive without recompression.

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::errors::{Result, ResultExt, ScramblerError};
use crate::core::manifest::ManifestGraph;

/// Archive entry holding the manifest.
pub const PROJECT_ENTRY: &str = "project.json";

/// Reject paths that do not carry the `.sb3` extension.
pub fn ensure_sb3_path(path: &Path) -> Result<()> {
    let is_sb3 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sb3"));
    if is_sb3 {
        Ok(())
    } else {
        Err(ScramblerError::not_a_scratch_file(path.display().to_string()))
    }
}

/// Load the manifest of an `.sb3` package.
pub fn load_project(path: impl AsRef<Path>) -> Result<Sb3Package> {
    let path = path.as_ref();
    ensure_sb3_path(path)?;
    info!("Loading project: {}", path.display());

    let file = File::open(path)
        .map_err(|e| ScramblerError::io(format!("Failed to open {}", path.display()), e))?;
    let mut archive = ZipArchive::new(file).with_context(|| path.display().to_string())?;

    let mut bytes = Vec::new();
    {
        let mut entry = archive.by_name(PROJECT_ENTRY).map_err(|_| {
            ScramblerError::package(format!("archive has no {PROJECT_ENTRY}"))
                .with_context(path.display().to_string())
        })?;
        entry.read_to_end(&mut bytes)?;
    }
    let manifest = ManifestGraph::from_slice(&bytes).context(PROJECT_ENTRY)?;
    debug!("{} has {} archive entries", path.display(), archive.len());

    Ok(Sb3Package {
        source: path.to_path_buf(),
        manifest,
    })
}

/// A loaded project: its manifest plus the archive it came from.
#[derive(Debug, Clone)]
pub struct Sb3Package {
    source: PathBuf,
    manifest: ManifestGraph,
}

impl Sb3Package {
    /// Path the package was loaded from.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// The decoded manifest.
    pub fn manifest(&self) -> &ManifestGraph {
        &self.manifest
    }

    /// The decoded manifest, for rewriting.
    pub fn manifest_mut(&mut self) -> &mut ManifestGraph {
        &mut self.manifest
    }

    /// Write the package to `out_path` with the current manifest.
    ///
    /// Entries keep their original order. The output may be the source file
    /// itself; the archive is assembled in memory before anything is written.
    pub fn save(&self, out_path: impl AsRef<Path>) -> Result<()> {
        let out_path = out_path.as_ref();
        ensure_sb3_path(out_path)?;

        let source = File::open(&self.source).map_err(|e| {
            ScramblerError::io(format!("Failed to reopen {}", self.source.display()), e)
        })?;
        let mut archive = ZipArchive::new(source).with_context(|| self.source.display().to_string())?;

        let mut buffer = Cursor::new(Vec::<u8>::new());
        let mut writer = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let manifest_bytes = self.manifest.to_json_string()?.into_bytes();

        let mut wrote_manifest = false;
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            if entry.name() == PROJECT_ENTRY {
                drop(entry);
                writer.start_file(PROJECT_ENTRY, options)?;
                writer.write_all(&manifest_bytes)?;
                wrote_manifest = true;
            } else {
                debug!("Copying asset {}", entry.name());
                writer.raw_copy_file(entry)?;
            }
        }
        if !wrote_manifest {
            writer.start_file(PROJECT_ENTRY, options)?;
            writer.write_all(&manifest_bytes)?;
        }
        writer.finish()?;

        fs::write(out_path, buffer.into_inner())
            .map_err(|e| ScramblerError::io(format!("Failed to write {}", out_path.display()), e))?;
        info!("Saved project: {}", out_path.display());
        Ok(())
    }
}
