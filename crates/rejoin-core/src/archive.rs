//! EPUB container in and out of a working directory.

use crate::error::{RejoinError, Result};
use crate::index::relative_name;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry that must come first and uncompressed in an EPUB container.
pub const MIMETYPE: &str = "mimetype";

/// Unpack `archive` into a fresh `workdir`. Anything already there is deleted.
///
/// Returns the number of files written.
///
/// # Errors
///
/// Returns [`RejoinError::ArchiveFormat`] if the input is not a zip or an
/// entry would escape `workdir`, and [`RejoinError::Io`] for filesystem
/// failures.
pub fn extract(archive: &Path, workdir: &Path) -> Result<usize> {
    let file = File::open(archive)?;
    let mut zip =
        ZipArchive::new(file).map_err(|err| RejoinError::archive(archive, err.to_string()))?;

    if workdir.exists() {
        debug!(workdir = %workdir.display(), "removing previous working directory");
        fs::remove_dir_all(workdir)?;
    }
    fs::create_dir_all(workdir)?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|err| RejoinError::archive(archive, err.to_string()))?;
        let Some(name) = entry.enclosed_name() else {
            return Err(RejoinError::archive(
                archive,
                format!("unsafe entry path {:?}", entry.name()),
            ));
        };
        let out_path = workdir.join(name);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    info!(
        archive = %archive.display(),
        workdir = %workdir.display(),
        files = written,
        "extracted archive"
    );
    Ok(written)
}

/// Pack every file under `workdir` into a new archive at `dest`.
///
/// `mimetype` goes first, stored. Everything else is deflated, named by its
/// `/`-separated relative path, in lexicographic order.
///
/// # Errors
///
/// Returns [`RejoinError::Persistence`] if the archive cannot be written.
pub fn export(workdir: &Path, dest: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(workdir, &mut files)?;
    let mut names: Vec<(String, PathBuf)> = files
        .into_iter()
        .map(|path| (relative_name(workdir, &path), path))
        .collect();
    names.sort_by(|a, b| {
        (a.0 != MIMETYPE)
            .cmp(&(b.0 != MIMETYPE))
            .then_with(|| a.0.cmp(&b.0))
    });

    let fail = |err: io::Error| RejoinError::persistence(dest, err);
    let zip_fail = |err: zip::result::ZipError| RejoinError::persistence(dest, err.into());

    let mut writer = ZipWriter::new(File::create(dest).map_err(fail)?);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &names {
        let options = if name == MIMETYPE { stored } else { deflated };
        let bytes = fs::read(path)?;
        writer.start_file(name.as_str(), options).map_err(zip_fail)?;
        writer.write_all(&bytes).map_err(fail)?;
    }
    writer.finish().map_err(zip_fail)?;

    info!(dest = %dest.display(), entries = names.len(), "exported archive");
    Ok(names.len())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
