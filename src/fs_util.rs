use std::fs;
use std::io::{self, Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PortError;

pub fn pack_zip<I>(entries: I) -> Result<Vec<u8>, PortError>
where
    I: IntoIterator<Item = Result<(String, Vec<u8>), PortError>>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        let (path, content) = entry?;
        let name = path.trim_start_matches('/');
        if name.is_empty() {
            return Err(PortError::Archive(format!("empty entry name for {path:?}")));
        }
        writer
            .start_file(name, options)
            .map_err(|err| PortError::Archive(err.to_string()))?;
        writer
            .write_all(&content)
            .map_err(|err| PortError::Archive(err.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|err| PortError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

pub fn validate_zip(bytes: &[u8]) -> Result<Vec<String>, PortError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|err| PortError::Archive(err.to_string()))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| PortError::Archive(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink()).map_err(|err| PortError::Archive(err.to_string()))?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

pub fn write_output(destination: &Path, content: &[u8]) -> Result<(), PortError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|err| PortError::Filesystem(err.to_string()))?;
    }
    fs::write(destination, content)
        .map_err(|err| PortError::Filesystem(format!("write {}: {err}", destination.display())))
}
