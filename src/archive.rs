//! Archive codec for XMind documents.
//!
//! A source document is a zip archive carrying `content.json` plus an
//! optional `resources/` folder of binary attachments. The output archive
//! adds a `manifest.json` listing every entry and copies the template's
//! auxiliary files verbatim.

use crate::template::OTHER_FILES;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Archive entry holding the merged tree.
pub const CONTENT_FILE: &str = "content.json";
/// Archive entry listing all file entries of the output.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Prefix under which binary attachments live inside an archive.
pub const RESOURCES_DIR: &str = "resources/";

/// Everything read from one source archive.
#[derive(Debug)]
pub struct SourceLoad {
    /// Source filename, used for labels and error reporting.
    pub name: String,
    /// Raw text of the source's content.json.
    pub content_json: String,
    /// Binary attachments, keyed by path relative to `resources/`.
    pub resources: Vec<(String, Vec<u8>)>,
    /// Non-fatal per-resource read errors.
    pub resource_errors: Vec<String>,
}

/// Read a source document: its content.json text and all resource bytes.
///
/// Any failure up to and including the content read fails the whole source;
/// individual resource read failures are reported but don't.
pub fn load_source(path: &Path, name: &str) -> Result<SourceLoad, String> {
    let data =
        std::fs::read(path).map_err(|e| format!("Error reading '{}': {}", name, e))?;
    let mut archive = ZipArchive::new(std::io::Cursor::new(data))
        .map_err(|e| format!("Error reading '{}' as zip: {}", name, e))?;

    let content_json = {
        let mut entry = match archive.by_name(CONTENT_FILE) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(format!("Content file not found in '{}', skipping", name))
            }
            Err(e) => {
                return Err(format!("Error parsing '{}' content file: {}", name, e))
            }
        };
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| format!("Error parsing '{}' content file: {}", name, e))?;
        text
    };

    let mut resources = Vec::new();
    let mut resource_errors = Vec::new();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                resource_errors.push(format!(
                    "Error reading archive entry {} in '{}': {}",
                    i, name, e
                ));
                continue;
            }
        };
        if entry.is_dir() || !entry.name().starts_with(RESOURCES_DIR) {
            continue;
        }
        let res_path = entry.name()[RESOURCES_DIR.len()..].to_string();
        let mut bytes = Vec::new();
        if let Err(e) = entry.read_to_end(&mut bytes) {
            resource_errors.push(format!(
                "Error reading resource '{}' in '{}': {}",
                res_path, name, e
            ));
            continue;
        }
        resources.push((res_path, bytes));
    }

    Ok(SourceLoad {
        name: name.to_string(),
        content_json,
        resources,
        resource_errors,
    })
}

/// Write the output archive: manifest, staged resources, template auxiliary
/// files, and the merged content.json.
///
/// Staged resource files are deleted from the scratch area as they are
/// packaged. An unreadable staged resource is skipped and reported in the
/// returned list; a failure writing the archive itself is fatal.
pub fn write_output(
    content_json: &str,
    staged: &[(String, PathBuf)],
    dst: &Path,
) -> Result<Vec<String>, String> {
    let mut errors = Vec::new();

    // Gather resource bytes first so the manifest only lists what actually
    // made it into the archive.
    let mut resource_entries: Vec<(String, Vec<u8>)> = Vec::new();
    for (res_path, scratch_path) in staged {
        match std::fs::read(scratch_path) {
            Ok(bytes) => {
                resource_entries.push((format!("{}{}", RESOURCES_DIR, res_path), bytes));
                let _ = std::fs::remove_file(scratch_path);
            }
            Err(e) => errors.push(format!("Error reading staged resource '{}': {}", res_path, e)),
        }
    }

    let mut file_entries = Map::new();
    file_entries.insert(CONTENT_FILE.to_string(), Value::Object(Map::new()));
    file_entries.insert("metadata.json".to_string(), Value::Object(Map::new()));
    for (entry_name, _) in &resource_entries {
        file_entries.insert(entry_name.clone(), Value::Object(Map::new()));
    }
    let mut manifest = Map::new();
    manifest.insert("file-entries".to_string(), Value::Object(file_entries));
    let manifest_json = serde_json::to_string(&Value::Object(manifest))
        .map_err(|e| format!("unable to serialize manifest: {}", e))?;

    let out = File::create(dst).map_err(|e| format!("Error writing '{}': {}", dst.display(), e))?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default();

    let mut add = |name: &str, bytes: &[u8]| -> Result<(), String> {
        zip.start_file(name, options)
            .map_err(|e| format!("Error writing '{}' entry: {}", name, e))?;
        zip.write_all(bytes)
            .map_err(|e| format!("Error writing '{}' entry: {}", name, e))
    };

    add(MANIFEST_FILE, manifest_json.as_bytes())?;
    for (entry_name, bytes) in &resource_entries {
        add(entry_name, bytes)?;
    }
    for &(entry_name, bytes) in OTHER_FILES {
        add(entry_name, bytes)?;
    }
    add(CONTENT_FILE, content_json.as_bytes())?;

    zip.finish()
        .map_err(|e| format!("Error writing '{}': {}", dst.display(), e))?;
    Ok(errors)
}
