//! Resolution of config file and directory paths into sources.
//!
//! A file becomes one source. A directory is scanned one level deep in name
//! order; entries that do not look like configuration are skipped with a
//! warning, since editor backups and the like are expected there.

use super::source::{Format, Source, TextSource};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decide whether `path` should be parsed, and as what.
///
/// An explicit format accepts every file regardless of extension. Otherwise
/// only `.hcl` and `.json` are accepted. Never touches the filesystem.
pub fn should_parse_file(path: &Path, explicit_format: Option<Format>) -> Option<Format> {
    explicit_format.or_else(|| Format::from_path(path))
}

/// Expand `paths` into ordered text sources plus warnings for skipped files.
pub fn resolve_sources(
    paths: &[PathBuf],
    explicit_format: Option<Format>,
) -> Result<(Vec<Source>, Vec<String>)> {
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    for path in paths {
        let meta = std::fs::metadata(path).map_err(|e| ConfigError::resolution(path, e))?;

        if !meta.is_dir() {
            if let Some(source) = source_from_file(path, explicit_format, &mut warnings)? {
                sources.push(source);
            }
            continue;
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| ConfigError::resolution(path, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()
            .map_err(|e| ConfigError::resolution(path, e))?;
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for entry in entries {
            // metadata() follows symlinks, so a link to a directory is skipped too.
            let entry_meta =
                std::fs::metadata(&entry).map_err(|e| ConfigError::resolution(&entry, e))?;
            if entry_meta.is_dir() {
                debug!("Not descending into {}", entry.display());
                continue;
            }
            if let Some(source) = source_from_file(&entry, explicit_format, &mut warnings)? {
                sources.push(source);
            }
        }
    }

    Ok((sources, warnings))
}

fn source_from_file(
    path: &Path,
    explicit_format: Option<Format>,
    warnings: &mut Vec<String>,
) -> Result<Option<Source>> {
    let Some(format) = should_parse_file(path, explicit_format) else {
        let msg = format!(
            "skipping file {}, extension must be .hcl or .json, or config format must be set",
            path.display()
        );
        warn!("{}", msg);
        warnings.push(msg);
        return Ok(None);
    };

    let data = std::fs::read_to_string(path).map_err(|e| ConfigError::resolution(path, e))?;
    debug!("Loaded config file {} as {}", path.display(), format);

    Ok(Some(Source::Text(TextSource {
        name: path.display().to_string(),
        format: Some(format),
        data,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_should_parse_file() {
        let cases = [
            ("config.json", None, Some(Format::Json)),
            ("config.hcl", None, Some(Format::Hcl)),
            ("config", Some(Format::Hcl), Some(Format::Hcl)),
            ("config.js", Some(Format::Json), Some(Format::Json)),
            ("config.json", Some(Format::Hcl), Some(Format::Hcl)),
            ("config.yaml", None, None),
            ("config.HCL", None, None),
            (".json", None, Some(Format::Json)),
            ("config", None, None),
        ];

        for (filename, format, expected) in cases {
            assert_eq!(
                should_parse_file(Path::new(filename), format),
                expected,
                "filename={}, format={:?}",
                filename,
                format
            );
        }
    }

    #[test]
    fn test_directory_entries_sorted_and_unknown_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.json", "b");
        write(temp.path(), "a.hcl", "a");
        write(temp.path(), "c.yaml", "c");
        write(temp.path(), "a.hcl~", "backup");

        let (sources, warnings) = resolve_sources(&[temp.path().to_path_buf()], None).unwrap();

        let names: Vec<&str> = sources.iter().map(Source::name).collect();
        let dir = temp.path().display().to_string();
        assert_eq!(
            names,
            vec![format!("{}/a.hcl", dir), format!("{}/b.json", dir)]
        );
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("a.hcl~"));
        assert!(warnings[1].contains("c.yaml"));
    }

    #[test]
    fn test_subdirectories_are_not_descended() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        write(&nested, "deep.hcl", "deep");
        write(temp.path(), "top.hcl", "top");

        let (sources, warnings) = resolve_sources(&[temp.path().to_path_buf()], None).unwrap();

        assert_eq!(sources.len(), 1);
        assert!(sources[0].name().ends_with("top.hcl"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_explicit_format_forces_every_entry() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.hcl", "a");
        write(temp.path(), "b.json", "b");
        write(temp.path(), "c.yaml", "c");

        let (sources, warnings) =
            resolve_sources(&[temp.path().to_path_buf()], Some(Format::Json)).unwrap();

        assert_eq!(sources.len(), 3);
        assert!(warnings.is_empty());
        for source in &sources {
            match source {
                Source::Text(text) => assert_eq!(text.format, Some(Format::Json)),
                other => panic!("unexpected source {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_path_is_resolution_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.hcl");

        let err = resolve_sources(&[missing.clone()], None).unwrap_err();

        match err {
            ConfigError::Resolution { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_paths_keep_caller_order() {
        let temp = TempDir::new().unwrap();
        let z = write(temp.path(), "z.json", "z");
        let a = write(temp.path(), "a.json", "a");

        let (sources, _) = resolve_sources(&[z, a], None).unwrap();

        assert!(sources[0].name().ends_with("z.json"));
        assert!(sources[1].name().ends_with("a.json"));
    }
}
