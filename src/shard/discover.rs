//! Expand input paths into the list of shard files to process

use crate::config::ConfigError;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// File name suffixes recognized as shards when walking a directory
const SHARD_SUFFIXES: &[&str] = &[
    ".json",
    ".jsonl",
    ".json.gz",
    ".jsonl.gz",
    ".zst",
    ".zstd",
];

pub fn is_shard_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| SHARD_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

fn walk_dir(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| is_shard_file(path))
        .collect();
    files.sort();
    files
}

/// Resolve files and directories into an ordered shard list.
///
/// Explicit files are taken as given, whatever their extension. Directories
/// expand to every shard beneath them in path order. The position of a shard
/// in the returned list is its shard index for the whole run.
pub fn expand_paths(
    inputs: &[PathBuf],
    file_limit: Option<usize>,
) -> Result<Vec<PathBuf>, ConfigError> {
    if inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }

    let mut shards = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = walk_dir(input);
            if found.is_empty() {
                return Err(ConfigError::NoShards(input.clone()));
            }
            tracing::debug!("{} shards under {}", found.len(), input.display());
            shards.extend(found);
        } else if input.is_file() {
            shards.push(input.clone());
        } else {
            return Err(ConfigError::MissingPath(input.clone()));
        }
    }

    if let Some(limit) = file_limit {
        if shards.len() > limit {
            tracing::info!("Limiting run to the first {} of {} shards", limit, shards.len());
            shards.truncate(limit);
        }
    }
    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_recognizes_shard_suffixes() {
        assert!(is_shard_file(Path::new("a/b.jsonl.gz")));
        assert!(is_shard_file(Path::new("b.json.gz")));
        assert!(is_shard_file(Path::new("c.zstd")));
        assert!(is_shard_file(Path::new("d.json")));
        assert!(!is_shard_file(Path::new("notes.txt")));
        assert!(!is_shard_file(Path::new("archive.tar.gz")));
    }

    #[test]
    fn test_directory_expands_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        for name in ["b.json.gz", "a.json.gz", "sub/c.jsonl.gz", "README.md"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let shards = expand_paths(&[dir.path().to_path_buf()], None).unwrap();
        let names: Vec<_> = shards
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.json.gz"),
                PathBuf::from("b.json.gz"),
                PathBuf::from("sub/c.jsonl.gz"),
            ]
        );
    }

    #[test]
    fn test_file_limit_truncates() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("{i}.json.gz")), b"").unwrap();
        }
        let shards = expand_paths(&[dir.path().to_path_buf()], Some(2)).unwrap();
        assert_eq!(shards.len(), 2);
        assert!(shards[0].ends_with("0.json.gz"));
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            expand_paths(&[dir.path().to_path_buf()], None),
            Err(ConfigError::NoShards(_))
        ));
    }

    #[test]
    fn test_missing_path_is_error() {
        assert!(matches!(
            expand_paths(&[PathBuf::from("/no/such/shard.json.gz")], None),
            Err(ConfigError::MissingPath(_))
        ));
        assert!(matches!(expand_paths(&[], None), Err(ConfigError::NoInputs)));
    }

    #[test]
    fn test_explicit_file_kept_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("records.data");
        fs::write(&odd, b"").unwrap();
        assert_eq!(expand_paths(&[odd.clone()], None).unwrap(), vec![odd]);
    }
}
