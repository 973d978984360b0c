//! Read/write RPG graph files from disk.

use crate::config::StorageConfig;
use crate::graph::RepoGraph;
use crate::schema;
use anyhow::{Context, Result};
use std::fs;
use std::io::Read as _;
use std::path::{Path, PathBuf};

const RPG_DIR: &str = ".rpg";
const RPG_FILE: &str = "graph.json";
const RPG_BACKUP_FILE: &str = "graph.backup.json";

/// Get the path to the RPG directory for a given project root.
pub fn rpg_dir(project_root: &Path) -> PathBuf {
    project_root.join(RPG_DIR)
}

/// Get the path to the RPG graph file for a given project root.
pub fn rpg_file(project_root: &Path) -> PathBuf {
    rpg_dir(project_root).join(RPG_FILE)
}

/// Check if an RPG exists for the given project root.
pub fn rpg_exists(project_root: &Path) -> bool {
    rpg_file(project_root).exists()
}

/// Get the path to the RPG backup file for a given project root.
pub fn rpg_backup_file(project_root: &Path) -> PathBuf {
    rpg_dir(project_root).join(RPG_BACKUP_FILE)
}

/// Create a backup of the current graph before destructive operations.
/// Returns the backup path if created, or None if no graph exists.
pub fn create_backup(project_root: &Path) -> Result<Option<PathBuf>> {
    if !rpg_exists(project_root) {
        return Ok(None);
    }

    let source = rpg_file(project_root);
    let dest = rpg_backup_file(project_root);

    fs::copy(&source, &dest).with_context(|| {
        format!(
            "failed to backup {} to {}",
            source.display(),
            dest.display()
        )
    })?;

    Ok(Some(dest))
}

/// Zstd magic bytes: 0x28 0xB5 0x2F 0xFD.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Load an RPG from disk.
/// Automatically detects zstd-compressed graph files by magic bytes.
pub fn load(project_root: &Path) -> Result<RepoGraph> {
    let path = rpg_file(project_root);
    let raw =
        fs::read(&path).with_context(|| format!("failed to read RPG from {}", path.display()))?;

    let json = if raw.len() >= 4 && raw[..4] == ZSTD_MAGIC {
        let mut decoder = zstd::Decoder::new(&raw[..]).context("failed to init zstd decoder")?;
        let mut decompressed = String::new();
        decoder
            .read_to_string(&mut decompressed)
            .context("failed to decompress graph.json")?;
        decompressed
    } else {
        String::from_utf8(raw).context("graph.json is not valid UTF-8")?
    };

    schema::from_json(&json)
}

/// Save an RPG to disk. Pass `storage_config` to enable compression.
pub fn save(project_root: &Path, graph: &RepoGraph) -> Result<()> {
    save_with_config(project_root, graph, &StorageConfig::default())
}

/// Save with explicit storage configuration.
pub fn save_with_config(
    project_root: &Path,
    graph: &RepoGraph,
    storage_config: &StorageConfig,
) -> Result<()> {
    let dir = rpg_dir(project_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create RPG directory {}", dir.display()))?;

    let json = schema::to_json(graph)?;

    if storage_config.compress {
        let compressed = zstd::encode_all(json.as_bytes(), 3)
            .context("failed to compress graph.json with zstd")?;
        fs::write(rpg_file(project_root), compressed)
            .with_context(|| "failed to write graph.json")?;
    } else {
        fs::write(rpg_file(project_root), json).with_context(|| "failed to write graph.json")?;
    }

    let inner_gitignore = dir.join(".gitignore");
    if !inner_gitignore.exists() {
        let _ = fs::write(&inner_gitignore, "config.toml\n");
    }

    let readme = dir.join("README.md");
    if !readme.exists() {
        let _ = fs::write(&readme, RPG_README);
    }

    Ok(())
}

/// Ensure the .rpg directory has its internal .gitignore.
/// The graph itself is intentionally committed; only local config is ignored.
pub fn ensure_gitignore(project_root: &Path) -> Result<bool> {
    let dir = rpg_dir(project_root);
    fs::create_dir_all(&dir)?;
    let inner_gitignore = dir.join(".gitignore");
    if inner_gitignore.exists() {
        return Ok(true);
    }
    fs::write(&inner_gitignore, "config.toml\n")?;
    Ok(false)
}

const RPG_README: &str = "\
# .rpg

This directory holds the Repository Planning Graph for this project:
`graph.json` is the capability/folder/file/class/function DAG produced by
the proposal, implementation, and codegen stages. `config.toml` (if present)
is local pipeline configuration and is gitignored by default.
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    #[test]
    fn save_and_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut graph = RepoGraph::new();
        graph.add_node(Node::capability("a", "A", "x/a"));
        save(tmp.path(), &graph).unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.nodes.len(), 1);
    }

    #[test]
    fn compressed_round_trip_is_detected_by_magic_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut graph = RepoGraph::new();
        graph.add_node(Node::capability("a", "A", "x/a"));
        let config = StorageConfig {
            compress: true,
            ..Default::default()
        };
        save_with_config(tmp.path(), &graph, &config).unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.nodes.len(), 1);
    }
}
