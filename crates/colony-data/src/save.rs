//! Save files: the world document written as indented JSON or pretty RON.

use crate::loader::{DataLoadError, Format, deserialize_file, detect_format};
use colony_core::registry::Registry;
use colony_core::serialize::WorldData;
use colony_core::world::World;
use std::path::Path;
use std::sync::Arc;

/// Restore a world from a save file, validating it against `registry`.
pub fn load_world(path: &Path, registry: Arc<Registry>) -> Result<World, DataLoadError> {
    save_format(path)?;
    let data: WorldData = deserialize_file(path)?;
    let world = World::from_data(registry, data).map_err(|source| DataLoadError::World {
        file: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        file = %path.display(),
        tick = world.tick(),
        nodes = world.node_count(),
        units = world.unit_count(),
        "world loaded"
    );
    Ok(world)
}

/// Write the world to a save file, replacing any existing one.
pub fn record_world(world: &World, path: &Path) -> Result<(), DataLoadError> {
    let format = save_format(path)?;
    let data = world.to_data();
    let encoded = match format {
        Format::Ron => ron::ser::to_string_pretty(&data, ron::ser::PrettyConfig::default())
            .map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(&data).map_err(|e| e.to_string()),
    }
    .map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })?;
    std::fs::write(path, encoded)?;
    tracing::debug!(file = %path.display(), tick = world.tick(), "world recorded");
    Ok(())
}

/// Save files are JSON or RON; TOML cannot hold the document's nested
/// optional fields.
fn save_format(path: &Path) -> Result<Format, DataLoadError> {
    match detect_format(path)? {
        Format::Toml => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
        format => Ok(format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::test_utils::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "colony_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn json_save_round_trip() {
        let dir = make_test_dir("save_json");
        let path = dir.join("save.json");
        let mut world = colony_world(6, 3);
        run(&mut world, 150);

        record_world(&world, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  "), "save is indented");

        let mut restored = load_world(&path, colony_registry()).unwrap();
        assert_eq!(restored.to_data(), world.to_data());
        assert_eq!(restored.state_hash(), world.state_hash());

        run(&mut world, 100);
        run(&mut restored, 100);
        assert_eq!(restored.state_hash(), world.state_hash());

        cleanup(&dir);
    }

    #[test]
    fn ron_save_round_trip() {
        let dir = make_test_dir("save_ron");
        let path = dir.join("save.ron");
        let mut world = colony_world(3, 9);
        run(&mut world, 80);

        record_world(&world, &path).unwrap();
        let restored = load_world(&path, colony_registry()).unwrap();
        assert_eq!(restored.to_data(), world.to_data());

        cleanup(&dir);
    }

    #[test]
    fn record_overwrites_previous_save() {
        let dir = make_test_dir("save_overwrite");
        let path = dir.join("save.json");
        let mut world = colony_world(2, 1);
        record_world(&world, &path).unwrap();
        run(&mut world, 10);
        record_world(&world, &path).unwrap();

        let restored = load_world(&path, colony_registry()).unwrap();
        assert_eq!(restored.tick(), 10);

        cleanup(&dir);
    }

    #[test]
    fn toml_save_rejected() {
        let dir = make_test_dir("save_toml");
        let path = dir.join("save.toml");
        let world = colony_world(1, 1);
        assert!(matches!(
            record_world(&world, &path),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(!path.exists());
        cleanup(&dir);
    }

    #[test]
    fn save_against_wrong_registry_rejected() {
        let dir = make_test_dir("save_wrong_registry");
        let path = dir.join("save.json");
        let world = colony_world(1, 1);
        record_world(&world, &path).unwrap();

        // The haul registry has three node types; the colony uses five.
        let result = load_world(&path, haul_registry());
        assert!(matches!(result, Err(DataLoadError::World { .. })));

        cleanup(&dir);
    }
}
