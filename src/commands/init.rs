//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write a default configuration file, returning its path
pub fn cmd_init(config_path: &Path, force: bool) -> Result<PathBuf> {
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.init_paths(config_path.parent().map(Path::to_path_buf));
    config.paths.config_file = config_path.to_path_buf();
    config.save()?;
    std::fs::create_dir_all(&config.ingest.temp_dir)?;

    info!("Initialized studyrag at {}", config_path.display());
    Ok(config_path.to_path_buf())
}

pub fn print_init(config_path: &Path) {
    println!("✓ studyrag initialized successfully");
    println!("  Config: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit the config file to pick embedding, vision and generation providers");
    println!("  2. Start Chroma: docker run -p 8000:8000 chromadb/chroma");
    println!("  3. Check the setup: studyrag diagnose");
    println!("  4. Ingest material: studyrag ingest lecture.pdf");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        cmd_init(&path, false).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.collection_name, "study_materials");
        assert_eq!(config.paths.config_file, path);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(matches!(cmd_init(&path, false), Err(Error::Config(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        cmd_init(&path, true).unwrap();
        assert!(Config::load(&path).is_ok());
    }
}
