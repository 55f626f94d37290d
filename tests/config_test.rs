use std::fs;
use std::time::Duration;

use colagg::{Error, ParallelConfig, Result};
use tempfile::TempDir;

#[test]
fn test_config_files_by_extension() -> Result<()> {
    let dir = TempDir::new()?;

    let toml_path = dir.path().join("colagg.toml");
    fs::write(
        &toml_path,
        "workers = 6\nbatch_cap = 3\ntask_timeout_secs = 12\nbatch_pause_ms = 5\n",
    )?;
    let config = ParallelConfig::from_path(&toml_path)?;
    assert_eq!(config.workers, 6);
    assert_eq!(config.batch_size(), 3);
    assert_eq!(config.task_timeout(), Duration::from_secs(12));
    assert_eq!(config.batch_pause(), Duration::from_millis(5));

    let yaml_path = dir.path().join("colagg.yml");
    fs::write(&yaml_path, "workers: 2\nmin_chunk_rows: 500\n")?;
    let config = ParallelConfig::from_path(&yaml_path)?;
    assert_eq!(config.workers, 2);
    assert_eq!(config.min_chunk_rows, 500);
    assert_eq!(config.chunks_per_worker, ParallelConfig::default().chunks_per_worker);

    let ini_path = dir.path().join("colagg.ini");
    fs::write(&ini_path, "workers=2\n")?;
    assert!(matches!(ParallelConfig::from_path(&ini_path), Err(Error::Config(_))));

    Ok(())
}

#[test]
fn test_invalid_config_values() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("bad.toml");

    fs::write(&path, "task_timeout_secs = 0\n")?;
    assert!(matches!(ParallelConfig::from_path(&path), Err(Error::Config(_))));

    fs::write(&path, "workers = \"many\"\n")?;
    assert!(matches!(ParallelConfig::from_path(&path), Err(Error::Config(_))));

    let missing = ParallelConfig::from_path(dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(Error::Io(_))));
    Ok(())
}

#[test]
fn test_defaults_are_usable() -> Result<()> {
    let config = ParallelConfig::default();
    config.validate()?;
    assert!(config.workers >= 1);
    assert!(config.batch_size() <= config.workers);

    let built = ParallelConfig::builder()
        .workers(3)
        .task_timeout(Duration::from_millis(200))
        .build()?;
    assert_eq!(built.task_timeout(), Duration::from_secs(1));
    Ok(())
}
