use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use neuromap_storage::{read_block_file, SynapticBlock};

const SMALL: &str = r#"
[simulation]
seed = 7

[partitioning]
max_atoms_per_core = 8

[pre]
label = "line"
size = 20

[projection]
id = 3
expression = "exp(-d / 2)"
weights = 0.5
delays = { distribution = "uniform", low = 1.0, high = 4.0 }
chance = 1e-6
"#;

fn neuromap() -> Command {
    Command::cargo_bin("neuromap").unwrap()
}

fn write_config(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("projection.toml");
    std::fs::write(&path, text).unwrap();
    path
}

fn generate(config: &Path, out: &Path, extra: &[&str]) {
    neuromap()
        .arg("generate")
        .arg(config)
        .arg("-o")
        .arg(out)
        .args(extra)
        .assert()
        .success();
}

#[test]
fn init_writes_example_and_refuses_to_overwrite() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("nested").join("projection.toml");

    neuromap().arg("init").arg(&path).assert().success();
    assert!(path.exists());
    let text = std::fs::read_to_string(&path)?;
    assert!(text.contains("[projection]"));

    neuromap()
        .arg("init")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    neuromap().arg("init").arg(&path).arg("--force").assert().success();
    Ok(())
}

#[test]
fn bounds_report_is_json() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, SMALL);

    let output = neuromap().arg("bounds").arg(&config).output()?;
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    assert_eq!(report["projection"], 3);
    assert_eq!(report["pre_slices"], 3);
    assert_eq!(report["post_slices"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["weight_maximum"], 0.5);
    let max_total = report["max_total"].as_u64().unwrap();
    assert!(max_total > 0 && max_total <= 20 * 20);
    assert!(report["delay_maximum"].as_u64().unwrap() <= 4);
    Ok(())
}

#[test]
fn bounds_with_delay_window() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, SMALL);

    let output = neuromap()
        .args(["bounds", "--min-delay", "1", "--max-delay", "2"])
        .arg(&config)
        .output()?;
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    for slice in report["post_slices"].as_array().unwrap() {
        let windowed = slice["max_from_one_pre_in_window"].as_u64().unwrap();
        assert!(windowed <= slice["max_from_one_pre"].as_u64().unwrap());
    }
    Ok(())
}

#[test]
fn generate_then_inspect_binary() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, SMALL);
    let out = tmp.path().join("blocks.bin");

    generate(&config, &out, &[]);
    let blocks = read_block_file(&out)?;
    assert_eq!(blocks.len(), 9);
    for block in &blocks {
        assert_eq!(block.header.projection.raw(), 3);
        for record in &block.records {
            assert_ne!(record.source, record.target);
            assert!((1..=4).contains(&record.delay));
            assert_eq!(record.weight, 1 << 14);
        }
    }

    neuromap()
        .arg("inspect")
        .arg(&out)
        .arg("--detailed")
        .assert()
        .success()
        .stdout(predicate::str::contains("blocks: 9"))
        .stdout(predicate::str::contains("proj3"));
    Ok(())
}

#[test]
fn generation_is_reproducible() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, SMALL);

    for extra in [&[][..], &["--parallel"][..]] {
        let a = tmp.path().join("a.bin");
        let b = tmp.path().join("b.bin");
        generate(&config, &a, extra);
        generate(&config, &b, extra);
        assert_eq!(std::fs::read(&a)?, std::fs::read(&b)?);
    }
    Ok(())
}

#[test]
fn json_and_bincode_formats() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, SMALL);
    let bin = tmp.path().join("blocks.bin");
    let json = tmp.path().join("blocks.json");
    let bincode_out = tmp.path().join("blocks.bincode");

    generate(&config, &bin, &[]);
    generate(&config, &json, &["--format", "json"]);
    generate(&config, &bincode_out, &["--format", "bincode"]);

    let expected = read_block_file(&bin)?;
    let from_json: Vec<SynapticBlock> = serde_json::from_str(&std::fs::read_to_string(&json)?)?;
    let from_bincode: Vec<SynapticBlock> = bincode::deserialize(&std::fs::read(&bincode_out)?)?;
    assert_eq!(from_json, expected);
    assert_eq!(from_bincode, expected);
    Ok(())
}

#[test]
fn invalid_config_fails() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, &SMALL.replace("exp(-d / 2)", "exp(-x)"));
    neuromap()
        .arg("bounds")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connector error"));

    let config = write_config(&tmp, &format!("{}synapse_target = \"GLU\"\n", SMALL));
    neuromap()
        .arg("generate")
        .arg(&config)
        .arg("-o")
        .arg(tmp.path().join("never.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
    assert!(!tmp.path().join("never.bin").exists());
    Ok(())
}

#[test]
fn inspect_rejects_corruption() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = write_config(&tmp, SMALL);
    let out = tmp.path().join("blocks.bin");
    generate(&config, &out, &[]);

    let mut bytes = std::fs::read(&out)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&out, bytes)?;

    neuromap()
        .arg("inspect")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Storage error"));
    Ok(())
}
