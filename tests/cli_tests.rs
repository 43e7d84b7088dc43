use assert_cmd::Command;
use dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use fiberprep::archive::{compress_directory, extract_archive};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DELIVERABLE_LAYERS: &[&str] = &[
    "OUT_AccessStructures",
    "OUT_Closures",
    "OUT_DistributionCables",
    "OUT_DropCables",
    "OUT_DropClusters",
    "OUT_FeederCables",
];

const SIBLING_EXTENSIONS: &[&str] = &["shp", "shx", "dbf", "prj", "cpg"];

struct Roots {
    _temp: TempDir,
    downloads: PathBuf,
    documents: PathBuf,
    desktop: PathBuf,
    workspaces: PathBuf,
}

fn roots() -> Roots {
    let temp = TempDir::new().unwrap();
    let roots = Roots {
        downloads: temp.path().join("Downloads"),
        documents: temp.path().join("Documents"),
        desktop: temp.path().join("Desktop"),
        workspaces: temp.path().join("Workspaces"),
        _temp: temp,
    };

    fs::create_dir_all(&roots.downloads).unwrap();
    fs::create_dir_all(&roots.documents).unwrap();
    fs::create_dir_all(&roots.desktop).unwrap();
    fs::create_dir_all(&roots.workspaces).unwrap();

    roots
}

fn fiberprep(roots: &Roots) -> Command {
    let mut cmd = Command::cargo_bin("fiberprep").unwrap();
    cmd.arg("--output-format")
        .arg("plain")
        .arg("--downloads")
        .arg(&roots.downloads)
        .arg("--documents")
        .arg(&roots.documents)
        .arg("--desktop")
        .arg(&roots.desktop)
        .arg("--workspaces")
        .arg(&roots.workspaces);
    cmd
}

fn write_job_archive(downloads: &Path, name: &str) {
    let staging = TempDir::new().unwrap();
    fs::write(staging.path().join("addresses.shp"), b"geometry").unwrap();

    let nested = staging.path().join("layers");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("access_point.dbf"), b"attributes").unwrap();

    compress_directory(staging.path(), &downloads.join(name)).unwrap();
}

fn find_job_dir(documents: &Path, state: &str, city: &str, job: &str) -> PathBuf {
    let parent = documents.join(state).join(city);
    let suffix = format!("-{}", job);

    fs::read_dir(&parent)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().ends_with(&suffix))
                .unwrap_or(false)
        })
        .expect("job directory should exist")
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("fiberprep")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("prepare"))
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("generate-config"));
}

#[test]
fn generate_config_writes_sample_file() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("fiberprep.toml");

    Command::cargo_bin("fiberprep")
        .unwrap()
        .arg("generate-config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated sample configuration"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[roots]"));
    assert!(content.contains("OUT_FeederCables"));
}

#[test]
fn generate_config_warns_before_overwriting() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("fiberprep.toml");
    fs::write(&config_path, "# operator edits").unwrap();

    Command::cargo_bin("fiberprep")
        .unwrap()
        .arg("generate-config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Overwriting existing configuration file"));
}

#[test]
fn verbose_flag_reports_scan_targets() {
    let roots = roots();
    write_job_archive(&roots.downloads, "550491_oak_harbor.zip");

    fiberprep(&roots)
        .args(["-v", "setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Scanning"))
        .stdout(predicate::str::contains("550491"));

    // Without -v the scan chatter stays hidden.
    let roots = self::roots();
    write_job_archive(&roots.downloads, "550491_oak_harbor.zip");

    fiberprep(&roots)
        .args(["setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO:").not());
}

#[test]
fn setup_stages_archives_and_marks_them_processed() {
    let roots = roots();
    write_job_archive(&roots.downloads, "550491_oak_harbor.zip");

    fiberprep(&roots)
        .args(["setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files staged: 2"));

    let job_dir = find_job_dir(&roots.documents, "Washington", "Oak Harbor", "550491");

    // Nested archive contents end up flattened next to the top-level ones.
    assert!(job_dir.join("addresses.shp").is_file());
    assert!(job_dir.join("access_point.dbf").is_file());
    assert!(job_dir.join("reprojected").is_dir());

    // Mirrored workspace directory for the design tool.
    let workspace_dir = roots
        .workspaces
        .join("Washington")
        .join("Oak Harbor")
        .join(job_dir.file_name().unwrap());
    assert!(workspace_dir.is_dir());

    // A manifest recording the created paths is kept for the prepare stage.
    let manifest_path = roots.documents.join(".fiberprep").join("550491.json");
    let manifest = fs::read_to_string(&manifest_path).unwrap();
    assert!(manifest.contains("reprojected"));

    // The archive was renamed with the processed marker, not deleted.
    assert!(!roots.downloads.join("550491_oak_harbor.zip").exists());
    assert!(roots
        .downloads
        .join("550491_oak_harbor_processed.zip")
        .is_file());
}

#[test]
fn setup_aborts_when_destination_exists() {
    let roots = roots();
    write_job_archive(&roots.downloads, "550491_first.zip");

    fiberprep(&roots)
        .args(["setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .success();

    let job_dir = find_job_dir(&roots.documents, "Washington", "Oak Harbor", "550491");
    fs::write(job_dir.join("edited.txt"), "operator work").unwrap();

    // A fresh download for the same job on the same day must not overwrite.
    write_job_archive(&roots.downloads, "550491_second.zip");

    fiberprep(&roots)
        .args(["setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .code(8)
        .stderr(predicate::str::contains("already exists"));

    // First run's output untouched, second archive still unprocessed.
    assert_eq!(
        fs::read_to_string(job_dir.join("edited.txt")).unwrap(),
        "operator work"
    );
    assert!(roots.downloads.join("550491_second.zip").is_file());
}

#[test]
fn setup_without_matching_archives_fails() {
    let roots = roots();
    write_job_archive(&roots.downloads, "999999_other_job.zip");

    fiberprep(&roots)
        .args(["setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("550491"));
}

#[test]
fn missing_root_fails_at_startup() {
    let roots = roots();
    fs::remove_dir_all(&roots.downloads).unwrap();

    fiberprep(&roots)
        .args(["setup", "550491", "Washington", "Oak Harbor"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("downloads"));
}

#[test]
fn prepare_updates_tables_and_feeds_workspace() {
    let roots = roots();

    let source_dir = roots
        .documents
        .join("Washington")
        .join("Oak Harbor")
        .join("20210612-550491")
        .join("reprojected");
    let workspace_dir = roots
        .workspaces
        .join("Washington")
        .join("Oak Harbor")
        .join("20210612-550491");
    fs::create_dir_all(&source_dir).unwrap();
    fs::create_dir_all(&workspace_dir).unwrap();

    write_character_table(
        &source_dir.join("addresses.dbf"),
        "street",
        &["Main St", "Pioneer Way"],
    );
    write_character_table(&source_dir.join("access_point.dbf"), "structur_1", &["A"]);
    fs::write(source_dir.join("addresses.shp"), b"geometry").unwrap();
    fs::write(source_dir.join("access_point.shp"), b"geometry").unwrap();

    fiberprep(&roots)
        .args(["prepare", "550491"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demand point records updated: 2"));

    // Renamed copies landed in the design tool's input tree.
    let demand = workspace_dir.join("input").join("demand");
    let structures = workspace_dir.join("input").join("structures");
    assert!(demand.join("DemandPoints.dbf").is_file());
    assert!(demand.join("DemandPoints.shp").is_file());
    assert!(structures.join("AccessStructures.dbf").is_file());
    assert!(structures.join("AccessStructures.shp").is_file());

    // The copied attribute table carries the derived fields.
    let mut reader = dbase::Reader::from_path(demand.join("DemandPoints.dbf")).unwrap();
    let records = reader.read().unwrap();
    assert_eq!(records.len(), 2);
    assert!(matches!(
        records[0].get("PON_HOMES"),
        Some(FieldValue::Numeric(Some(v))) if *v == 1.0
    ));
    assert!(matches!(
        records[0].get("STREETNAME"),
        Some(FieldValue::Character(Some(s))) if s == "MAIN ST"
    ));

    assert!(source_dir.join("ready").is_dir());
}

#[test]
fn prepare_fails_when_nothing_is_staged() {
    let roots = roots();

    fiberprep(&roots)
        .args(["prepare", "550491"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("reprojected"));
}

#[test]
fn package_zips_exact_deliverable_set() {
    let roots = roots();
    let source = roots._temp.path().join("design_output");
    fs::create_dir_all(&source).unwrap();

    for layer in DELIVERABLE_LAYERS {
        for ext in SIBLING_EXTENSIONS {
            fs::write(source.join(format!("{}.{}", layer, ext)), b"data").unwrap();
        }
    }
    fs::write(source.join("OUT_Trenches.shp"), b"data").unwrap();

    fiberprep(&roots)
        .args(["package", "550491", "Washington", "Oak Harbor"])
        .arg(&source)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files packaged: 30/30"));

    let deliverables = roots
        .desktop
        .join("Deliverables")
        .join("Washington")
        .join("Oak Harbor");

    let archive_path = fs::read_dir(&deliverables)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().map(|e| e == "zip").unwrap_or(false))
        .expect("deliverable zip should exist");

    // Single clean .zip, uncompressed directory removed.
    assert!(archive_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("-550491.zip"));
    assert_eq!(fs::read_dir(&deliverables).unwrap().count(), 1);

    let unpack = TempDir::new().unwrap();
    let entries = extract_archive(&archive_path, unpack.path()).unwrap();
    assert_eq!(entries, 30);
    assert!(unpack.path().join("OUT_550491_Closures.shp").is_file());
    assert!(!unpack.path().join("OUT_550491_Trenches.shp").exists());
}

#[test]
fn package_with_incomplete_set_reports_mismatch() {
    let roots = roots();
    let source = roots._temp.path().join("design_output");
    fs::create_dir_all(&source).unwrap();

    for layer in DELIVERABLE_LAYERS {
        for ext in SIBLING_EXTENSIONS {
            fs::write(source.join(format!("{}.{}", layer, ext)), b"data").unwrap();
        }
    }
    fs::remove_file(source.join("OUT_DropClusters.prj")).unwrap();

    fiberprep(&roots)
        .args(["package", "550491", "Washington", "Oak Harbor"])
        .arg(&source)
        .arg("--yes")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("29"));

    // The partial copy stays on disk for inspection; no zip was produced.
    let output_dir = roots
        .desktop
        .join("Deliverables")
        .join("Washington")
        .join("Oak Harbor");
    let entries: Vec<_> = fs::read_dir(&output_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].path().is_dir());
    assert_eq!(fs::read_dir(entries[0].path()).unwrap().count(), 29);
}

fn write_character_table(path: &Path, field: &str, values: &[&str]) {
    let builder =
        TableWriterBuilder::new().add_character_field(FieldName::try_from(field).unwrap(), 50);
    let writer = builder.build_with_file_dest(path).unwrap();

    let records: Vec<Record> = values
        .iter()
        .map(|value| {
            let mut record = Record::default();
            record.insert(
                field.to_string(),
                FieldValue::Character(Some(value.to_string())),
            );
            record
        })
        .collect();

    writer.write_records(&records).unwrap();
}
