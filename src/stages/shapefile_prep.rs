use crate::config::Config;
use crate::error::Result;
use crate::manifest::JobManifest;
use crate::scanner::JobScanner;
use crate::shapefile::{character_value, AttributeTable};
use crate::stages::copy_file;
use dbase::FieldValue;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Intermediate layer stems produced by the reprojection step, matched
/// case-insensitively because the GIS export does not keep casing stable.
const ADDRESSES_STEM: &str = "addresses";
const ACCESS_POINT_STEM: &str = "access_point";

const PON_HOMES_FIELD: &str = "PON_HOMES";
const STREETNAME_FIELD: &str = "STREETNAME";
const STREET_SOURCE_FIELD: &str = "street";
const TYPE_FIELD: &str = "TYPE";
const STRUCTURE_SOURCE_FIELD: &str = "structur_1";

/// What the prep stage did, for the operation summary.
#[derive(Debug, Clone, Serialize)]
pub struct PrepReport {
    pub source_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub addresses_updated: usize,
    pub access_points_updated: usize,
    pub files_copied: usize,
}

/// Stage 2: finish the reprojected intermediate shapefiles and feed them to
/// the design tool workspace.
///
/// The stage locates the directories the setup stage created (via the job
/// manifest when one exists, falling back to a directory scan for trees laid
/// out by hand), derives the attribute fields the design tool requires,
/// copies the two intermediate layers into the workspace input tree under the
/// names the tool expects, and finally drops the ready marker directory into
/// the source as a gate for the operator.
pub struct ShapefilePrep<'a> {
    config: &'a Config,
}

impl<'a> ShapefilePrep<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn run(&self, scanner: &JobScanner) -> Result<PrepReport> {
        let (source_dir, workspace_dir) = self.locate_dirs(scanner)?;

        let addresses_updated =
            edit_addresses(&source_dir.join(format!("{}.dbf", ADDRESSES_STEM)))?;
        let access_points_updated =
            edit_access_points(&source_dir.join(format!("{}.dbf", ACCESS_POINT_STEM)))?;

        let files_copied = self.copy_intermediates(scanner, &source_dir, &workspace_dir)?;

        // Dropped last: a crash before this point leaves the directory
        // rediscoverable for another attempt.
        fs::create_dir_all(source_dir.join(&self.config.naming.ready_dir))?;

        Ok(PrepReport {
            source_dir,
            workspace_dir,
            addresses_updated,
            access_points_updated,
            files_copied,
        })
    }

    /// Prefer the paths the setup stage recorded; a missing or stale manifest
    /// falls back to scanning, which also covers job trees the operator laid
    /// out without running the setup stage.
    fn locate_dirs(&self, scanner: &JobScanner) -> Result<(PathBuf, PathBuf)> {
        let job_number = scanner.filter().job_number();

        if let Some(manifest) = JobManifest::load(&self.config.roots.documents, job_number)? {
            if manifest.is_current() {
                return Ok((manifest.source_dir, manifest.workspace_dir));
            }
        }

        let source_dir = scanner.find_reprojected_dir(
            &self.config.roots.documents,
            &self.config.naming.reprojected_dir,
            &self.config.naming.ready_dir,
        )?;
        let workspace_dir = scanner.find_workspace_dir(&self.config.roots.workspaces)?;

        Ok((source_dir, workspace_dir))
    }

    /// Copy every sibling of the two intermediate layers into the workspace
    /// input tree, renamed to the layer names the design tool reads.
    fn copy_intermediates(
        &self,
        scanner: &JobScanner,
        source_dir: &Path,
        workspace_dir: &Path,
    ) -> Result<usize> {
        let stems = [ADDRESSES_STEM.to_string(), ACCESS_POINT_STEM.to_string()];
        let matched = scanner.collect_files_by_stem(source_dir, &stems, true)?;

        let mut copied = 0;

        for file in &matched {
            let (subdir, target_stem) = if file.stem.eq_ignore_ascii_case(ADDRESSES_STEM) {
                (Path::new("input").join("demand"), "DemandPoints")
            } else {
                (Path::new("input").join("structures"), "AccessStructures")
            };

            let dest_dir = workspace_dir.join(subdir);
            fs::create_dir_all(&dest_dir)?;

            let dest_name = match &file.extension {
                Some(ext) => format!("{}.{}", target_stem, ext),
                None => target_stem.to_string(),
            };

            copy_file(&file.path, &dest_dir.join(dest_name))?;
            copied += 1;
        }

        Ok(copied)
    }
}

/// Every demand point serves one home, and the design tool wants the street
/// name in its own uppercased field.
fn edit_addresses(path: &Path) -> Result<usize> {
    let mut table = AttributeTable::open(path)?;
    table.add_numeric_field(PON_HOMES_FIELD, 10, 0);
    table.add_character_field(STREETNAME_FIELD, 50);

    for record in table.records_mut() {
        let street = character_value(record, STREET_SOURCE_FIELD)
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_default();

        record.insert(PON_HOMES_FIELD.to_string(), FieldValue::Numeric(Some(1.0)));
        record.insert(
            STREETNAME_FIELD.to_string(),
            FieldValue::Character(Some(street)),
        );
    }

    let updated = table.len();
    table.save()?;
    Ok(updated)
}

/// Access points become handholes sized by the surveyed structure code.
fn edit_access_points(path: &Path) -> Result<usize> {
    let mut table = AttributeTable::open(path)?;
    table.add_character_field(TYPE_FIELD, 50);

    for record in table.records_mut() {
        let structure = character_value(record, STRUCTURE_SOURCE_FIELD)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        record.insert(
            TYPE_FIELD.to_string(),
            FieldValue::Character(Some(format!("HANDHOLE{{{}}}", structure))),
        );
    }

    let updated = table.len();
    table.save()?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FiberPrepError;
    use crate::scanner::NameFilter;
    use dbase::{FieldName, Record, TableWriterBuilder};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: Config,
        source_dir: PathBuf,
        workspace_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.roots.downloads = temp.path().join("Downloads");
        config.roots.documents = temp.path().join("Documents");
        config.roots.desktop = temp.path().join("Desktop");
        config.roots.workspaces = temp.path().join("Workspaces");

        let source_dir = config
            .roots
            .documents
            .join("Washington")
            .join("Oak Harbor")
            .join("20210612-550491")
            .join("reprojected");
        let workspace_dir = config
            .roots
            .workspaces
            .join("Washington")
            .join("Oak Harbor")
            .join("20210612-550491");

        fs::create_dir_all(&config.roots.downloads).unwrap();
        fs::create_dir_all(&config.roots.desktop).unwrap();
        fs::create_dir_all(&source_dir).unwrap();
        fs::create_dir_all(&workspace_dir).unwrap();

        Fixture {
            _temp: temp,
            config,
            source_dir,
            workspace_dir,
        }
    }

    fn scanner() -> JobScanner {
        JobScanner::new(NameFilter::new("550491", "_processed"))
    }

    fn write_table(path: &Path, field: &str, values: &[&str]) {
        let builder = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from(field).unwrap(), 50);
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

    fn write_source_layers(fx: &Fixture) {
        write_table(
            &fx.source_dir.join("addresses.dbf"),
            "street",
            &["Main St", "Pioneer Way"],
        );
        write_table(&fx.source_dir.join("access_point.dbf"), "structur_1", &["A"]);
        // Geometry siblings ride along on the copy.
        fs::write(fx.source_dir.join("Addresses.shp"), b"geom").unwrap();
        fs::write(fx.source_dir.join("access_point.shp"), b"geom").unwrap();
    }

    #[test]
    fn test_run_edits_and_copies() {
        let fx = fixture();
        write_source_layers(&fx);

        let report = ShapefilePrep::new(&fx.config).run(&scanner()).unwrap();

        assert_eq!(report.addresses_updated, 2);
        assert_eq!(report.access_points_updated, 1);
        assert_eq!(report.files_copied, 4);
        assert_eq!(report.source_dir, fx.source_dir);
        assert_eq!(report.workspace_dir, fx.workspace_dir);

        // Derived fields landed in the source tables.
        let addresses = AttributeTable::open(fx.source_dir.join("addresses.dbf")).unwrap();
        assert_eq!(
            crate::shapefile::numeric_value(&addresses.records()[0], "PON_HOMES"),
            Some(1.0)
        );
        assert_eq!(
            character_value(&addresses.records()[0], "STREETNAME").as_deref(),
            Some("MAIN ST")
        );

        let access_points = AttributeTable::open(fx.source_dir.join("access_point.dbf")).unwrap();
        assert_eq!(
            character_value(&access_points.records()[0], "TYPE").as_deref(),
            Some("HANDHOLE{A}")
        );

        // Copies were renamed into the workspace input tree, with the edited
        // attribute table included.
        let demand = fx.workspace_dir.join("input").join("demand");
        let structures = fx.workspace_dir.join("input").join("structures");
        assert!(demand.join("DemandPoints.shp").is_file());
        assert!(structures.join("AccessStructures.shp").is_file());
        assert!(structures.join("AccessStructures.dbf").is_file());

        let copied = AttributeTable::open(demand.join("DemandPoints.dbf")).unwrap();
        assert_eq!(
            character_value(&copied.records()[1], "STREETNAME").as_deref(),
            Some("PIONEER WAY")
        );

        // Ready marker dropped for the operator's manual gate.
        assert!(fx.source_dir.join("ready").is_dir());
    }

    #[test]
    fn test_manifest_paths_take_precedence_over_scanning() {
        let fx = fixture();

        // Directories a name scan would never find for this job.
        let source_dir = fx.config.roots.documents.join("relocated").join("srcdata");
        let workspace_dir = fx.config.roots.workspaces.join("relocated-ws");
        fs::create_dir_all(&source_dir).unwrap();
        fs::create_dir_all(&workspace_dir).unwrap();
        write_table(&source_dir.join("addresses.dbf"), "street", &["Main St"]);
        write_table(&source_dir.join("access_point.dbf"), "structur_1", &["A"]);

        JobManifest {
            job_number: "550491".to_string(),
            state: "Washington".to_string(),
            city: "Oak Harbor".to_string(),
            job_dir: source_dir.parent().unwrap().to_path_buf(),
            source_dir: source_dir.clone(),
            workspace_dir: workspace_dir.clone(),
            created_at: chrono::Local::now(),
        }
        .save(&fx.config.roots.documents)
        .unwrap();

        let report = ShapefilePrep::new(&fx.config).run(&scanner()).unwrap();

        assert_eq!(report.source_dir, source_dir);
        assert_eq!(report.workspace_dir, workspace_dir);
        assert!(workspace_dir
            .join("input")
            .join("demand")
            .join("DemandPoints.dbf")
            .is_file());
    }

    #[test]
    fn test_stale_manifest_falls_back_to_scanning() {
        let fx = fixture();
        write_source_layers(&fx);

        // Recorded directories no longer exist.
        JobManifest {
            job_number: "550491".to_string(),
            state: "Washington".to_string(),
            city: "Oak Harbor".to_string(),
            job_dir: fx.config.roots.documents.join("gone"),
            source_dir: fx.config.roots.documents.join("gone").join("reprojected"),
            workspace_dir: fx.config.roots.workspaces.join("gone"),
            created_at: chrono::Local::now(),
        }
        .save(&fx.config.roots.documents)
        .unwrap();

        let report = ShapefilePrep::new(&fx.config).run(&scanner()).unwrap();
        assert_eq!(report.source_dir, fx.source_dir);
        assert_eq!(report.workspace_dir, fx.workspace_dir);
    }

    #[test]
    fn test_ready_token_excludes_directory() {
        let fx = fixture();

        // Shapefiles already moved into a ready-named directory are skipped.
        let parked = fx.source_dir.parent().unwrap().join("reprojected ready");
        fs::rename(&fx.source_dir, &parked).unwrap();

        let err = ShapefilePrep::new(&fx.config).run(&scanner()).unwrap_err();
        assert!(matches!(err, FiberPrepError::DiscoveryFailed { .. }));
    }

    #[test]
    fn test_run_without_reprojected_dir_fails() {
        let fx = fixture();
        fs::remove_dir_all(&fx.source_dir).unwrap();

        let err = ShapefilePrep::new(&fx.config).run(&scanner()).unwrap_err();
        assert!(matches!(
            err,
            FiberPrepError::DiscoveryFailed { ref target, .. } if target.contains("reprojected")
        ));
    }

    #[test]
    fn test_run_without_workspace_dir_fails() {
        let fx = fixture();
        write_source_layers(&fx);
        fs::remove_dir_all(&fx.workspace_dir).unwrap();

        let err = ShapefilePrep::new(&fx.config).run(&scanner()).unwrap_err();
        assert!(matches!(
            err,
            FiberPrepError::DiscoveryFailed { ref target, .. } if target.contains("workspace")
        ));
    }

    #[test]
    fn test_missing_structure_code_yields_empty_braces() {
        let fx = fixture();
        write_table(
            &fx.source_dir.join("addresses.dbf"),
            "street",
            &["Main St"],
        );
        // Table lacks the structur_1 field entirely.
        write_table(&fx.source_dir.join("access_point.dbf"), "other", &["x"]);

        ShapefilePrep::new(&fx.config).run(&scanner()).unwrap();

        let access_points = AttributeTable::open(fx.source_dir.join("access_point.dbf")).unwrap();
        assert_eq!(
            character_value(&access_points.records()[0], "TYPE").as_deref(),
            Some("HANDHOLE{}")
        );
    }
}
