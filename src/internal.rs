use crate::{YeastBase, ProvisionParams, RegionJoin};
use crate::{Dataset, DatasetKind, MemoryProvider, DirectoryProvider};
use crate::utils;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

//-----------------------------------------------------------------------------

// Synthetic datasets.

pub(crate) const SCENARIO_CHR_MAP: &str = "\
refseq,igenomes,ensembl,ucsc,mitra,seqlength,numbered
chrI,chrI,chrI,chrI,chrI,230218,chrI
";

// One background event at the given position on chrI.
pub(crate) fn scenario_background(start: i64) -> String {
    format!("chr,start,end,depth,strand,annotation,sample\nchrI,{},{},1,+,,bg1\n", start, start)
}

pub(crate) const SCENARIO_REGIONS: &str = "\
chr,start,end,name,score,strand,sample
chrI,50,200,YAL001,1.0,+,reg1
";

// Chromosome map, one background dataset, and one regions dataset.
pub(crate) fn scenario_datasets() -> Vec<Dataset> {
    vec![
        Dataset::new("map", DatasetKind::ChrMap),
        Dataset::new("bg1", DatasetKind::Background),
        Dataset::new("reg1", DatasetKind::Regions),
    ]
}

pub(crate) fn scenario_provider(background_start: i64) -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    provider.insert("map", SCENARIO_CHR_MAP);
    provider.insert("bg1", scenario_background(background_start));
    provider.insert("reg1", SCENARIO_REGIONS);
    provider
}

//-----------------------------------------------------------------------------

// Building databases.

// Provisions an in-memory database.
pub(crate) fn provision_in_memory(provider: &MemoryProvider, datasets: &[Dataset], join: RegionJoin) -> Connection {
    let mut connection = Connection::open_in_memory().unwrap();
    let params = ProvisionParams { join, ..ProvisionParams::default() };
    let result = YeastBase::provision(&mut connection, provider, datasets, &params);
    assert!(result.is_ok(), "Failed to provision the database: {}", result.unwrap_err());
    connection
}

pub(crate) fn temp_db_file(dir: &TempDir) -> PathBuf {
    let db_file = dir.path().join("yeast.db");
    assert!(!utils::file_exists(&db_file), "Database {} already exists", db_file.display());
    db_file
}

pub(crate) fn fixture_provider() -> DirectoryProvider {
    let provider = DirectoryProvider::new(utils::get_test_data(""));
    assert!(provider.is_ok(), "Failed to open test data: {}", provider.unwrap_err());
    provider.unwrap()
}

// Creates a database from the test data in a new temporary directory.
pub(crate) fn create_fixture_base(params: &ProvisionParams) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db_file = temp_db_file(&dir);
    let result = YeastBase::create(&fixture_provider(), &db_file, params);
    assert!(result.is_ok(), "Failed to create database: {}", result.unwrap_err());
    (dir, db_file)
}

pub(crate) fn open_yeast_base(filename: &Path) -> YeastBase {
    let database = YeastBase::open(filename);
    assert!(database.is_ok(), "Failed to open database: {}", database.unwrap_err());
    database.unwrap()
}

//-----------------------------------------------------------------------------
