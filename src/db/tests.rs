use super::*;

use crate::internal;
use crate::{DatasetKind, MemoryProvider};

use std::path::PathBuf;

//-----------------------------------------------------------------------------

fn object_names(connection: &Connection, object_type: &str) -> Vec<String> {
    let mut statement = connection.prepare(
        "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name"
    ).unwrap();
    let names = statement.query_map((object_type,), |row| row.get(0)).unwrap();
    let names: Vec<String> = names.map(|x| x.unwrap()).collect();
    names
}

fn check_counts(database: &YeastBase, stats: &LoadStats) {
    assert_eq!(database.chromosomes(), stats.chr_map, "Wrong number of chromosomes");
    assert_eq!(database.background_events(), stats.background, "Wrong number of background events");
    assert_eq!(database.regions(), stats.regions, "Wrong number of regions");
}

//-----------------------------------------------------------------------------

#[test]
fn create_from_fixtures() {
    let (_dir, db_file) = internal::create_fixture_base(&ProvisionParams::default());
    assert!(utils::file_exists(&db_file), "Database {} was not created", db_file.display());
    assert_eq!(identify_database(&db_file), DatabaseFileType::YeastBase);

    let database = internal::open_yeast_base(&db_file);
    check_counts(&database, &LoadStats { chr_map: 4, background: 11, regions: 5 });
    assert!(database.file_size().is_some(), "Cannot determine database size");

    assert_eq!(
        object_names(&database.connection, "table"),
        vec!["background", "chr_map", "regions"]
    );
    assert_eq!(
        object_names(&database.connection, "index"),
        vec!["background_index", "regions_index"]
    );
    assert_eq!(
        object_names(&database.connection, "view"),
        vec!["region_background_agg", "total_bg_hops"]
    );
    assert!(database.foreign_key_violations().unwrap().is_empty(), "Fixtures should not violate foreign keys");
}

#[test]
fn create_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let stats = YeastBase::create_from_dir(utils::get_test_data(""), &db_file, &ProvisionParams::default());
    assert!(stats.is_ok(), "Failed to create database: {}", stats.unwrap_err());
    let database = internal::open_yeast_base(&db_file);
    check_counts(&database, &stats.unwrap());

    let missing = dir.path().join("resources");
    let result = YeastBase::create_from_dir(&missing, dir.path().join("other.db"), &ProvisionParams::default());
    assert!(matches!(result, Err(Error::Resource(_))), "Expected a resource error");
}

#[test]
fn row_count_conservation() {
    let mut provider = internal::scenario_provider(100);
    provider.insert("bg2", "chr,start,sample\nchrI,10,bg2\nchrI,60,bg2\nchrI,70,bg2\n");
    provider.insert("reg2", "chr,start,end,name,sample\nchrI,1,20,YAL002,reg2\nchrI,55,65,YAL003,reg2\n");
    let datasets = vec![
        Dataset::new("map", DatasetKind::ChrMap),
        Dataset::new("bg1", DatasetKind::Background),
        Dataset::new("bg2", DatasetKind::Background),
        Dataset::new("reg1", DatasetKind::Regions),
        Dataset::new("reg2", DatasetKind::Regions),
    ];

    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let stats = YeastBase::create_with_datasets(&provider, &datasets, &db_file, &ProvisionParams::default());
    assert!(stats.is_ok(), "Failed to create database: {}", stats.unwrap_err());
    let stats = stats.unwrap();
    assert_eq!(stats, LoadStats { chr_map: 1, background: 4, regions: 3 });

    let database = internal::open_yeast_base(&db_file);
    check_counts(&database, &stats);
    let totals = database.total_bg_hops().unwrap();
    assert_eq!(totals.iter().map(|x| x.hops).sum::<usize>(), 4);
    assert_eq!(totals.len(), 2);
}

#[test]
fn scenario() {
    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let provider = internal::scenario_provider(100);
    let result = YeastBase::create_with_datasets(&provider, &internal::scenario_datasets(), &db_file, &ProvisionParams::default());
    assert!(result.is_ok(), "Failed to create database: {}", result.unwrap_err());

    let database = internal::open_yeast_base(&db_file);
    let rows = database.region_background_agg().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!((row.chr.as_str(), row.start, row.end), ("chrI", 50, 200));
    assert_eq!(row.background_hops, 1);
    assert_eq!(row.regions_sample.as_deref(), Some("reg1"));
    assert_eq!(row.background_sample.as_deref(), Some("bg1"));
    assert_eq!(row.associated_feature_systematic_id.as_deref(), Some("YAL001"));

    let totals = database.total_bg_hops().unwrap();
    assert_eq!(totals, vec![BackgroundTotal { sample: Some(String::from("bg1")), hops: 1 }]);
}

#[test]
fn read_side_queries() {
    let (_dir, db_file) = internal::create_fixture_base(&ProvisionParams::default());
    let database = internal::open_yeast_base(&db_file);

    let chr_i = database.chromosome("chrI").unwrap();
    assert_eq!(chr_i.as_ref().map(|x| x.seqlength), Some(230218));
    assert_eq!(chr_i.unwrap().refseq.as_deref(), Some("NC_001133.9"));
    let chr_m = database.chromosome("chrM").unwrap().unwrap();
    assert!(chr_m.mitra.is_none(), "Missing values should be NULL");
    assert!(database.chromosome("chrXVII").unwrap().is_none());
    let names: Vec<String> = database.chromosome_records().unwrap().into_iter().map(|x| x.ucsc).collect();
    assert_eq!(names, vec!["chrI", "chrII", "chrIII", "chrM"]);

    let events = database.background_in_interval("chrI", 50, 200).unwrap();
    let starts: Vec<Option<i64>> = events.iter().map(|x| x.start).collect();
    assert_eq!(starts, vec![Some(50), Some(100), Some(120), Some(150), Some(200)]);
    assert_eq!(events[0].sample.as_deref(), Some("sir4"));
    let events = database.background_in_interval("chrI", 1000, 1000).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].annotation.as_deref(), Some("intergenic"));

    let regions = database.regions_for_sample("not_orf").unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].id, 4);
    assert_eq!(regions[0].common_name.as_deref(), Some("none"));
    assert!(regions[0].score.is_none());
    assert_eq!(regions[1].score, Some(2.0));
    assert!(database.regions_for_sample("missing").unwrap().is_empty());
}

#[test]
fn rebuild_views() {
    let (_dir, db_file) = internal::create_fixture_base(&ProvisionParams::default());
    let before = {
        let database = internal::open_yeast_base(&db_file);
        (database.region_background_agg().unwrap(), database.total_bg_hops().unwrap())
    };

    let result = YeastBase::rebuild_views(&db_file, RegionJoin::MatchedOnly);
    assert!(result.is_ok(), "Failed to rebuild views: {}", result.unwrap_err());
    let database = internal::open_yeast_base(&db_file);
    assert_eq!(database.region_background_agg().unwrap(), before.0, "Aggregates changed");
    assert_eq!(database.total_bg_hops().unwrap(), before.1, "Totals changed");
    drop(database);

    let result = YeastBase::rebuild_views(&db_file, RegionJoin::KeepUnmatched);
    assert!(result.is_ok(), "Failed to rebuild views: {}", result.unwrap_err());
    let database = internal::open_yeast_base(&db_file);
    assert_eq!(database.region_background_agg().unwrap().len(), before.0.len() + 1);
}

#[test]
fn rebuild_views_requires_tables() {
    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let result = YeastBase::rebuild_views(&db_file, RegionJoin::MatchedOnly);
    assert!(matches!(result, Err(Error::InvalidDatabase(_))), "Expected an invalid database error for a missing file");

    let connection = Connection::open(&db_file).unwrap();
    connection.execute("CREATE TABLE notes (text TEXT)", ()).unwrap();
    drop(connection);
    let result = YeastBase::rebuild_views(&db_file, RegionJoin::MatchedOnly);
    assert!(matches!(result, Err(Error::InvalidDatabase(_))), "Expected an invalid database error");
}

//-----------------------------------------------------------------------------

#[test]
fn schema_conflict() {
    let (_dir, db_file) = internal::create_fixture_base(&ProvisionParams::default());
    let result = YeastBase::create(&internal::fixture_provider(), &db_file, &ProvisionParams::default());
    assert!(matches!(result, Err(Error::SchemaConflict(_))), "Expected a schema conflict");

    // The existing database is unchanged.
    let database = internal::open_yeast_base(&db_file);
    check_counts(&database, &LoadStats { chr_map: 4, background: 11, regions: 5 });
}

#[test]
fn existing_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    fs::File::create(&db_file).unwrap();
    assert_eq!(identify_database(&db_file), DatabaseFileType::UnknownDatabase);
    let result = YeastBase::create(&internal::fixture_provider(), &db_file, &ProvisionParams::default());
    assert!(result.is_ok(), "Failed to create database in an empty file: {}", result.unwrap_err());
}

#[test]
fn path_errors() {
    let dir = tempfile::tempdir().unwrap();
    let provider = internal::fixture_provider();
    let params = ProvisionParams::default();

    let db_file = dir.path().join("missing").join("yeast.db");
    let result = YeastBase::create(&provider, &db_file, &params);
    assert!(matches!(result, Err(Error::MissingParentDirectory(_))), "Expected a missing parent directory error");
    assert!(!utils::file_exists(&db_file));

    let result = YeastBase::create(&provider, PathBuf::new(), &params);
    assert!(matches!(result, Err(Error::MalformedPath(_))), "Expected a malformed path error for an empty path");

    let result = YeastBase::create(&provider, dir.path(), &params);
    assert!(matches!(result, Err(Error::MalformedPath(_))), "Expected a malformed path error for a directory");

    let result = resolve_db_path(&dir.path().join("yeast.db"));
    assert_eq!(result.ok(), Some(dir.path().join("yeast.db")));
}

#[test]
fn relative_path() {
    let resolved = resolve_db_path(Path::new("yeast.db"));
    assert!(resolved.is_ok(), "Failed to resolve a relative path: {}", resolved.unwrap_err());
    let resolved = resolved.unwrap();
    assert!(resolved.is_absolute());
    assert_eq!(resolved.parent(), std::env::current_dir().ok().as_deref());
}

#[test]
fn foreign_keys() {
    let mut provider = internal::scenario_provider(100);
    provider.insert("bg1", "chr,start,sample\nchrI,100,bg1\nchrX,100,bg1\n");
    let datasets = internal::scenario_datasets();

    // Enforced: the background dataset is rejected.
    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let params = ProvisionParams { enforce_foreign_keys: true, ..ProvisionParams::default() };
    let result = YeastBase::create_with_datasets(&provider, &datasets, &db_file, &params);
    assert!(matches!(result, Err(Error::Load { ref table, .. }) if table == "background"), "Expected a load error");

    // Not enforced by default: the violation can be found afterwards.
    let db_file = dir.path().join("unchecked.db");
    assert!(!ProvisionParams::default().enforce_foreign_keys, "Foreign keys should not be enforced by default");
    let result = YeastBase::create_with_datasets(&provider, &datasets, &db_file, &ProvisionParams::default());
    assert!(result.is_ok(), "Failed to create database: {}", result.unwrap_err());
    let database = internal::open_yeast_base(&db_file);
    let violations = database.foreign_key_violations().unwrap();
    assert_eq!(
        violations,
        vec![ForeignKeyViolation { table: String::from("background"), rowid: Some(2), parent: String::from("chr_map") }]
    );
}

#[test]
fn missing_chromosome_name() {
    let mut provider = internal::scenario_provider(100);
    provider.insert("map", "refseq,ucsc,seqlength\nNC_1,chrI,230218\nNC_2,,1000\n");
    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let result = YeastBase::create_with_datasets(&provider, &internal::scenario_datasets(), &db_file, &ProvisionParams::default());
    assert!(matches!(result, Err(Error::Load { ref table, .. }) if table == "chr_map"), "Expected a load error");
}

#[test]
fn failure_stops_provisioning() {
    let mut provider = MemoryProvider::new();
    provider.insert("map", internal::SCENARIO_CHR_MAP);
    provider.insert("bg1", "chr,begin,sample\nchrI,100,bg1\n");
    provider.insert("reg1", internal::SCENARIO_REGIONS);

    let dir = tempfile::tempdir().unwrap();
    let db_file = internal::temp_db_file(&dir);
    let result = YeastBase::create_with_datasets(&provider, &internal::scenario_datasets(), &db_file, &ProvisionParams::default());
    assert!(matches!(result, Err(Error::Load { .. })), "Expected a load error");

    // The file is partially populated: no regions and no views.
    assert_eq!(identify_database(&db_file), DatabaseFileType::UnknownDatabase);
    let connection = Connection::open(&db_file).unwrap();
    assert_eq!(count_rows(&connection, "chr_map").unwrap(), 1);
    assert_eq!(count_rows(&connection, "regions").unwrap(), 0);
    assert!(object_names(&connection, "view").is_empty());
}

#[test]
fn identify_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.db");
    assert_eq!(identify_database(&missing), DatabaseFileType::Missing);
    assert_eq!(identify_database(dir.path()), DatabaseFileType::NotDatabase);
    let text_file = utils::get_test_data("yeast_chr_map.csv");
    assert_eq!(identify_database(&text_file), DatabaseFileType::NotDatabase);
    assert!(YeastBase::open(&missing).is_err());
}

//-----------------------------------------------------------------------------
