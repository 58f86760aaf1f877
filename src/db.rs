//! Yeast-base: an SQLite database with reference datasets and region/background aggregates.

use crate::{utils, Error};
use crate::loader::{self, LoadStats};
use crate::resources::{self, Dataset, DirectoryProvider, ResourceProvider};
use crate::schema;
use crate::views::{self, BackgroundTotal, RegionBackgroundAgg, RegionJoin};

use std::path::{self, Path, PathBuf};
use std::fs;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};

use log::{info, warn};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Yeast-base construction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvisionParams {
    /// Reject background and regions rows that refer to chromosomes missing from `chr_map`.
    ///
    /// If this is `false` (the default), violations are only reported in the log after loading.
    /// They can be listed with [`YeastBase::foreign_key_violations`].
    pub enforce_foreign_keys: bool,

    /// How regions without background hits appear in `region_background_agg`.
    pub join: RegionJoin,
}

impl Default for ProvisionParams {
    fn default() -> Self {
        Self {
            enforce_foreign_keys: false,
            join: RegionJoin::default(),
        }
    }
}

//-----------------------------------------------------------------------------

/// A database connection to a Yeast-base database.
///
/// The database contains tables `chr_map`, `background`, and `regions`, as well as views `region_background_agg` and `total_bg_hops`.
/// See [`crate::schema`] for the tables and [`crate::views`] for the views.
///
/// A database is built once with [`YeastBase::create`] or one of its variants.
/// The build is a single pass into a new file; it cannot be repeated on a populated file.
/// This structure opens an existing database in read-only mode and caches some row counts.
///
/// # Examples
///
/// ```
/// use yeast_base::{utils, YeastBase, ProvisionParams};
/// use std::fs;
///
/// // Create the database from the datasets in a directory.
/// let resources = utils::get_test_data("");
/// let dir = tempfile::tempdir().unwrap();
/// let db_file = dir.path().join("yeast.db");
/// let stats = YeastBase::create_from_dir(&resources, &db_file, &ProvisionParams::default()).unwrap();
/// assert_eq!(stats.chr_map, 4);
///
/// // Open the database and check the contents.
/// let database = YeastBase::open(&db_file).unwrap();
/// assert_eq!(database.chromosomes(), 4);
/// assert_eq!(database.background_events(), 11);
/// assert_eq!(database.regions(), 5);
/// let totals = database.total_bg_hops().unwrap();
/// assert_eq!(totals.len(), 2);
///
/// // Clean up.
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct YeastBase {
    connection: Connection,
    chromosomes: usize,
    background_events: usize,
    regions: usize,
}

/// Using the database.
impl YeastBase {
    /// Opens a connection to the database in the given file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDatabase`] if the database does not contain all tables and views.
    /// Passes through any database errors.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {
        if !utils::file_exists(&filename) {
            return Err(Error::InvalidDatabase(format!("{} does not exist", filename.as_ref().display())));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(filename, flags)?;
        Self::check_schema(&connection)?;

        let chromosomes = count_rows(&connection, schema::CHR_MAP.name)?;
        let background_events = count_rows(&connection, schema::BACKGROUND.name)?;
        let regions = count_rows(&connection, schema::REGIONS.name)?;

        Ok(YeastBase {
            connection,
            chromosomes, background_events, regions,
        })
    }

    fn check_schema(connection: &Connection) -> Result<(), Error> {
        let missing = schema::missing_objects(connection)?;
        if !missing.is_empty() {
            return Err(Error::InvalidDatabase(format!("Missing {}", missing.join(", "))));
        }
        Ok(())
    }

    /// Returns the filename of the database, or [`None`] if there is no filename.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the number of rows in `chr_map`.
    pub fn chromosomes(&self) -> usize {
        self.chromosomes
    }

    /// Returns the number of rows in `background`.
    pub fn background_events(&self) -> usize {
        self.background_events
    }

    /// Returns the number of rows in `regions`.
    pub fn regions(&self) -> usize {
        self.regions
    }

    /// Returns the chromosome with the given canonical (UCSC) name, or [`None`] if there is no such chromosome.
    pub fn chromosome(&self, ucsc: &str) -> Result<Option<ChromosomeRecord>, Error> {
        let mut statement = self.connection.prepare(
            "SELECT * FROM \"chr_map\" WHERE \"ucsc\" = ?1"
        )?;
        let result = statement.query_row((ucsc,), ChromosomeRecord::from_row).optional()?;
        Ok(result)
    }

    /// Returns all chromosomes ordered by canonical name.
    pub fn chromosome_records(&self) -> Result<Vec<ChromosomeRecord>, Error> {
        let mut statement = self.connection.prepare(
            "SELECT * FROM \"chr_map\" ORDER BY \"ucsc\""
        )?;
        let mut result = Vec::new();
        let mut rows = statement.query(())?;
        while let Some(row) = rows.next()? {
            result.push(ChromosomeRecord::from_row(row)?);
        }
        Ok(result)
    }

    /// Returns background events on the given chromosome starting in the closed interval `[start, end]`.
    ///
    /// The events are ordered by start position and identifier.
    pub fn background_in_interval(&self, chr: &str, start: i64, end: i64) -> Result<Vec<BackgroundRecord>, Error> {
        let mut statement = self.connection.prepare(
            "SELECT * FROM \"background\"
            WHERE \"chr\" = ?1 AND \"start\" BETWEEN ?2 AND ?3
            ORDER BY \"start\", \"id\""
        )?;
        let mut result = Vec::new();
        let mut rows = statement.query((chr, start, end))?;
        while let Some(row) = rows.next()? {
            result.push(BackgroundRecord::from_row(row)?);
        }
        Ok(result)
    }

    /// Returns the regions with the given sample label in the order they were loaded.
    pub fn regions_for_sample(&self, sample: &str) -> Result<Vec<RegionRecord>, Error> {
        let mut statement = self.connection.prepare(
            "SELECT * FROM \"regions\" WHERE \"sample\" = ?1 ORDER BY \"id\""
        )?;
        let mut result = Vec::new();
        let mut rows = statement.query((sample,))?;
        while let Some(row) = rows.next()? {
            result.push(RegionRecord::from_row(row)?);
        }
        Ok(result)
    }

    /// Returns the rows of view `region_background_agg`.
    pub fn region_background_agg(&self) -> Result<Vec<RegionBackgroundAgg>, Error> {
        views::region_background_agg(&self.connection)
    }

    /// Returns the rows of view `total_bg_hops`.
    pub fn total_bg_hops(&self) -> Result<Vec<BackgroundTotal>, Error> {
        views::total_bg_hops(&self.connection)
    }

    /// Returns all rows referring to a chromosome that is not in `chr_map`.
    pub fn foreign_key_violations(&self) -> Result<Vec<ForeignKeyViolation>, Error> {
        foreign_key_violations(&self.connection)
    }
}

//-----------------------------------------------------------------------------

/// Creating the database.
impl YeastBase {
    /// Creates a new database from the bundled datasets supplied by the provider.
    ///
    /// The datasets are listed in [`resources::DATASETS`].
    /// Returns the number of rows loaded into each table.
    ///
    /// # Arguments
    ///
    /// * `provider`: Source of the raw datasets.
    /// * `db_file`: Name of the database file to be created.
    /// * `params`: Construction parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPath`] or [`Error::MissingParentDirectory`] if the path is not usable.
    /// Returns [`Error::SchemaConflict`] if the file already contains conflicting objects.
    /// Passes through any errors from reading, parsing, and loading the datasets.
    /// After an error, the file may be partially populated and should be discarded.
    pub fn create<R: ResourceProvider + ?Sized, P: AsRef<Path>>(
        provider: &R, db_file: P, params: &ProvisionParams
    ) -> Result<LoadStats, Error> {
        Self::create_with_datasets(provider, &resources::default_datasets(), db_file, params)
    }

    /// Creates a new database from the datasets in a directory.
    ///
    /// See [`DirectoryProvider`] for file naming and [`YeastBase::create`] for details.
    pub fn create_from_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        resource_dir: P, db_file: Q, params: &ProvisionParams
    ) -> Result<LoadStats, Error> {
        info!("Reading datasets from {}", resource_dir.as_ref().display());
        let provider = DirectoryProvider::new(resource_dir)?;
        Self::create(&provider, db_file, params)
    }

    /// Creates a new database from the given datasets.
    ///
    /// Chromosome maps must come before background and regions datasets.
    /// There can be any number of datasets of each kind.
    /// See [`YeastBase::create`] for details.
    pub fn create_with_datasets<R: ResourceProvider + ?Sized, P: AsRef<Path>>(
        provider: &R, datasets: &[Dataset], db_file: P, params: &ProvisionParams
    ) -> Result<LoadStats, Error> {
        let db_file = resolve_db_path(db_file.as_ref())?;
        info!("Creating database {}", db_file.display());

        // The connection is closed when it goes out of scope, including on errors.
        let mut connection = Connection::open(&db_file)?;
        let stats = Self::provision(&mut connection, provider, datasets, params)?;
        drop(connection);

        info!("Database size: {}", utils::file_size(&db_file).unwrap_or(String::from("unknown")));
        Ok(stats)
    }

    /// Drops and recreates the views in an existing database.
    ///
    /// The tables are not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDatabase`] if the file does not exist or does not contain the tables.
    /// Passes through any database errors.
    pub fn rebuild_views<P: AsRef<Path>>(db_file: P, join: RegionJoin) -> Result<(), Error> {
        if !utils::file_exists(&db_file) {
            return Err(Error::InvalidDatabase(format!("{} does not exist", db_file.as_ref().display())));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let mut connection = Connection::open_with_flags(&db_file, flags)?;
        let missing: Vec<&str> = schema::missing_objects(&connection)?.into_iter()
            .filter(|name| schema::get_table(name).is_some())
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidDatabase(format!("Missing {}", missing.join(", "))));
        }
        views::build_views(&mut connection, join)
    }

    // Runs the whole build using an open connection to an empty database.
    pub(crate) fn provision<R: ResourceProvider + ?Sized>(
        connection: &mut Connection, provider: &R, datasets: &[Dataset], params: &ProvisionParams
    ) -> Result<LoadStats, Error> {
        connection.pragma_update(None, "foreign_keys", params.enforce_foreign_keys)?;
        schema::create_schema(connection)?;

        let stats = loader::load_datasets(connection, provider, datasets)?;
        info!(
            "Loaded {} chromosomes, {} background events, and {} regions",
            stats.chr_map, stats.background, stats.regions
        );
        if !params.enforce_foreign_keys {
            let violations = foreign_key_violations(connection)?;
            if !violations.is_empty() {
                warn!("Found {} rows referring to unknown chromosomes", violations.len());
            }
        }

        views::build_views(connection, params.join)?;
        Ok(stats)
    }
}

//-----------------------------------------------------------------------------

/// A row in table `chr_map`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChromosomeRecord {
    /// RefSeq accession.
    pub refseq: Option<String>,
    /// iGenomes name.
    pub igenomes: Option<String>,
    /// Ensembl name.
    pub ensembl: Option<String>,
    /// UCSC name; the canonical name used by the other tables.
    pub ucsc: String,
    /// Name in the Mitra convention.
    pub mitra: Option<String>,
    /// Sequence length in base pairs.
    pub seqlength: i64,
    /// Numbered alias.
    pub numbered: Option<String>,
}

impl ChromosomeRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ChromosomeRecord {
            refseq: row.get(0)?,
            igenomes: row.get(1)?,
            ensembl: row.get(2)?,
            ucsc: row.get(3)?,
            mitra: row.get(4)?,
            seqlength: row.get(5)?,
            numbered: row.get(6)?,
        })
    }
}

/// A row in table `background`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundRecord {
    pub id: i64,
    pub chr: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub depth: Option<i64>,
    pub strand: Option<String>,
    pub annotation: Option<String>,
    pub sample: Option<String>,
}

impl BackgroundRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BackgroundRecord {
            id: row.get(0)?,
            chr: row.get(1)?,
            start: row.get(2)?,
            end: row.get(3)?,
            depth: row.get(4)?,
            strand: row.get(5)?,
            annotation: row.get(6)?,
            sample: row.get(7)?,
        })
    }
}

/// A row in table `regions`.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionRecord {
    pub id: i64,
    pub chr: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    /// Systematic name of the associated feature.
    pub name: Option<String>,
    pub score: Option<f64>,
    pub strand: Option<String>,
    pub sample: Option<String>,
    /// Common name of the associated feature; `none` unless given.
    pub common_name: Option<String>,
}

impl RegionRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RegionRecord {
            id: row.get(0)?,
            chr: row.get(1)?,
            start: row.get(2)?,
            end: row.get(3)?,
            name: row.get(4)?,
            score: row.get(5)?,
            strand: row.get(6)?,
            sample: row.get(7)?,
            common_name: row.get(8)?,
        })
    }
}

/// A row that refers to a missing parent row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    /// Table containing the row.
    pub table: String,
    /// Row identifier.
    pub rowid: Option<i64>,
    /// Referenced table.
    pub parent: String,
}

/// Returns all rows in the database that violate foreign key constraints.
///
/// This works regardless of whether foreign keys are enforced.
/// Passes through any database errors.
pub fn foreign_key_violations(connection: &Connection) -> Result<Vec<ForeignKeyViolation>, Error> {
    let mut statement = connection.prepare("PRAGMA foreign_key_check")?;
    let mut result = Vec::new();
    let mut rows = statement.query(())?;
    while let Some(row) = rows.next()? {
        result.push(ForeignKeyViolation {
            table: row.get(0)?,
            rowid: row.get(1)?,
            parent: row.get(2)?,
        });
    }
    Ok(result)
}

//-----------------------------------------------------------------------------

/// Resolves the path of a database file to be created.
///
/// # Errors
///
/// Returns [`Error::MalformedPath`] if the path is empty, cannot be made absolute, does not name a file, or is a directory.
/// Returns [`Error::MissingParentDirectory`] if the parent directory does not exist.
pub fn resolve_db_path(db_file: &Path) -> Result<PathBuf, Error> {
    if db_file.as_os_str().is_empty() {
        return Err(Error::MalformedPath(String::from("Empty path")));
    }
    let absolute = path::absolute(db_file).map_err(|x| {
        Error::MalformedPath(format!("{}: {}", db_file.display(), x))
    })?;
    if absolute.file_name().is_none() || absolute.is_dir() {
        return Err(Error::MalformedPath(format!("{} does not name a file", db_file.display())));
    }
    let parent = absolute.parent().ok_or_else(|| {
        Error::MalformedPath(format!("{} has no parent directory", db_file.display()))
    })?;
    if !parent.is_dir() {
        return Err(Error::MissingParentDirectory(absolute));
    }
    Ok(absolute)
}

/// Type of a potential database file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseFileType {
    /// The file does not exist.
    Missing,
    /// The file is not a valid SQLite database.
    NotDatabase,
    /// The file is an SQLite database without the Yeast-base tables and views.
    UnknownDatabase,
    /// The file is a Yeast-base database.
    YeastBase,
}

/// Determines the type of the given file, which may be a SQLite database.
pub fn identify_database<P: AsRef<Path>>(filename: P) -> DatabaseFileType {
    let Ok(metadata) = fs::metadata(&filename) else {
        return DatabaseFileType::Missing;
    };
    if !metadata.is_file() {
        return DatabaseFileType::NotDatabase;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let Ok(connection) = Connection::open_with_flags(filename, flags) else {
        return DatabaseFileType::NotDatabase;
    };
    // SQLite opens anything lazily; the first query tells if the file is a database.
    match schema::missing_objects(&connection) {
        Ok(missing) if missing.is_empty() => DatabaseFileType::YeastBase,
        Ok(_) => DatabaseFileType::UnknownDatabase,
        Err(_) => DatabaseFileType::NotDatabase,
    }
}

// Returns the number of rows in the table.
fn count_rows(connection: &Connection, table: &str) -> Result<usize, Error> {
    let count = connection.query_row(
        &format!("SELECT COUNT(*) FROM \"{}\"", table),
        (),
        |row| row.get::<_, usize>(0)
    )?;
    Ok(count)
}

//-----------------------------------------------------------------------------
