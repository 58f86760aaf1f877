//! # Yeast-base: reference datasets for yeast transposon calling in an SQLite database.
//!
//! This crate builds a self-contained SQLite database from a fixed collection of yeast reference datasets.
//! The database is built once and then used read-only by analysis tools.
//!
//! # Tables
//!
//! * `chr_map`: Chromosome naming conventions (RefSeq, iGenomes, Ensembl, UCSC, Mitra, numbered) and sequence lengths.
//!   The UCSC name is the canonical name used by the other tables.
//! * `background`: Background transposon insertion events (hops), labelled by sample.
//! * `regions`: Named genomic intervals such as promoters, labelled by sample.
//!
//! Background and regions rows refer to chromosomes by their canonical names.
//! These references are declared as foreign keys. They are checked after loading, and enforcing them during loading is optional.
//! See [`schema`] for the declarations.
//!
//! # Views
//!
//! * `region_background_agg`: The number of background events starting within each region, for each pair of samples.
//! * `total_bg_hops`: The total number of background events for each sample.
//!
//! See [`views`] for the exact semantics.
//!
//! # Building the database
//!
//! Datasets are supplied by a [`ResourceProvider`] as CSV text.
//! [`DirectoryProvider`] reads them from plain or gzipped files, and [`MemoryProvider`] holds them in memory.
//! [`YeastBase::create`] creates the schema, loads the datasets in dependency order, and creates the views.
//! [`YeastBase::open`] opens an existing database in read-only mode.
//!
//! ```
//! use yeast_base::{Dataset, DatasetKind, MemoryProvider, ProvisionParams, YeastBase};
//!
//! let mut provider = MemoryProvider::new();
//! provider.insert("map", "ucsc,seqlength\nchrI,230218\n");
//! provider.insert("bg1", "chr,start,end,sample\nchrI,100,100,bg1\n");
//! provider.insert("reg1", "chr,start,end,name,sample\nchrI,50,200,YAL001,reg1\n");
//! let datasets = vec![
//!     Dataset::new("map", DatasetKind::ChrMap),
//!     Dataset::new("bg1", DatasetKind::Background),
//!     Dataset::new("reg1", DatasetKind::Regions),
//! ];
//!
//! let dir = tempfile::tempdir().unwrap();
//! let db_file = dir.path().join("yeast.db");
//! YeastBase::create_with_datasets(&provider, &datasets, &db_file, &ProvisionParams::default()).unwrap();
//!
//! let database = YeastBase::open(&db_file).unwrap();
//! let rows = database.region_background_agg().unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].background_hops, 1);
//! ```

pub mod db;
pub mod error;
pub mod loader;
pub mod resources;
pub mod schema;
pub mod table;
pub mod utils;
pub mod views;

#[cfg(test)]
mod internal;

pub use db::{YeastBase, ProvisionParams, DatabaseFileType, identify_database};
pub use db::{ChromosomeRecord, BackgroundRecord, RegionRecord, ForeignKeyViolation};
pub use error::Error;
pub use loader::LoadStats;
pub use resources::{Dataset, DatasetKind, ResourceProvider, DirectoryProvider, MemoryProvider};
pub use table::RowSet;
pub use views::{RegionJoin, RegionBackgroundAgg, BackgroundTotal};
