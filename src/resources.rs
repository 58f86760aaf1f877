//! Sources for the raw datasets loaded into the database.
//!
//! A [`ResourceProvider`] supplies the CSV text for each [`Dataset`].
//! The provisioner does not care where the text comes from: [`DirectoryProvider`] reads it from files, and [`MemoryProvider`] holds it in memory.

use crate::{utils, Error};
use crate::schema::{self, TableSchema};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

//-----------------------------------------------------------------------------

/// The kind of a dataset, which determines the target table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Chromosome name mapping (`chr_map`).
    ChrMap,
    /// Background events (`background`).
    Background,
    /// Named regions (`regions`).
    Regions,
}

impl DatasetKind {
    /// Returns the schema of the target table.
    pub fn table(&self) -> &'static TableSchema {
        match self {
            DatasetKind::ChrMap => &schema::CHR_MAP,
            DatasetKind::Background => &schema::BACKGROUND,
            DatasetKind::Regions => &schema::REGIONS,
        }
    }
}

/// A named raw dataset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dataset {
    /// Name of the dataset, which is also the file stem for [`DirectoryProvider`].
    pub name: String,
    /// Kind of the dataset.
    pub kind: DatasetKind,
}

impl Dataset {
    /// Creates a new dataset description.
    pub fn new<S: Into<String>>(name: S, kind: DatasetKind) -> Self {
        Dataset { name: name.into(), kind }
    }
}

/// Names and kinds of the bundled datasets in load order.
pub const DATASETS: [(&str, DatasetKind); 5] = [
    ("yeast_chr_map", DatasetKind::ChrMap),
    ("yeast_background_adh1", DatasetKind::Background),
    ("yeast_background_sir4", DatasetKind::Background),
    ("yeast_promoters_yiming", DatasetKind::Regions),
    ("yeast_promoters_not_orf", DatasetKind::Regions),
];

/// Returns the bundled datasets in load order.
pub fn default_datasets() -> Vec<Dataset> {
    DATASETS.iter().map(|(name, kind)| Dataset::new(*name, *kind)).collect()
}

/// Checks that the datasets are in dependency order: all chromosome maps before any other dataset.
///
/// # Errors
///
/// Returns [`Error::Resource`] if a chromosome map follows a background or regions dataset.
pub fn check_load_order(datasets: &[Dataset]) -> Result<(), Error> {
    let first_dependent = datasets.iter().position(|x| x.kind != DatasetKind::ChrMap);
    if let Some(first) = first_dependent {
        if let Some(late) = datasets[first..].iter().find(|x| x.kind == DatasetKind::ChrMap) {
            return Err(Error::Resource(format!(
                "Chromosome map {} must be loaded before {}", late.name, datasets[first].name
            )));
        }
    }
    Ok(())
}

//-----------------------------------------------------------------------------

/// A source of raw tabular text for datasets.
pub trait ResourceProvider {
    /// Returns the CSV text of the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if the dataset is not available.
    fn raw_dataset(&self, dataset: &Dataset) -> Result<String, Error>;
}

/// Datasets stored as `<name>.csv` or `<name>.csv.gz` files in a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryProvider {
    directory: PathBuf,
}

impl DirectoryProvider {
    /// Creates a provider for the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if the directory does not exist.
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self, Error> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(Error::Resource(format!("Resource directory {} does not exist", directory.display())));
        }
        Ok(DirectoryProvider { directory: directory.to_path_buf() })
    }

    /// Returns the resource directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the file storing the dataset, or [`None`] if there is no such file.
    ///
    /// Uncompressed files take precedence over compressed ones.
    pub fn dataset_file(&self, dataset: &Dataset) -> Option<PathBuf> {
        ["csv", "csv.gz"].iter()
            .map(|extension| self.directory.join(format!("{}.{}", dataset.name, extension)))
            .find(|filename| filename.is_file())
    }
}

impl ResourceProvider for DirectoryProvider {
    fn raw_dataset(&self, dataset: &Dataset) -> Result<String, Error> {
        let filename = self.dataset_file(dataset).ok_or_else(|| Error::Resource(format!(
            "Dataset {} not found in {}", dataset.name, self.directory.display()
        )))?;
        utils::read_text(filename)
    }
}

/// Datasets held in memory.
///
/// # Examples
///
/// ```
/// use yeast_base::{Dataset, DatasetKind, MemoryProvider, ResourceProvider};
///
/// let mut provider = MemoryProvider::new();
/// provider.insert("bg1", "chr,start,end,sample\nchrI,100,100,bg1\n");
/// let dataset = Dataset::new("bg1", DatasetKind::Background);
/// assert!(provider.raw_dataset(&dataset).unwrap().starts_with("chr,start"));
/// assert!(provider.raw_dataset(&Dataset::new("bg2", DatasetKind::Background)).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryProvider {
    datasets: HashMap<String, String>,
}

impl MemoryProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the text for the named dataset, replacing any earlier text.
    pub fn insert<S: Into<String>, T: Into<String>>(&mut self, name: S, text: T) {
        self.datasets.insert(name.into(), text.into());
    }

    /// Returns the number of stored datasets.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Returns `true` if no datasets are stored.
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl ResourceProvider for MemoryProvider {
    fn raw_dataset(&self, dataset: &Dataset) -> Result<String, Error> {
        self.datasets.get(&dataset.name).cloned().ok_or_else(|| {
            Error::Resource(format!("Dataset {} is not available", dataset.name))
        })
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
