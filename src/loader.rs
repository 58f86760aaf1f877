//! Appending datasets to the tables.
//!
//! Loading is append-only.
//! Appending the same rows twice duplicates them, or fails if the table has a uniqueness constraint that the duplicates violate.
//! There is no upsert and no deduplication.
//!
//! Each row-set is inserted in its own transaction.
//! If a row-set fails, none of its rows remain in the table, but row-sets loaded before it do.

use crate::{Error, RowSet};
use crate::resources::{self, Dataset, DatasetKind, ResourceProvider};
use crate::schema::{ColumnType, TableSchema};

use rusqlite::Connection;
use rusqlite::types::Value;

use log::info;

//-----------------------------------------------------------------------------

/// Number of rows loaded into each table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows appended to `chr_map`.
    pub chr_map: usize,
    /// Rows appended to `background`.
    pub background: usize,
    /// Rows appended to `regions`.
    pub regions: usize,
}

impl LoadStats {
    /// Records that `rows` rows of the given kind were loaded.
    pub fn update(&mut self, kind: DatasetKind, rows: usize) {
        match kind {
            DatasetKind::ChrMap => self.chr_map += rows,
            DatasetKind::Background => self.background += rows,
            DatasetKind::Regions => self.regions += rows,
        }
    }

    /// Returns the total number of loaded rows.
    pub fn total(&self) -> usize {
        self.chr_map + self.background + self.regions
    }
}

//-----------------------------------------------------------------------------

// Converts a text value to the declared type of the column.
fn convert_value(value: Option<&str>, column_type: ColumnType) -> Result<Value, String> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };
    match column_type {
        ColumnType::Integer => {
            let value = value.trim();
            if let Ok(integer) = value.parse::<i64>() {
                return Ok(Value::Integer(integer));
            }
            // Integral values written as floats, such as "100.0".
            match value.parse::<f64>() {
                Ok(real) if real.is_finite() && real.fract() == 0.0 && real.abs() < i64::MAX as f64 => {
                    Ok(Value::Integer(real as i64))
                },
                _ => Err(format!("Invalid integer value '{}'", value)),
            }
        },
        ColumnType::Real => {
            value.trim().parse::<f64>().map(Value::Real).map_err(|_| format!("Invalid numeric value '{}'", value))
        },
        ColumnType::Text => Ok(Value::Text(value.to_string())),
    }
}

/// Appends all rows of the row-set to the table and returns the number of inserted rows.
///
/// The columns of the row-set must be columns of the table, but they may be a subset in any order.
/// Missing columns get their default values, and a missing `INTEGER` primary key is assigned automatically.
/// Any other primary key must be present in every row.
/// Values are converted to the declared column types, and missing values are stored as `NULL`.
/// Rows are inserted in their original order.
///
/// # Errors
///
/// Returns [`Error::Load`] if a column of the row-set is not in the table, if a primary key value is missing, if a value cannot be converted, or if a row violates a constraint.
/// Passes through any other database errors.
pub fn append_rows(connection: &mut Connection, table: &TableSchema, rows: &RowSet) -> Result<usize, Error> {
    if rows.columns().is_empty() {
        return Err(Error::load(table.name, "The row-set has no columns"));
    }
    let mut column_types: Vec<ColumnType> = Vec::with_capacity(rows.columns().len());
    for (i, name) in rows.columns().iter().enumerate() {
        let column = table.column(name).ok_or_else(|| Error::load(
            table.name, format!("Column {} is not in the table (expected some of: {})", name, table.column_names().join(", "))
        ))?;
        if rows.columns()[..i].contains(name) {
            return Err(Error::load(table.name, format!("Duplicate column {}", name)));
        }
        column_types.push(column.column_type);
    }

    // SQLite accepts NULL in a primary key unless it is an INTEGER rowid alias.
    let required_key = table.column(table.primary_key)
        .filter(|column| column.column_type != ColumnType::Integer)
        .map(|column| column.name);
    let key_index = match required_key {
        Some(name) => Some(rows.column_index(name).ok_or_else(|| {
            Error::load(table.name, format!("Missing primary key column {}", name))
        })?),
        None => None,
    };

    let columns: Vec<String> = rows.columns().iter().map(|x| format!("\"{}\"", x)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO \"{}\"({}) VALUES ({})",
        table.name, columns.join(", "), placeholders.join(", ")
    );

    let mut inserted = 0;
    let transaction = connection.transaction()?;
    {
        let mut insert = transaction.prepare(&sql)?;
        for (i, row) in rows.rows().enumerate() {
            // Row numbers in messages are 1-based, not counting the header.
            if let Some(index) = key_index {
                if row[index].is_none() {
                    return Err(Error::load(
                        table.name, format!("Row {}: Missing primary key {}", i + 1, table.primary_key)
                    ));
                }
            }
            let mut values: Vec<Value> = Vec::with_capacity(row.len());
            for (j, value) in row.iter().enumerate() {
                let value = convert_value(value.as_deref(), column_types[j]).map_err(|x| {
                    Error::load(table.name, format!("Row {}, column {}: {}", i + 1, rows.columns()[j], x))
                })?;
                values.push(value);
            }
            insert.execute(rusqlite::params_from_iter(values)).map_err(|x| Error::from_insert(table.name, i + 1, x))?;
            inserted += 1;
        }
    }
    transaction.commit()?;

    Ok(inserted)
}

/// Parses the datasets supplied by the provider and appends them to their tables in the given order.
///
/// Chromosome maps must come before background and regions datasets.
/// Returns the number of rows loaded into each table.
///
/// # Errors
///
/// Returns [`Error::Resource`] if the datasets are not in dependency order or the provider cannot supply one of them.
/// Returns [`Error::Parse`] if a dataset is not valid CSV.
/// Passes through errors from [`append_rows`].
pub fn load_datasets<R: ResourceProvider + ?Sized>(
    connection: &mut Connection, provider: &R, datasets: &[Dataset]
) -> Result<LoadStats, Error> {
    resources::check_load_order(datasets)?;

    let mut stats = LoadStats::default();
    for dataset in datasets.iter() {
        let table = dataset.kind.table();
        info!("Loading dataset {} into {}", dataset.name, table.name);
        let text = provider.raw_dataset(dataset)?;
        let rows = RowSet::from_csv(&text).map_err(|x| match x {
            Error::Parse(message) => Error::Parse(format!("Dataset {}: {}", dataset.name, message)),
            other => other,
        })?;
        let inserted = append_rows(connection, table, &rows)?;
        info!("Inserted {} rows into {} from {}", inserted, table.name, dataset.name);
        stats.update(dataset.kind, inserted);
    }

    Ok(stats)
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
