//! Tabular datasets parsed from CSV text.

use crate::Error;

//-----------------------------------------------------------------------------

/// Field values that denote a missing value, in addition to the empty field.
pub const MISSING_VALUES: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Returns `true` if the field value denotes a missing value.
pub fn is_missing(value: &str) -> bool {
    value.is_empty() || MISSING_VALUES.contains(&value)
}

//-----------------------------------------------------------------------------

/// A set of rows with named columns.
///
/// Values are kept as text until they are loaded into a table with declared column types.
/// Missing values (empty fields and the tokens in [`MISSING_VALUES`]) are stored as [`None`].
///
/// # Examples
///
/// ```
/// use yeast_base::RowSet;
///
/// let text = "chr,start,end,sample\nchrI,100,100,bg1\nchrII,,7,bg1\n";
/// let rows = RowSet::from_csv(text).unwrap();
/// assert_eq!(rows.columns(), &["chr", "start", "end", "sample"]);
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows.get(0, "start"), Some("100"));
/// assert_eq!(rows.get(1, "start"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    /// Creates an empty row-set with the given columns.
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(columns: I) -> Self {
        RowSet {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Parses a row-set from CSV text.
    ///
    /// The first record is the header.
    /// Header names are trimmed, but values are kept verbatim.
    /// Missing values become [`None`]; see [`is_missing`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is not valid CSV, if the header is missing, or if a record has the wrong number of fields.
    pub fn from_csv(text: &str) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(text.as_bytes());

        let header = reader.headers().map_err(|x| Error::Parse(x.to_string()))?;
        if header.is_empty() {
            return Err(Error::Parse(String::from("Missing header line")));
        }
        let mut result = RowSet::new(header.iter());

        for (line, record) in reader.records().enumerate() {
            // The csv crate rejects records with an unexpected number of fields.
            let record = record.map_err(|x| Error::Parse(format!("Record {}: {}", line + 1, x)))?;
            let row = record.iter().map(|value| {
                if is_missing(value) { None } else { Some(value.to_string()) }
            }).collect();
            result.rows.push(row);
        }

        Ok(result)
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the number of values does not match the number of columns.
    pub fn push(&mut self, row: Vec<Option<String>>) -> Result<(), Error> {
        if row.len() != self.columns.len() {
            return Err(Error::Parse(format!("Expected {} values, got {}", self.columns.len(), row.len())));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the index of the column with the given name, or [`None`] if there is no such column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|x| x == name)
    }

    /// Returns the number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows in their original order.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> + '_ {
        self.rows.iter().map(|x| x.as_slice())
    }

    /// Returns the value in the given row and column, or [`None`] if the value is missing.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
