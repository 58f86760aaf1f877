//! Declarative schema for a Yeast-base database and the routine that creates it.
//!
//! Tables, indexes, and views are described by static descriptors.
//! The SQLite statements are rendered from the descriptors, so the schema itself does not embed dialect-specific DDL.
//!
//! Tables are listed in dependency order in [`TABLES`]: `chr_map` must exist before `background` and `regions`, which reference it.

use crate::Error;

use rusqlite::{Connection, ErrorCode};

use log::{debug, info};

//-----------------------------------------------------------------------------

/// Storage type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// Floating point number.
    Real,
    /// UTF-8 text.
    Text,
}

impl ColumnType {
    /// Returns the SQL name of the type.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// A column in a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub column_type: ColumnType,
    /// Does the column reject missing values?
    pub not_null: bool,
    /// Must the values be distinct?
    pub unique: bool,
    /// Default value as an SQL literal.
    pub default: Option<&'static str>,
}

impl Column {
    /// Returns a nullable column without constraints.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Column { name, column_type, not_null: false, unique: false, default: None }
    }

    /// Returns a column that must not be null.
    pub const fn required(name: &'static str, column_type: ColumnType) -> Self {
        Column { name, column_type, not_null: true, unique: false, default: None }
    }

    /// Returns a nullable column with distinct values.
    pub const fn unique(name: &'static str, column_type: ColumnType) -> Self {
        Column { name, column_type, not_null: false, unique: true, default: None }
    }

    /// Returns the column with the given default value.
    pub const fn with_default(self, default: &'static str) -> Self {
        Column { default: Some(default), ..self }
    }

    fn definition(&self) -> String {
        let mut result = format!("{} {}", quote(self.name), self.column_type.sql_name());
        if self.not_null {
            result.push_str(" NOT NULL");
        }
        if self.unique {
            result.push_str(" UNIQUE");
        }
        if let Some(default) = self.default {
            result.push_str(" DEFAULT ");
            result.push_str(default);
        }
        result
    }
}

/// A foreign key from a column to a column in another table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column.
    pub column: &'static str,
    /// Referenced table.
    pub table: &'static str,
    /// Referenced column.
    pub references: &'static str,
}

/// A table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: &'static str,
    /// Columns in declaration order.
    pub columns: &'static [Column],
    /// Primary key column.
    ///
    /// An `INTEGER` primary key is assigned automatically when the value is missing.
    pub primary_key: &'static str,
    /// Foreign keys.
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    /// Returns the column with the given name, or [`None`] if there is no such column.
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns the names of the columns in declaration order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    /// Returns the `CREATE TABLE` statement for the table.
    pub fn create_sql(&self) -> String {
        let mut lines: Vec<String> = self.columns.iter().map(Column::definition).collect();
        lines.push(format!("PRIMARY KEY ({})", quote(self.primary_key)));
        for fk in self.foreign_keys.iter() {
            lines.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote(fk.column), quote(fk.table), quote(fk.references)
            ));
        }
        format!("CREATE TABLE {} (\n    {}\n)", quote(self.name), lines.join(",\n    "))
    }
}

/// An index over table columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSchema {
    /// Index name.
    pub name: &'static str,
    /// Indexed table.
    pub table: &'static str,
    /// Indexed columns in order.
    pub columns: &'static [&'static str],
}

impl IndexSchema {
    /// Returns the `CREATE INDEX` statement for the index.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|name| quote(name)).collect();
        format!("CREATE INDEX {} ON {} ({})", quote(self.name), quote(self.table), columns.join(", "))
    }
}

/// A read-only view defined by a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSchema {
    /// View name.
    pub name: &'static str,
    /// Output columns in order.
    pub columns: &'static [&'static str],
}

impl ViewSchema {
    /// Returns the `DROP VIEW IF EXISTS` statement for the view.
    pub fn drop_sql(&self) -> String {
        format!("DROP VIEW IF EXISTS \"main\".{}", quote(self.name))
    }

    /// Returns the `CREATE VIEW` statement for the view with the given query.
    ///
    /// The query must produce the columns of the view in order.
    pub fn create_sql(&self, select: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|name| quote(name)).collect();
        format!("CREATE VIEW {} ({}) AS\n{}", quote(self.name), columns.join(", "), select)
    }
}

// Quotes an identifier. `start` and `end` are keywords in some dialects.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

//-----------------------------------------------------------------------------

/// Chromosome names in alternative naming conventions.
pub static CHR_MAP: TableSchema = TableSchema {
    name: "chr_map",
    columns: &[
        Column::unique("refseq", ColumnType::Text),
        Column::unique("igenomes", ColumnType::Text),
        Column::unique("ensembl", ColumnType::Text),
        Column::unique("ucsc", ColumnType::Text),
        Column::unique("mitra", ColumnType::Text),
        Column::required("seqlength", ColumnType::Integer),
        Column::unique("numbered", ColumnType::Text),
    ],
    primary_key: "ucsc",
    foreign_keys: &[],
};

/// Background events (hops).
pub static BACKGROUND: TableSchema = TableSchema {
    name: "background",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("chr", ColumnType::Text),
        Column::new("start", ColumnType::Integer),
        Column::new("end", ColumnType::Integer),
        Column::new("depth", ColumnType::Integer),
        Column::new("strand", ColumnType::Text),
        Column::new("annotation", ColumnType::Text),
        Column::new("sample", ColumnType::Text),
    ],
    primary_key: "id",
    foreign_keys: &[
        ForeignKey { column: "chr", table: "chr_map", references: "ucsc" },
    ],
};

/// Named genomic intervals.
pub static REGIONS: TableSchema = TableSchema {
    name: "regions",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("chr", ColumnType::Text),
        Column::new("start", ColumnType::Integer),
        Column::new("end", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("score", ColumnType::Real),
        Column::new("strand", ColumnType::Text),
        Column::new("sample", ColumnType::Text),
        Column::new("common_name", ColumnType::Text).with_default("'none'"),
    ],
    primary_key: "id",
    foreign_keys: &[
        ForeignKey { column: "chr", table: "chr_map", references: "ucsc" },
    ],
};

/// Index for background lookups by position.
pub static BACKGROUND_INDEX: IndexSchema = IndexSchema {
    name: "background_index",
    table: "background",
    columns: &["chr", "start", "strand", "sample"],
};

/// Index for the region/background join.
pub static REGIONS_INDEX: IndexSchema = IndexSchema {
    name: "regions_index",
    table: "regions",
    columns: &["chr", "start", "end", "strand", "sample"],
};

/// Background hop counts for each region and pair of samples.
pub static REGION_BACKGROUND_AGG: ViewSchema = ViewSchema {
    name: "region_background_agg",
    columns: &[
        "chr", "start", "end",
        "background_hops",
        "regions_sample", "background_sample",
        "region_id",
        "associated_feature_systematic_id", "associated_feature_common_name",
    ],
};

/// Total background hops for each sample.
pub static TOTAL_BG_HOPS: ViewSchema = ViewSchema {
    name: "total_bg_hops",
    columns: &["sample", "hops"],
};

/// Tables in dependency order.
pub static TABLES: &[&TableSchema] = &[&CHR_MAP, &BACKGROUND, &REGIONS];

/// Supporting indexes.
pub static INDEXES: &[&IndexSchema] = &[&BACKGROUND_INDEX, &REGIONS_INDEX];

/// Derived views.
pub static VIEWS: &[&ViewSchema] = &[&REGION_BACKGROUND_AGG, &TOTAL_BG_HOPS];

/// Returns the table schema with the given name.
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    TABLES.iter().find(|table| table.name == name).copied()
}

/// Returns the names of all tables, indexes, and views in the schema.
pub fn object_names() -> Vec<&'static str> {
    let tables = TABLES.iter().map(|x| x.name);
    let indexes = INDEXES.iter().map(|x| x.name);
    let views = VIEWS.iter().map(|x| x.name);
    tables.chain(indexes).chain(views).collect()
}

//-----------------------------------------------------------------------------

/// Returns the names of existing database objects that would conflict with the schema.
///
/// Passes through any database errors.
pub fn conflicting_objects(connection: &Connection) -> Result<Vec<String>, Error> {
    let mut statement = connection.prepare(
        "SELECT type, name FROM sqlite_master WHERE name = ?1 COLLATE NOCASE"
    )?;
    let mut result = Vec::new();
    for name in object_names() {
        let mut rows = statement.query((name,))?;
        while let Some(row) = rows.next()? {
            let object_type: String = row.get(0)?;
            let object_name: String = row.get(1)?;
            result.push(format!("{} {}", object_type, object_name));
        }
    }
    Ok(result)
}

/// Returns the names of tables and views of the schema that are missing from the database.
///
/// Indexes are not required.
/// Passes through any database errors.
pub fn missing_objects(connection: &Connection) -> Result<Vec<&'static str>, Error> {
    let mut statement = connection.prepare(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2"
    )?;
    let tables = TABLES.iter().map(|x| ("table", x.name));
    let views = VIEWS.iter().map(|x| ("view", x.name));
    let mut result = Vec::new();
    for (object_type, name) in tables.chain(views) {
        let count: usize = statement.query_row((object_type, name), |row| row.get(0))?;
        if count == 0 {
            result.push(name);
        }
    }
    Ok(result)
}

/// Creates the tables and indexes in an empty database.
///
/// Views are created separately with [`crate::views::build_views`].
///
/// # Errors
///
/// Returns [`Error::SchemaConflict`] if the database already contains any object with a name used by the schema.
/// Passes through any database errors.
pub fn create_schema(connection: &mut Connection) -> Result<(), Error> {
    info!("Creating tables");
    let conflicts = conflicting_objects(connection)?;
    if !conflicts.is_empty() {
        return Err(Error::SchemaConflict(format!("Database already contains {}", conflicts.join(", "))));
    }

    let transaction = connection.transaction()?;
    for table in TABLES.iter() {
        let sql = table.create_sql();
        debug!("{}", sql);
        transaction.execute(&sql, ()).map_err(|x| schema_error(&transaction, x, table.name))?;
    }
    for index in INDEXES.iter() {
        let sql = index.create_sql();
        debug!("{}", sql);
        transaction.execute(&sql, ()).map_err(|x| schema_error(&transaction, x, index.name))?;
    }
    transaction.commit()?;

    info!("Created {} tables and {} indexes", TABLES.len(), INDEXES.len());
    Ok(())
}

// A generic failure while an object with the same name exists is a conflict; anything else is an engine error.
// SQLite reports existing objects with the generic error code, so the catalog is consulted instead of the message.
fn schema_error(connection: &Connection, error: rusqlite::Error, name: &str) -> Error {
    if error.sqlite_error_code() != Some(ErrorCode::Unknown) {
        return Error::Engine(error);
    }
    let exists = connection.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1 COLLATE NOCASE",
        (name,),
        |row| row.get::<_, usize>(0)
    );
    match exists {
        Ok(count) if count > 0 => Error::SchemaConflict(format!("Object {} already exists", name)),
        _ => Error::Engine(error),
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
