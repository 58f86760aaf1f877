//! Derived views over the background and regions tables.
//!
//! # Region/background aggregation
//!
//! View `region_background_agg` counts background events (hops) inside each region.
//! Every region `r` is paired with every background row `x` on the same chromosome.
//! The pair is a hit if `r.start <= x.start <= r.end`; the end of the background event does not matter.
//! Hits are grouped by (regions sample, background sample, chromosome, region start, region end, region id), and the number of hits in a group is `background_hops`.
//! Rows are ordered by (regions sample, background sample, chromosome, region start), with region id as the final tiebreaker.
//!
//! With [`RegionJoin::MatchedOnly`], a region without hits in a background sample produces no row for that sample.
//! A region without any hits does not appear at all.
//! [`RegionJoin::KeepUnmatched`] instead reports such regions once with zero hops and a `NULL` background sample.
//!
//! # Background totals
//!
//! View `total_bg_hops` lists the number of background rows for each sample, ordered by sample.
//!
//! Both views are always dropped and recreated, so they reflect the current contents of the tables.

use crate::Error;
use crate::schema::{REGION_BACKGROUND_AGG, TOTAL_BG_HOPS};

use rusqlite::{Connection, Row};

use log::{debug, info};


//-----------------------------------------------------------------------------

/// How regions without background hits are reported in `region_background_agg`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegionJoin {
    /// Only regions with at least one hit in a background sample appear, once for each such sample.
    #[default]
    MatchedOnly,
    /// Regions without any hits also appear once, with zero hops and no background sample.
    ///
    /// Regions with a missing chromosome, start, or end are still excluded, as they cannot contain any hits.
    KeepUnmatched,
}

impl RegionJoin {
    /// Returns the query defining `region_background_agg` for this join.
    pub fn aggregate_select(&self) -> String {
        let (join, hops, filter) = match self {
            RegionJoin::MatchedOnly => ("INNER JOIN", "COUNT(*)", ""),
            RegionJoin::KeepUnmatched => (
                "LEFT JOIN", "COUNT(x.\"id\")",
                "\nWHERE r.\"chr\" IS NOT NULL AND r.\"start\" IS NOT NULL AND r.\"end\" IS NOT NULL"
            ),
        };
        format!(
            "SELECT r.\"chr\", r.\"start\", r.\"end\",
    {hops},
    r.\"sample\", x.\"sample\",
    r.\"id\", r.\"name\", r.\"common_name\"
FROM \"regions\" AS r
{join} \"background\" AS x
    ON x.\"chr\" = r.\"chr\" AND x.\"start\" BETWEEN r.\"start\" AND r.\"end\"{filter}
GROUP BY r.\"sample\", x.\"sample\", r.\"chr\", r.\"start\", r.\"end\", r.\"id\"
ORDER BY r.\"sample\", x.\"sample\", r.\"chr\", r.\"start\", r.\"id\""
        )
    }
}

/// Query defining `total_bg_hops`.
pub const TOTALS_SELECT: &str = "SELECT \"sample\", COUNT(*)
FROM \"background\"
GROUP BY \"sample\"
ORDER BY \"sample\"";

/// Drops and recreates both views.
///
/// The views are replaced in a single transaction.
///
/// # Errors
///
/// Passes through any database errors.
pub fn build_views(connection: &mut Connection, join: RegionJoin) -> Result<(), Error> {
    info!("Creating views ({:?})", join);
    let statements = [
        REGION_BACKGROUND_AGG.drop_sql(),
        REGION_BACKGROUND_AGG.create_sql(&join.aggregate_select()),
        TOTAL_BG_HOPS.drop_sql(),
        TOTAL_BG_HOPS.create_sql(TOTALS_SELECT),
    ];

    let transaction = connection.transaction()?;
    for sql in statements.iter() {
        debug!("{}", sql);
        transaction.execute(sql, ())?;
    }
    transaction.commit()?;

    Ok(())
}

//-----------------------------------------------------------------------------

/// A row in view `region_background_agg`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionBackgroundAgg {
    /// Chromosome of the region.
    pub chr: String,
    /// Start of the region.
    pub start: i64,
    /// End of the region (inclusive).
    pub end: i64,
    /// Number of background events starting inside the region.
    pub background_hops: usize,
    /// Sample label of the region.
    pub regions_sample: Option<String>,
    /// Sample label of the background events.
    ///
    /// This is [`None`] for regions without hits with [`RegionJoin::KeepUnmatched`].
    pub background_sample: Option<String>,
    /// Identifier of the region in table `regions`.
    pub region_id: i64,
    /// Systematic name of the feature associated with the region.
    pub associated_feature_systematic_id: Option<String>,
    /// Common name of the feature associated with the region.
    pub associated_feature_common_name: Option<String>,
}

impl RegionBackgroundAgg {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RegionBackgroundAgg {
            chr: row.get(0)?,
            start: row.get(1)?,
            end: row.get(2)?,
            background_hops: row.get(3)?,
            regions_sample: row.get(4)?,
            background_sample: row.get(5)?,
            region_id: row.get(6)?,
            associated_feature_systematic_id: row.get(7)?,
            associated_feature_common_name: row.get(8)?,
        })
    }
}

/// A row in view `total_bg_hops`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundTotal {
    /// Sample label.
    pub sample: Option<String>,
    /// Number of background events with the label.
    pub hops: usize,
}

/// Returns the rows of view `region_background_agg` in view order.
///
/// Passes through any database errors.
pub fn region_background_agg(connection: &Connection) -> Result<Vec<RegionBackgroundAgg>, Error> {
    let mut statement = connection.prepare(
        "SELECT * FROM \"region_background_agg\"
        ORDER BY \"regions_sample\", \"background_sample\", \"chr\", \"start\", \"region_id\""
    )?;
    let mut result = Vec::new();
    let mut rows = statement.query(())?;
    while let Some(row) = rows.next()? {
        result.push(RegionBackgroundAgg::from_row(row)?);
    }
    Ok(result)
}

/// Returns the rows of view `total_bg_hops` ordered by sample.
///
/// Passes through any database errors.
pub fn total_bg_hops(connection: &Connection) -> Result<Vec<BackgroundTotal>, Error> {
    let mut statement = connection.prepare(
        "SELECT \"sample\", \"hops\" FROM \"total_bg_hops\" ORDER BY \"sample\""
    )?;
    let mut result = Vec::new();
    let mut rows = statement.query(())?;
    while let Some(row) = rows.next()? {
        result.push(BackgroundTotal { sample: row.get(0)?, hops: row.get(1)? });
    }
    Ok(result)
}

//-----------------------------------------------------------------------------
