//! CSV records for replaying insertions into a sorted batch.
//!
//! One row per insertion: `key,value`. Rows are applied in file order, so a
//! repeated key keeps the value from its last row.

use std::io;

use serde::{Deserialize, Serialize};

use crate::batch::SortedBatch;
use crate::error::MapError;
use crate::skiplist::Insertion;

/// One key/value insertion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Sort key (e.g. distance to the viewer)
    pub key: f64,
    /// Payload (e.g. object id)
    pub value: u64,
}

/// Read every record from a CSV source with a `key,value` header.
pub fn read_records<R: io::Read>(source: R) -> Result<Vec<Record>, csv::Error> {
    let mut reader = csv::Reader::from_reader(source);
    reader.deserialize().collect()
}

/// Write records as CSV with a `key,value` header.
pub fn write_records<W, I>(sink: W, records: I) -> Result<(), csv::Error>
where
    W: io::Write,
    I: IntoIterator<Item = Record>,
{
    let mut writer = csv::Writer::from_writer(sink);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Insert every record into `batch`, stopping at the first failure.
///
/// Returns the number of records that created a new entry.
pub fn replay_into(batch: &mut SortedBatch<f64, u64>, records: &[Record]) -> Result<usize, MapError> {
    let mut inserted = 0;
    for record in records {
        if let Insertion::Inserted { .. } = batch.submit(record.key, record.value)? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// Snapshot of a batch in map order as records.
pub fn batch_records(batch: &SortedBatch<f64, u64>) -> Vec<Record> {
    batch
        .iter()
        .map(|(key, value)| Record { key, value })
        .collect()
}
