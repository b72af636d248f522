use std::io::Write;

use crate::error::ReconError;
use crate::model::{Dimension, ReconciliationRow};

/// Write rows as CSV: one column per grouped dimension, then
/// `research_cost,commission,delta`.
pub fn write_rows_csv<W: Write>(
    writer: W,
    group_by: &[Dimension],
    rows: &[ReconciliationRow],
) -> Result<(), ReconError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = group_by.iter().map(|d| d.as_str()).collect();
    header.extend(["research_cost", "commission", "delta"]);
    wtr.write_record(&header)?;

    for row in rows {
        let mut record: Vec<String> = row.key.parts().to_vec();
        record.push(row.research_cost.to_string());
        record.push(row.commission.to_string());
        record.push(row.delta.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
