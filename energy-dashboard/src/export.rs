use std::io::Write;

use energy_client::domain::UsageRecord;

use crate::views::sorted_newest_first;

pub const HISTORY_CSV_HEADER: [&str; 4] = ["id", "date", "unitsConsumed", "billAmount"];

/// Write the history table as CSV, newest first. The header row is written
/// even when there are no records.
pub fn write_history_csv<W: Write>(records: &[UsageRecord], writer: W) -> anyhow::Result<usize> {
    let rows = sorted_newest_first(records);
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HISTORY_CSV_HEADER)?;
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    metrics::counter!("history_rows_exported_total").increment(rows.len() as u64);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_sorted_rows() {
        let records = vec![
            UsageRecord {
                id: "1".to_string(),
                date: "2024-01-01".to_string(),
                units_consumed: 100.0,
                bill_amount: 400.0,
            },
            UsageRecord {
                id: "2".to_string(),
                date: "2024-02-01".to_string(),
                units_consumed: 140.5,
                bill_amount: 562.0,
            },
        ];

        let mut out = Vec::new();
        let written = write_history_csv(&records, &mut out).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "id,date,unitsConsumed,billAmount");
        assert_eq!(lines[1], "2,2024-02-01,140.5,562.0");
        assert_eq!(lines[2], "1,2024-01-01,100.0,400.0");
    }

    #[test]
    fn empty_history_still_writes_header() {
        let mut out = Vec::new();
        assert_eq!(write_history_csv(&[], &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "id,date,unitsConsumed,billAmount\n");
    }
}
