// Reads the raw ballot records from an Excel workbook.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::blocs::{io_common::column_index, normalizer::*, *};

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> BlocResult<Range<DataType>> {
    debug!(
        "read_raw_ballots: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    match worksheet_name_o {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path }),
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path }),
    }
}

/// The text of a cell, the way a spreadsheet would display it.
fn cell_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Some(format!("{:.1}", f)),
        DataType::Float(f) => Some(f.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        DataType::DateTime(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_date(cell: Option<&DataType>) -> RawDate {
    match cell {
        Some(DataType::DateTime(f)) => RawDate::ExcelSerial(*f),
        Some(c) => match cell_text(c) {
            Some(s) => RawDate::Text(s),
            None => RawDate::Missing,
        },
        None => RawDate::Missing,
    }
}

/// Reads the raw ballots of a worksheet. The first row holds the column names.
///
/// Without a worksheet name, the first worksheet is used.
pub fn read_raw_ballots(
    path: &str,
    worksheet_name_o: Option<&str>,
    columns: &ColumnNames,
) -> BlocResult<Vec<RawBallot>> {
    let wrange = get_range(path, worksheet_name_o)?;
    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|c| cell_text(c).unwrap_or_default())
        .collect();
    debug!("read_raw_ballots: header: {:?}", header);
    let names = || header.iter().map(|s| s.as_str());
    let voter_idx = column_index(names(), &columns.voter, path)?;
    let resolution_idx = column_index(names(), &columns.resolution, path)?;
    let date_idx = column_index(names(), &columns.date, path)?;
    let vote_idx = column_index(names(), &columns.vote, path)?;

    let res: Vec<RawBallot> = iter
        .map(|row| RawBallot {
            voter_name: row.get(voter_idx).and_then(cell_text).unwrap_or_default(),
            resolution_id: row
                .get(resolution_idx)
                .and_then(cell_text)
                .unwrap_or_default(),
            meeting_date: cell_date(row.get(date_idx)),
            raw_vote: row.get(vote_idx).and_then(cell_text),
        })
        .collect();
    debug!("read_raw_ballots: {} records in {:?}", res.len(), path);
    Ok(res)
}
