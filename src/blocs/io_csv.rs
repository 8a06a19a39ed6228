// Primitives for reading and writing CSV files.

use crate::blocs::{io_common::*, normalizer::*, territories::is_known_code, *};

const MATRIX_YEAR_COLUMN: &str = "year";
const MATRIX_RESOLUTION_COLUMN: &str = "resolution_id";

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(|x| x.trim()).filter(|x| !x.is_empty()).map(|x| x.to_string())
}

/// Reads the raw ballot records of a CSV file with a header line.
///
/// Missing cells are read as empty. All the values are trimmed.
pub fn read_raw_ballots(path: &str, columns: &ColumnNames) -> BlocResult<Vec<RawBallot>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header = rdr.headers().context(CsvOpenSnafu { path })?.clone();
    let voter_idx = column_index(header.iter(), &columns.voter, path)?;
    let resolution_idx = column_index(header.iter(), &columns.resolution, path)?;
    let date_idx = column_index(header.iter(), &columns.date, path)?;
    let vote_idx = column_index(header.iter(), &columns.vote, path)?;

    let mut res: Vec<RawBallot> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let rb = RawBallot {
            voter_name: line.get(voter_idx).unwrap_or_default().to_string(),
            resolution_id: line.get(resolution_idx).unwrap_or_default().to_string(),
            meeting_date: match non_empty(line.get(date_idx)) {
                Some(s) => RawDate::Text(s),
                None => RawDate::Missing,
            },
            raw_vote: non_empty(line.get(vote_idx)),
        };
        debug!("read_raw_ballots: lineno: {:?} ballot: {:?}", lineno, rb);
        res.push(rb);
    }
    Ok(res)
}

/// Writes the voting matrix: one header line with the voter codes, then one line per row.
pub fn write_matrix(path: &str, matrix: &VotingMatrix) -> BlocResult<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let mut header: Vec<String> = vec![
        MATRIX_YEAR_COLUMN.to_string(),
        MATRIX_RESOLUTION_COLUMN.to_string(),
    ];
    header.extend(matrix.voters().iter().cloned());
    wtr.write_record(&header).context(CsvWriteSnafu { path })?;
    for (idx, key) in matrix.rows().iter().enumerate() {
        let mut record: Vec<String> = vec![key.year.to_string(), key.resolution_id.clone()];
        record.extend(matrix.row_values(idx).iter().map(|v| v.as_i8().to_string()));
        wtr.write_record(&record).context(CsvWriteSnafu { path })?;
    }
    let bytes = match wtr.into_inner() {
        Ok(b) => b,
        Err(e) => whatever!("Could not flush the voting matrix for {}: {}", path, e),
    };
    write_atomically(path, &bytes)
}

/// Reads back a voting matrix written by `write_matrix`.
///
/// `path` is only used for error messages.
pub fn parse_matrix(contents: &str, path: &str) -> BlocResult<VotingMatrix> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());
    let header = rdr.headers().context(CsvOpenSnafu { path })?.clone();
    let names: Vec<&str> = header.iter().collect();
    ensure!(
        names.len() >= 2
            && names[0] == MATRIX_YEAR_COLUMN
            && names[1] == MATRIX_RESOLUTION_COLUMN,
        MatrixFormatSnafu {
            path,
            lineno: 1_usize,
            message: format!(
                "the header must start with {},{}",
                MATRIX_YEAR_COLUMN, MATRIX_RESOLUTION_COLUMN
            )
        }
    );
    let voters: Vec<String> = names[2..].iter().map(|s| s.to_string()).collect();
    for v in voters.iter() {
        ensure!(
            is_known_code(v),
            MatrixFormatSnafu {
                path,
                lineno: 1_usize,
                message: format!("unknown voter code {:?}", v)
            }
        );
    }

    let mut rows: Vec<RowKey> = Vec::new();
    let mut cells: Vec<VoteValue> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let year_s = line.get(0).unwrap_or_default();
        let year = match year_s.parse::<i32>() {
            Ok(y) => y,
            Err(_) => {
                return MatrixFormatSnafu {
                    path,
                    lineno,
                    message: format!("invalid year {:?}", year_s),
                }
                .fail()
            }
        };
        rows.push(RowKey {
            year,
            resolution_id: line.get(1).unwrap_or_default().to_string(),
        });
        for cell in line.iter().skip(2) {
            let v = cell.parse::<f64>().ok().and_then(VoteValue::from_numeric);
            match v {
                Some(v) => cells.push(v),
                None => {
                    return MatrixFormatSnafu {
                        path,
                        lineno,
                        message: format!("invalid vote value {:?}", cell),
                    }
                    .fail()
                }
            }
        }
    }
    if rows.is_empty() || voters.is_empty() {
        return Err(AnalysisErrors::EmptyMatrix).context(AnalysisSnafu {});
    }
    VotingMatrix::from_parts(rows, voters, cells).context(AnalysisSnafu {})
}
