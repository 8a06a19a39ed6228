use crate::blocs::*;

use std::path::PathBuf;

fn temporary_path(path: &str) -> PathBuf {
    let p = Path::new(path);
    let file_name = p
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    p.with_file_name(format!(".{}.tmp", file_name))
}

/// Writes the content next to its destination first, then moves it into place.
///
/// Readers never observe a partially written file.
pub fn write_atomically(path: &str, contents: &[u8]) -> BlocResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingFileSnafu { path })?;
        }
    }
    let tmp = temporary_path(path);
    debug!("write_atomically: {:?} via {:?}", path, tmp);
    fs::write(&tmp, contents).context(WritingFileSnafu { path })?;
    fs::rename(&tmp, path).context(WritingFileSnafu { path })
}

/// The position of a named column in a header row.
pub fn column_index<'a, I>(header: I, name: &str, path: &str) -> BlocResult<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    header
        .into_iter()
        .position(|h| h.trim() == name)
        .context(MissingColumnSnafu { name, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("out.json");
        let ps = p.display().to_string();
        write_atomically(&ps, b"first").unwrap();
        write_atomically(&ps, b"second").unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "second");
        assert!(!temporary_path(&ps).exists());
    }

    #[test]
    fn missing_columns() {
        let header = vec!["member_state", " meeting_date ", "original_vote"];
        assert_eq!(
            column_index(header.iter().copied(), "meeting_date", "x.csv").unwrap(),
            1
        );
        assert!(matches!(
            column_index(header.iter().copied(), "resolution_id", "x.csv"),
            Err(BlocError::MissingColumn { .. })
        ));
    }
}
