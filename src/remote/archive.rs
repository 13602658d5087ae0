use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::{ProcessingError, Result};

/// Extract the observation CSV from the downloaded ZIP archive.
///
/// The archive holds exactly one `.csv` member plus a note file; the first
/// member whose name ends in `.csv` is taken. Returns the member name and
/// its decoded contents.
pub fn extract_csv(bytes: &[u8]) -> Result<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let csv_index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .map(|f| f.name().to_lowercase().ends_with(".csv"))
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            ProcessingError::InvalidFormat("No CSV member in rainfall archive".to_string())
        })?;

    let mut file = archive.by_index(csv_index)?;
    let name = file.name().to_string();
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    Ok((name, contents))
}

/// Test helper: assemble an in-memory ZIP from named members.
#[cfg(test)]
pub fn build_archive(members: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
