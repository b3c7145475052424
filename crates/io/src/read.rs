// Source file reading: encoding fallback + delimiter sniffing

use std::io::Read;
use std::path::Path;

/// Read file and convert to UTF-8 if needed (handles Windows-1252,
/// Latin-1, etc. — common for Excel-exported hospital CSVs).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across
/// the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per
/// line. The delimiter that produces the most consistent field count
/// (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        // Higher field count breaks ties — more columns = more likely real delimiter
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn utf8_passes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("utf8.csv");
        fs::write(&path, "patient,area\nP1,Cirugía\n").unwrap();
        let content = read_file_as_utf8(&path).unwrap();
        assert!(content.contains("Cirugía"));
    }

    #[test]
    fn windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // "Cirugía" with í as 0xED — invalid UTF-8, valid Windows-1252
        let bytes: &[u8] = b"patient,area\nP1,Cirug\xEDa\n";
        fs::write(&path, bytes).unwrap();
        let content = read_file_as_utf8(&path).unwrap();
        assert!(content.contains("Cirugía"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(read_file_as_utf8(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn sniff_comma() {
        let content = "patient,date,amount\nP1,2024-01-05,10.00\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn sniff_semicolon() {
        let content = "patient;date;amount\nP1;2024-01-05;10,00\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_tab() {
        let content = "patient\tdate\tamount\nP1\t2024-01-05\t10.00\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn sniff_pipe() {
        let content = "patient|date|amount\nP1|2024-01-05|10.00\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn sniff_semicolon_with_quoted_commas() {
        let content =
            "patient;description;amount\nP1;\"Suture, 3-0\";10.00\nP2;\"Gauze, sterile\";2.50\n";
        assert_eq!(sniff_delimiter(content), b';');
    }
}
