use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// Load an ordered class-label table, one label per line. Line order defines
/// the class index mapping, so blank lines are skipped but never reordered.
pub fn load_class_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    if labels.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no labels found in {:?}", filepath),
        ));
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_labels_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "airplane\nautomobile\n\n  bird  \n").unwrap();

        let labels = load_class_labels(file.path()).unwrap();
        assert_eq!(labels, vec!["airplane", "automobile", "bird"]);
    }

    #[test]
    fn rejects_empty_label_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_class_labels(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_class_labels(Path::new("./does_not_exist.txt")).is_err());
    }
}
