use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Class names indexed by model class id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassVocabulary {
    names: Vec<String>,
}

impl ClassVocabulary {
    /// Load a newline-delimited class list (e.g. `coco.names`).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class names from {}", path.display()))?;
        let vocabulary = Self::parse(&raw);
        if vocabulary.is_empty() {
            return Err(anyhow!("class names file {} is empty", path.display()));
        }
        log::info!(
            "loaded {} class names from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Blank lines are skipped and surrounding whitespace trimmed.
    pub fn parse(raw: &str) -> Self {
        Self {
            names: raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.names.iter().any(|name| name == label)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ClassVocabulary {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_skips_blank_lines_and_trims() {
        let vocabulary = ClassVocabulary::parse("person\r\nbicycle\n\n  car  \n");
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.get(0), Some("person"));
        assert_eq!(vocabulary.get(2), Some("car"));
        assert_eq!(vocabulary.get(3), None);
        assert!(vocabulary.contains("bicycle"));
        assert!(!vocabulary.contains("truck"));
    }

    #[test]
    fn load_reads_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "person")?;
        writeln!(file, "car")?;
        let vocabulary = ClassVocabulary::load(file.path())?;
        assert_eq!(vocabulary.get(1), Some("car"));
        Ok(())
    }

    #[test]
    fn load_rejects_missing_and_empty_files() -> Result<()> {
        assert!(ClassVocabulary::load(Path::new("definitely/missing.names")).is_err());
        let file = tempfile::NamedTempFile::new()?;
        assert!(ClassVocabulary::load(file.path()).is_err());
        Ok(())
    }
}
