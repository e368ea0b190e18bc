use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{ChatError, Result};
use crate::model::FaqEntry;

/// Writes one `{question, answer}` JSON object per line.
pub fn save_faqs_jsonl(path: &Path, entries: &[FaqEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    debug!(path = %path.display(), count = entries.len(), "saved faqs");
    Ok(())
}

pub fn load_faqs_jsonl(path: &Path) -> Result<Vec<FaqEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str::<FaqEntry>(&line)?;
        entry.validate().map_err(|_| {
            ChatError::InvalidInput(format!(
                "{} line {}: blank question or answer",
                path.display(),
                n + 1
            ))
        })?;
        entries.push(entry);
    }

    debug!(path = %path.display(), count = entries.len(), "loaded faqs");
    Ok(entries)
}
