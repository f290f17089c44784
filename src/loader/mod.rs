
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Parses one pre-chunked input file into its ordered chunk list.
///
/// `.txt` files contribute one chunk per non-empty trimmed line. `.jsonl`
/// files contribute one chunk per JSON object, taken from the first
/// non-empty of the `text`, `chunk`, and `content` fields; objects with none
/// of those fields are skipped. Blank lines are skipped in both formats, and
/// an empty result is not an error. A `.jsonl` line that fails to parse is an
/// error, since it indicates a corrupt input file rather than padding.
#[inline]
pub fn load_chunks<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("txt") => Ok(parse_txt(&content)),
        Some(ext) if ext.eq_ignore_ascii_case("jsonl") => parse_jsonl(&content)
            .with_context(|| format!("Failed to parse JSONL file: {}", path.display())),
        _ => bail!("Unsupported input file type: {}", path.display()),
    }
}

fn parse_txt(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_jsonl(content: &str) -> Result<Vec<String>> {
    let mut chunks = Vec::new();

    for (line_index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Malformed JSON on line {}", line_index + 1))?;

        let Value::Object(object) = value else {
            bail!("Expected a JSON object on line {}", line_index + 1);
        };

        // Field priority: text, then chunk, then content. Empty and
        // non-string values fall through to the next candidate.
        let chunk = ["text", "chunk", "content"].iter().find_map(|key| {
            object
                .get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        });

        if let Some(chunk) = chunk {
            chunks.push(chunk.to_string());
        }
    }

    Ok(chunks)
}
