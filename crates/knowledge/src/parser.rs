//! Source file parsing and text extraction.

use cityq_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a source file and extract clean text.
///
/// Files that are not valid UTF-8 or look binary are rejected with
/// [`AppError::InvalidInput`] so the caller can report and skip them.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    let bytes = fs::read(path)?;
    let raw = String::from_utf8(bytes)
        .map_err(|_| AppError::InvalidInput(format!("{:?} is not valid UTF-8 text", path)))?;

    if !is_likely_text(&raw) {
        return Err(AppError::InvalidInput(format!("{:?} looks like a binary file", path)));
    }

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::PlainText | ContentType::Unknown => raw.trim().to_string(),
    };

    Ok(cleaned)
}

/// Strip markdown headers, rules, fences and emphasis markers.
pub fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(&trimmed.replace("**", "").replace("__", ""));
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Strip HTML tags, dropping script and style bodies.
pub fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut skip_body = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;
            let head: String = text[i..].chars().take(8).collect::<String>().to_ascii_lowercase();
            if head.starts_with("<script") || head.starts_with("<style") {
                skip_body = true;
            } else if head.starts_with("</script") || head.starts_with("</style") {
                skip_body = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !skip_body {
            result.push(ch);
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("chicago.md")), ContentType::Markdown);
        assert_eq!(ContentType::from_path(Path::new("miami.html")), ContentType::Html);
        assert_eq!(ContentType::from_path(Path::new("notes.txt")), ContentType::PlainText);
        assert_eq!(ContentType::from_path(Path::new("blob.bin")), ContentType::Unknown);
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Chicago\n\nThe **Great** Chicago Fire\n\n```text\nignored fence\n```\n\n---\nMore text";
        let output = clean_markdown(input);
        assert!(output.starts_with("Chicago"));
        assert!(output.contains("The Great Chicago Fire"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><head><style>p { color: red; }</style></head><body><p>Hello <b>Houston</b></p></body></html>";
        assert_eq!(clean_html(input), "Hello Houston");
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.txt");
        std::fs::write(&path, [0x66, 0x6f, 0xff, 0xfe, 0x6f]).unwrap();

        let err = parse_file(&path).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_rejects_binary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.dat");
        std::fs::write(&path, b"abc\0def").unwrap();
        assert!(parse_file(&path).is_err());
    }

    #[test]
    fn test_parse_markdown_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seattle.md");
        std::fs::write(&path, "# Seattle\n\nA seaport city on Puget Sound.").unwrap();
        assert_eq!(parse_file(&path).unwrap(), "Seattle\nA seaport city on Puget Sound.");
    }
}
