//! Markdown / MDX structure: front matter and `## ` sections.

use crate::types::Section;

/// Title of the text that precedes the first heading.
pub const INTRODUCTION: &str = "Introduction";

/// Title used for a heading line with no text after the marker.
pub const UNTITLED: &str = "Untitled Section";

const FRONT_MATTER_MARKER: &str = "---";
const HEADING_MARKER: &str = "## ";

/// Remove a leading front-matter block delimited by two `---` lines.
///
/// Text without an opening marker on its first line, or without a closing
/// marker, is returned unchanged.
pub fn strip_front_matter(text: &str) -> &str {
    let text_no_bom = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text_no_bom.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == FRONT_MATTER_MARKER => {}
        _ => return text,
    }

    let mut offset = 0;
    let mut consumed_opening = false;
    for line in text_no_bom.split_inclusive('\n') {
        offset += line.len();
        if !consumed_opening {
            consumed_opening = true;
            continue;
        }
        if line.trim_end() == FRONT_MATTER_MARKER {
            return &text_no_bom[offset..];
        }
    }

    text
}

/// Split a document body into sections on line-leading `## ` headings.
///
/// The first section is always [`INTRODUCTION`] and holds whatever precedes
/// the first heading (possibly nothing). Lines inside fenced code blocks are
/// never headings.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = INTRODUCTION.to_string();
    let mut body: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in text.split('\n') {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            body.push(line);
            continue;
        }

        if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        } else if let Some(heading) = line.strip_prefix(HEADING_MARKER) {
            sections.push(Section {
                title: std::mem::take(&mut title),
                body: body.join("\n"),
            });
            body.clear();

            let heading = heading.trim();
            title = if heading.is_empty() {
                UNTITLED.to_string()
            } else {
                heading.to_string()
            };
            continue;
        }

        body.push(line);
    }

    sections.push(Section {
        title,
        body: body.join("\n"),
    });

    sections
}
