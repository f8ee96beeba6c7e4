//! Empty-paragraph sweep over the rendered `word/document.xml`.
//!
//! Container expansion leaves hollow paragraphs where conditionals
//! evaluated false. A paragraph is dropped only when it is provably empty:
//! no text residue after stripping tags and whitespace entities, and none
//! of the content markers below. Paragraphs inside tables are never
//! touched, and the rest of the document is copied through byte-for-byte.

use crate::error::ReportError;

/// Any of these inside a paragraph means it must survive the sweep.
const CONTENT_MARKERS: [&str; 12] = [
    "<w:drawing",
    "<w:pict",
    "<w:object",
    "<a:blip",
    "<a:graphic",
    "<wp:docPr",
    "r:embed",
    "r:link",
    "<w:hyperlink",
    "<w:bookmarkStart",
    "<w:ins",
    "<m:oMath",
];

/// Tracked deletions are marked `<w:del ` / `<w:delText`; matching the bare
/// prefix would also hit `<w:delText` nested oddities, so it gets its own
/// check to avoid matching unrelated names.
const TRACKED_DELETE: &str = "<w:del";

pub fn sweep_empty_paragraphs(xml: &str) -> Result<String, ReportError> {
    let swept = remove_empty_paragraphs(xml)?;
    // a malformed result must never reach the package; the caller keeps the
    // un-swept buffer instead
    if !well_formed(&swept) {
        return Err(ReportError::Render("sweep produced malformed xml".into()));
    }
    Ok(swept)
}

fn remove_empty_paragraphs(xml: &str) -> Result<String, ReportError> {
    let mut out = String::with_capacity(xml.len());
    let mut pos = 0usize;
    let mut table_depth = 0isize;

    while let Some(found) = find_paragraph_start(xml, pos) {
        let between = &xml[pos..found];
        table_depth += count_occurrences(between, "<w:tbl ") as isize
            + count_occurrences(between, "<w:tbl>") as isize
            - count_occurrences(between, "</w:tbl>") as isize;
        out.push_str(between);

        let end = paragraph_end(xml, found)
            .ok_or_else(|| ReportError::Render("unterminated <w:p> element".into()))?;
        let paragraph = &xml[found..end];

        let keep = table_depth > 0 || !is_provably_empty(paragraph);
        if keep {
            out.push_str(paragraph);
        }
        // tables can open/close inside the paragraph span (text boxes)
        table_depth += count_occurrences(paragraph, "<w:tbl ") as isize
            + count_occurrences(paragraph, "<w:tbl>") as isize
            - count_occurrences(paragraph, "</w:tbl>") as isize;
        pos = end;
    }
    out.push_str(&xml[pos..]);
    Ok(out)
}

/// Next `<w:p>` / `<w:p ` / `<w:p/>` start at or after `from`. Rejects
/// `<w:pPr>`, `<w:proofErr>` and other same-prefix names.
fn find_paragraph_start(xml: &str, from: usize) -> Option<usize> {
    let mut search = from;
    loop {
        let rel = xml[search..].find("<w:p")?;
        let abs = search + rel;
        match xml.as_bytes().get(abs + 4) {
            Some(b'>') | Some(b' ') | Some(b'/') => return Some(abs),
            _ => search = abs + 4,
        }
    }
}

/// Byte offset just past the paragraph that starts at `start`, honouring
/// nested paragraphs (text boxes) and self-closing forms.
fn paragraph_end(xml: &str, start: usize) -> Option<usize> {
    // self-closing <w:p/> or <w:p ... />
    let open_end = start + xml[start..].find('>')?;
    if xml.as_bytes()[open_end - 1] == b'/' {
        return Some(open_end + 1);
    }

    let mut depth = 1usize;
    let mut pos = open_end + 1;
    while depth > 0 {
        let rel_close = xml[pos..].find("</w:p>")?;
        let abs_close = pos + rel_close;
        // count nested openings between pos and the close
        let mut scan = pos;
        while let Some(nested) = find_paragraph_start(xml, scan) {
            if nested >= abs_close {
                break;
            }
            let nested_open_end = nested + xml[nested..].find('>')?;
            if xml.as_bytes()[nested_open_end - 1] != b'/' {
                depth += 1;
            }
            scan = nested_open_end;
        }
        depth -= 1;
        pos = abs_close + "</w:p>".len();
        if depth == 0 {
            return Some(pos);
        }
    }
    Some(pos)
}

fn is_provably_empty(paragraph: &str) -> bool {
    if CONTENT_MARKERS.iter().any(|m| paragraph.contains(m)) {
        return false;
    }
    if paragraph.contains(TRACKED_DELETE) || paragraph.contains("<w:tbl") {
        return false;
    }

    let mut residue = String::new();
    let mut in_tag = false;
    for ch in paragraph.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => residue.push(ch),
            _ => {}
        }
    }
    for entity in ["&#160;", "&#xA0;", "&#32;", "&#x20;"] {
        residue = residue.replace(entity, " ");
    }
    residue
        .chars()
        .all(|c| c.is_whitespace() || c == '\u{a0}')
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

fn well_formed(xml: &str) -> bool {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Eof) => return true,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "swept document failed the well-formedness check");
                return false;
            }
        }
    }
}
