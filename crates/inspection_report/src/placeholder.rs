//! The placeholder engine for `word/document.xml`.
//!
//! Understands three constructs over `{{` / `}}` delimiters:
//! - scalar substitution: `{{d.metadata.date}}`
//! - gated/loop containers: `{{#path}} … {{/path}}` — dropped when the
//!   value is falsy, expanded per item when it is a list (each iteration
//!   scoped to the loop record), rendered once otherwise
//! - image values: replaced by an inline drawing run backed by a fresh
//!   media part
//!
//! Word splits literal text across runs at arbitrary points, so a repair
//! pass first re-joins placeholders whose braces or names are interrupted
//! by run boundaries.

use crate::docx::DocxPackage;
use crate::error::ReportError;
use crate::media::ImageContent;
use crate::value::{Context, TplValue};

/// Longest placeholder text we accept; guards the repair scan against
/// stray braces in document prose.
const MAX_PLACEHOLDER_LEN: usize = 256;

/// Re-join placeholders split across XML runs: any complete `<...>` tags
/// found between the opening `{{` and closing `}}` are removed, leaving the
/// placeholder contiguous in the first run.
pub fn repair_split_placeholders(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match scan_placeholder(candidate) {
            Some((consumed, text)) => {
                out.push_str(&text);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Scan one placeholder starting at a `{`. Characters inside `<...>` tags
/// are skipped. Returns (bytes consumed, contiguous placeholder text).
fn scan_placeholder(s: &str) -> Option<(usize, String)> {
    let mut effective = String::new();
    let mut closing_braces = 0;
    let mut in_tag = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '<' if !in_tag => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => {
                effective.push(ch);
                if effective.len() == 2 && !effective.starts_with("{{") {
                    return None;
                }
                if effective.len() > MAX_PLACEHOLDER_LEN {
                    return None;
                }
                if ch == '}' {
                    closing_braces += 1;
                    if closing_braces == 2 {
                        return Some((i + ch.len_utf8(), effective));
                    }
                } else {
                    closing_braces = 0;
                }
            }
        }
    }
    None
}

/// Render the document XML against the context. Image placeholders register
/// media parts on the package as they are emitted.
pub fn render(
    xml: &str,
    ctx: &Context,
    package: &mut DocxPackage,
) -> Result<String, ReportError> {
    let mut scopes = Vec::new();
    render_region(xml, ctx, &mut scopes, package)
}

fn render_region(
    s: &str,
    ctx: &Context,
    scopes: &mut Vec<TplValue>,
    package: &mut DocxPackage,
) -> Result<String, ReportError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(close) = after.find("}}") else {
            // unterminated delimiter: keep the text as-is
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let token = after[..close].trim();
        let after_token = &after[close + 2..];

        if let Some(name) = token.strip_prefix('#') {
            let name = name.trim();
            match split_container(after_token, name) {
                Some((inner, remainder)) => {
                    let value = ctx.resolve(name, scopes).cloned();
                    match value {
                        Some(TplValue::List(items)) => {
                            for item in items {
                                scopes.push(item);
                                let rendered = render_region(inner, ctx, scopes, package);
                                scopes.pop();
                                out.push_str(&rendered?);
                            }
                        }
                        Some(v) if v.is_truthy() => {
                            let scoped = matches!(v, TplValue::Map(_));
                            if scoped {
                                scopes.push(v);
                            }
                            let rendered = render_region(inner, ctx, scopes, package);
                            if scoped {
                                scopes.pop();
                            }
                            out.push_str(&rendered?);
                        }
                        _ => {} // falsy or missing: the block disappears
                    }
                    rest = remainder;
                }
                None => {
                    tracing::warn!(container = name, "unclosed container in template");
                    rest = after_token;
                }
            }
        } else if token.starts_with('/') {
            // stray close tag: drop it
            rest = after_token;
        } else {
            match ctx.resolve(token, scopes) {
                Some(TplValue::Image(image)) => {
                    let image = image.clone();
                    out.push_str(&image_run(&image, package)?);
                }
                Some(v) => out.push_str(&xml_escape(&v.as_text())),
                None => {} // unresolvable path: substitute empty string
            }
            rest = after_token;
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Find the matching `{{/name}}` for an already-consumed `{{#name}}`,
/// honouring nested containers of the same name.
fn split_container<'a>(s: &'a str, name: &str) -> Option<(&'a str, &'a str)> {
    let open = format!("{{{{#{name}}}}}");
    let close = format!("{{{{/{name}}}}}");
    let mut depth = 0usize;
    let mut pos = 0usize;
    loop {
        let next_close = s[pos..].find(&close)?;
        let next_open = s[pos..].find(&open);
        match next_open {
            Some(o) if o < next_close => {
                depth += 1;
                pos += o + open.len();
            }
            _ => {
                if depth == 0 {
                    let inner_end = pos + next_close;
                    return Some((&s[..inner_end], &s[inner_end + close.len()..]));
                }
                depth -= 1;
                pos += next_close + close.len();
            }
        }
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Emit an inline drawing run for an image placeholder.
///
/// The placeholder lives inside `<w:r><w:t>…</w:t></w:r>`; the emitted text
/// closes that run, inserts a drawing run, and reopens a text run so the
/// surrounding XML stays balanced.
fn image_run(image: &ImageContent, package: &mut DocxPackage) -> Result<String, ReportError> {
    let rid = package.add_image(image)?;
    let (cx, cy) = image.extent_emu();
    let doc_pr_id: u32 = rid.trim_start_matches("rId").parse().unwrap_or(1) + 1000;

    Ok(format!(
        "</w:t></w:r><w:r><w:drawing>\
         <wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:docPr id=\"{doc_pr_id}\" name=\"Picture {doc_pr_id}\"/>\
         <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
         <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:nvPicPr><pic:cNvPr id=\"{doc_pr_id}\" name=\"Picture {doc_pr_id}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rid}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline>\
         </w:drawing></w:r><w:r><w:t xml:space=\"preserve\">"
    ))
}
