//! Minimal OPC package handling for `.docx` files.
//!
//! Reads every part into memory, lets the renderer replace
//! `word/document.xml` and add media parts, then re-zips. Untouched parts
//! round-trip byte-identical — media from the template must survive.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::ReportError;
use crate::media::ImageContent;

pub const DOCUMENT_PART: &str = "word/document.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub struct DocxPackage {
    /// (name, bytes) in original archive order; appended parts go last.
    parts: Vec<(String, Vec<u8>)>,
    media_seq: usize,
}

impl DocxPackage {
    pub fn open(buffer: &[u8]) -> Result<Self, ReportError> {
        let mut archive = ZipArchive::new(Cursor::new(buffer))
            .map_err(|e| ReportError::BadArchive(e.to_string()))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ReportError::BadArchive(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)
                .map_err(|e| ReportError::BadArchive(e.to_string()))?;
            parts.push((file.name().to_string(), bytes));
        }
        if !parts.iter().any(|(n, _)| n == DOCUMENT_PART) {
            return Err(ReportError::BadArchive(format!("{DOCUMENT_PART} is missing")));
        }
        Ok(Self { parts, media_seq: 0 })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.as_slice())
    }

    pub fn part_str(&self, name: &str) -> Result<String, ReportError> {
        let bytes = self
            .part(name)
            .ok_or_else(|| ReportError::BadArchive(format!("{name} is missing")))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ReportError::BadArchive(format!("{name} is not utf-8: {e}")))
    }

    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = bytes,
            None => self.parts.push((name.to_string(), bytes)),
        }
    }

    /// Register an image as a new media part plus relationship, returning
    /// the relationship id for `r:embed`.
    pub fn add_image(&mut self, image: &ImageContent) -> Result<String, ReportError> {
        self.media_seq += 1;
        let ext = image.format.extension();
        let file_name = format!("media/report_image{}.{ext}", self.media_seq);
        let part_name = format!("word/{file_name}");

        let rid = self.next_relationship_id()?;
        let rels = self.part_str(RELS_PART)?;
        let relationship = format!(
            "<Relationship Id=\"{rid}\" \
             Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" \
             Target=\"{file_name}\"/>"
        );
        let rels = rels
            .replace("</Relationships>", &format!("{relationship}</Relationships>"));
        self.set_part(RELS_PART, rels.into_bytes());

        self.ensure_content_type(ext, image.format.content_type())?;
        self.set_part(&part_name, image.bytes.clone());
        Ok(rid)
    }

    fn next_relationship_id(&self) -> Result<String, ReportError> {
        let rels = self.part_str(RELS_PART)?;
        let mut max = 0u32;
        for chunk in rels.split("Id=\"rId").skip(1) {
            if let Some(end) = chunk.find('"') {
                if let Ok(n) = chunk[..end].parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        Ok(format!("rId{}", max + 1))
    }

    fn ensure_content_type(&mut self, ext: &str, content_type: &str) -> Result<(), ReportError> {
        let types = self.part_str(CONTENT_TYPES_PART)?;
        if types.contains(&format!("Extension=\"{ext}\"")) {
            return Ok(());
        }
        let default = format!("<Default Extension=\"{ext}\" ContentType=\"{content_type}\"/>");
        let types = types.replace("</Types>", &format!("{default}</Types>"));
        self.set_part(CONTENT_TYPES_PART, types.into_bytes());
        Ok(())
    }

    pub fn save(&self) -> Result<Vec<u8>, ReportError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, bytes) in &self.parts {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| ReportError::BadArchive(e.to_string()))?;
            writer
                .write_all(bytes)
                .map_err(|e| ReportError::BadArchive(e.to_string()))?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| ReportError::BadArchive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Build a minimal but well-formed docx around the given document.xml body.
/// Shared by the composer tests and the sweep tests.
#[cfg(test)]
pub fn test_package(document_xml: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file(CONTENT_TYPES_PART, options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#,
        )
        .unwrap();

    writer.start_file("_rels/.rels", options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#,
        )
        .unwrap();

    writer.start_file(RELS_PART, options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#,
        )
        .unwrap();

    writer.start_file(DOCUMENT_PART, options).unwrap();
    let doc = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body>{document_xml}</w:body></w:document>"#
    );
    writer.write_all(doc.as_bytes()).unwrap();

    let cursor = writer.finish().unwrap();
    cursor.into_inner()
}
