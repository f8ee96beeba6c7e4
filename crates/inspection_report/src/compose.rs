//! The report composer: template bytes + report bundle → document buffer.

use inspection_core::service::ReportBundle;
use inspection_core::types::QuestionImage;

use crate::docx::{DocxPackage, DOCUMENT_PART};
use crate::error::ReportError;
use crate::hydrate::{hydrate, HydrateConfig};
use crate::placeholder::{render, repair_split_placeholders};
use crate::sweep::sweep_empty_paragraphs;
use crate::value::Context;

#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Fit-inside box for question images, in pixels.
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            image_width: 150,
            image_height: 200,
        }
    }
}

pub struct Composer {
    config: ComposerConfig,
}

impl Composer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// Render the template against the bundle. `loaded_images` pairs image
    /// rows with their stored bytes; rows that failed to load are absent
    /// and simply do not appear in the document.
    pub fn render(
        &self,
        template: &[u8],
        bundle: &ReportBundle,
        loaded_images: &[(QuestionImage, Vec<u8>)],
    ) -> Result<Vec<u8>, ReportError> {
        let mut package = DocxPackage::open(template)?;
        let document = package.part_str(DOCUMENT_PART)?;

        let data = hydrate(
            bundle,
            loaded_images,
            &HydrateConfig {
                image_box: (self.config.image_width, self.config.image_height),
            },
        );
        let ctx = Context::new(data);

        let repaired = repair_split_placeholders(&document);
        let rendered = render(&repaired, &ctx, &mut package)?;

        // the sweep is best-effort: a failure must never cost the images
        let final_xml = match sweep_empty_paragraphs(&rendered) {
            Ok(swept) => swept,
            Err(e) => {
                tracing::warn!(error = %e, "empty-paragraph sweep failed; keeping unswept document");
                rendered
            }
        };

        package.set_part(DOCUMENT_PART, final_xml.into_bytes());
        package.save()
    }
}
