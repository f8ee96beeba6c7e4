//! Hydration — builds the `d` value tree the template is rendered against.
//!
//! Shape:
//! - `d.contractor.{company, contract_no, contact}`
//! - `d.metadata.{date, inspector, location, scale_id_serial_no, model}`
//! - `d.<section>.<field>.{status, comment, question}` per content section
//! - `d.remarks` — string or object, as stored
//! - `d.signatures.<role>` — signature image content
//! - `d.ftp_image` — optional evidence image
//! - `d.images.<section>.<fieldKey>` — loop arrays; `d.hasImages.…` gates
//! - `d.image_list` — every question image in (section, field, order) order
//!
//! Every template-declared field receives an empty loop array and a false
//! gate before real images are applied, so unused fields render cleanly.

use serde_json::Value;

use inspection_core::service::ReportBundle;
use inspection_core::types::QuestionImage;

use crate::mapping::placeholder_key;
use crate::media::ImageContent;
use crate::value::{loop_record, TplValue};

/// Signatures embed at a fixed 180×80; the evidence image at 300×200.
pub const SIGNATURE_DIMS: (u32, u32) = (180, 80);
pub const FTP_IMAGE_DIMS: (u32, u32) = (300, 200);

pub struct HydrateConfig {
    /// Bounding box for question images (fit-inside).
    pub image_box: (u32, u32),
}

impl Default for HydrateConfig {
    fn default() -> Self {
        Self { image_box: (150, 200) }
    }
}

/// Build the root context value. `loaded_images` pairs each image row with
/// its file bytes; rows whose bytes failed to load are simply absent.
pub fn hydrate(
    bundle: &ReportBundle,
    loaded_images: &[(QuestionImage, Vec<u8>)],
    config: &HydrateConfig,
) -> TplValue {
    let mut root = TplValue::map();
    let d = root.entry_map("d");

    // contractor block: contract/site organizations collapse to the owning
    // organization in this deployment
    let contractor = d.entry_map("contractor");
    contractor.set("company", TplValue::Text(bundle.organization.name.clone()));
    contractor.set(
        "contract_no",
        TplValue::Text(
            bundle
                .contract
                .as_ref()
                .map(|c| c.contract_no.clone())
                .unwrap_or_default(),
        ),
    );
    contractor.set(
        "contact",
        TplValue::Text(
            bundle
                .organization
                .contact_name
                .clone()
                .or_else(|| bundle.organization.contact_email.clone())
                .unwrap_or_default(),
        ),
    );

    // metadata, with device fallbacks for the identification fields
    let stored = bundle.answers.get("metadata").cloned().unwrap_or(Value::Null);
    let metadata = d.entry_map("metadata");
    for key in ["date", "inspector", "location", "scale_id_serial_no", "model"] {
        let fallback = match key {
            "scale_id_serial_no" => Some(bundle.device.serial_no.clone()),
            "model" => bundle.device.model_name.clone(),
            "location" => bundle.device.location.clone(),
            _ => None,
        };
        let value = stored
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(fallback)
            .unwrap_or_default();
        metadata.set(key, TplValue::Text(value));
    }

    // one map per content section: field → { status, comment, question }
    for section in bundle.catalogue.sections() {
        let answered = bundle.answers.get(&section.key);
        let out = d.entry_map(&section.key);
        for field in &section.fields {
            let key = placeholder_key(&section.key, &field.id).to_string();
            let answer = answered.and_then(|s| s.get(&field.id));
            let mut entry = TplValue::map();
            entry.set(
                "status",
                TplValue::Text(
                    answer
                        .and_then(|a| a.get("status"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                ),
            );
            entry.set(
                "comment",
                TplValue::Text(
                    answer
                        .and_then(|a| a.get("comment"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                ),
            );
            entry.set(
                "question",
                TplValue::Text(
                    answer
                        .and_then(|a| a.get("question"))
                        .and_then(Value::as_str)
                        .unwrap_or(&field.question)
                        .to_string(),
                ),
            );
            out.set(key, entry);
        }
    }

    // remarks pass through as stored
    if let Some(remarks) = bundle.answers.get("remarks") {
        d.set("remarks", TplValue::from_json(remarks));
    } else {
        d.set("remarks", TplValue::Text(String::new()));
    }

    // signatures: data-urls become fixed-size image content
    let signatures = d.entry_map("signatures");
    if let Some(Value::Object(stored)) = bundle.answers.get("signatures") {
        for (role, value) in stored {
            if let Some(url) = value.as_str() {
                match ImageContent::from_data_url(url, SIGNATURE_DIMS.0, SIGNATURE_DIMS.1) {
                    Ok(image) => signatures.set(role.clone(), TplValue::Image(image)),
                    Err(e) => {
                        tracing::warn!(role = %role, error = %e, "signature image skipped");
                    }
                }
            }
        }
    }

    if let Some(url) = bundle.answers.get("ftp_image").and_then(Value::as_str) {
        match ImageContent::from_data_url(url, FTP_IMAGE_DIMS.0, FTP_IMAGE_DIMS.1) {
            Ok(image) => d.set("ftp_image", TplValue::Image(image)),
            Err(e) => tracing::warn!(error = %e, "evidence image skipped"),
        }
    }

    hydrate_question_images(d, bundle, loaded_images, config);
    root
}

fn hydrate_question_images(
    d: &mut TplValue,
    bundle: &ReportBundle,
    loaded_images: &[(QuestionImage, Vec<u8>)],
    config: &HydrateConfig,
) {
    // defaults first: empty loop array + false gate for every declared field
    {
        let images = d.entry_map("images");
        for section in bundle.catalogue.sections() {
            let per_section = images.entry_map(&section.key);
            for field in &section.fields {
                per_section.set(
                    placeholder_key(&section.key, &field.id).to_string(),
                    TplValue::List(Vec::new()),
                );
            }
        }
    }
    {
        let gates = d.entry_map("hasImages");
        for section in bundle.catalogue.sections() {
            let per_section = gates.entry_map(&section.key);
            for field in &section.fields {
                per_section.set(
                    placeholder_key(&section.key, &field.id).to_string(),
                    TplValue::Bool(false),
                );
            }
        }
    }

    // decode in listing order, grouped per (section, field)
    let mut groups: Vec<((String, String), Vec<(i32, ImageContent)>)> = Vec::new();
    let mut flat_list = Vec::new();
    for (row, bytes) in loaded_images {
        let content = match ImageContent::from_bytes(bytes, config.image_box.0, config.image_box.1)
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(image_id = %row.id, error = %e, "question image skipped");
                continue;
            }
        };
        let group_key = (row.section.clone(), row.field_id.clone());
        match groups.iter_mut().find(|(k, _)| *k == group_key) {
            Some((_, items)) => items.push((row.image_order, content.clone())),
            None => groups.push((group_key, vec![(row.image_order, content.clone())])),
        }

        let mut decorated = TplValue::Map(vec![
            ("image".into(), TplValue::Image(content)),
            ("section".into(), TplValue::Text(row.section.clone())),
            ("fieldId".into(), TplValue::Text(row.field_id.clone())),
            ("order".into(), TplValue::Text(row.image_order.to_string())),
        ]);
        decorated.set("url", TplValue::Text(row.image_url.clone()));
        flat_list.push(decorated);
    }
    d.set("image_list", TplValue::List(flat_list));

    for ((section, field_id), mut items) in groups {
        items.sort_by_key(|(order, _)| *order);
        let total = items.len();
        let records = items
            .into_iter()
            .enumerate()
            .map(|(idx, (_, content))| loop_record(content, idx, total))
            .collect();
        let key = placeholder_key(&section, &field_id).to_string();

        d.entry_map("images")
            .entry_map(&section)
            .set(key.clone(), TplValue::List(records));
        d.entry_map("hasImages")
            .entry_map(&section)
            .set(key, TplValue::Bool(true));
    }
}
