//! Field-mapping tables — template field ids to the placeholder key names
//! the Word template was authored against.
//!
//! The report template predates the questionnaire templates, so a handful
//! of field ids differ from their placeholder names. Unlisted ids pass
//! through unchanged.

pub fn placeholder_key<'a>(section: &str, field_id: &'a str) -> &'a str {
    let table: &[(&str, &str)] = match section {
        "exterior" => &[("paint_condition", "paint")],
        "indicator" => &[("calibration_seal", "seal")],
        "jbox" => &[("cable_glands", "glands")],
        "sensor" => &[("load_cell", "loadcell"), ("cable_condition", "cable")],
        "foundation" => &[],
        "cleanliness" => &[],
        _ => &[],
    };
    table
        .iter()
        .find(|(id, _)| *id == field_id)
        .map(|(_, key)| *key)
        .unwrap_or(field_id)
}
