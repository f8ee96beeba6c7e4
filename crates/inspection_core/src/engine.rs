//! Section aggregation engine.
//!
//! Merges incremental per-section writes into the single answer aggregate,
//! extracts cross-cutting fields (metadata, remarks, signatures), chooses
//! the target row, detects completion, and computes navigation signals.
//!
//! Everything here is pure: the engine reads and produces
//! `serde_json::Value` documents and row snapshots. The service layer owns
//! the transactions.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::InspectionError;
use crate::merge::{
    deep_merge, extract_metadata, extract_remarks_payload, merge_remarks, metadata_is_populated,
    reorder_section_fields,
};
use crate::template::TemplateCatalogue;
use crate::types::{AnswerRow, InspectionStatus, SectionStatus};

pub const REMARKS_SECTION: &str = "remarks";
pub const SIGNATURES_SECTION: &str = "signatures";

/// Section keys the target-row probe recognizes as content markers.
const PROBE_CONTENT_KEYS: [&str; 6] = [
    "jbox",
    "sensor",
    "exterior",
    "indicator",
    "foundation",
    "cleanliness",
];

/// One section write, as received from the client (§ request contract).
#[derive(Debug, Clone)]
pub struct SectionWrite {
    pub inspection_id: Uuid,
    pub section: String,
    pub answers: Value,
    /// Optional explicit wrapper; when present it replaces `answers` as the
    /// payload. Legacy clients post `{ data: {...} }`.
    pub data: Option<Value>,
    pub answer_id: Option<Uuid>,
    pub section_index: Option<usize>,
    pub is_first_section: bool,
    /// Target inspection status, as sent (normalized during validation).
    pub status: Option<String>,
    pub section_status: Option<SectionStatus>,
    pub progress: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionClass {
    Content,
    Remarks,
    Signatures,
}

pub fn classify(section: &str) -> SectionClass {
    match section {
        REMARKS_SECTION => SectionClass::Remarks,
        SIGNATURES_SECTION => SectionClass::Signatures,
        _ => SectionClass::Content,
    }
}

/// Where a non-completion write should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Existing(Uuid),
    CreateNew,
}

/// One planned section write, produced under the store's row lock and
/// applied by the store in the same transaction.
#[derive(Debug, Clone)]
pub enum WritePlan {
    /// Update or insert one row and roll the inspection's status/progress
    /// forward.
    Merge {
        target: WriteTarget,
        answers: Value,
        /// Explicit non-terminal status requested by the writer; `None`
        /// means "IN_PROGRESS if still DRAFT, else unchanged".
        status: Option<InspectionStatus>,
        /// Progress floor; the store keeps the maximum of this and the
        /// current value.
        progress: i16,
    },
    /// Completion: replace every row with the collapsed aggregate and mark
    /// the inspection SUBMITTED.
    Collapse { answers: Value },
}

/// Navigation signals returned to the writer.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub next_section: Option<String>,
    pub is_last_section: bool,
    pub is_completion: bool,
    pub section_order: Vec<String>,
    /// Writer-visible progress; `None` when the section has no template
    /// position (remarks/signatures without an explicit index).
    pub progress: Option<i16>,
}

pub struct AggregationEngine {
    catalogue: TemplateCatalogue,
}

impl AggregationEngine {
    pub fn new(catalogue: TemplateCatalogue) -> Self {
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &TemplateCatalogue {
        &self.catalogue
    }

    // ── Validation ───────────────────────────────────────────

    /// Check the request contract. Returns the normalized target status.
    pub fn validate(&self, write: &SectionWrite) -> Result<Option<InspectionStatus>, InspectionError> {
        if write.section.trim().is_empty() {
            return Err(InspectionError::InvalidInput("section is required".into()));
        }
        let payload = write.data.as_ref().unwrap_or(&write.answers);
        if payload.is_array() {
            return Err(InspectionError::InvalidInput(
                "answers must be a mapping, not an array".into(),
            ));
        }
        if payload.is_null() {
            return Err(InspectionError::InvalidInput("answers is required".into()));
        }
        match &write.status {
            None => Ok(None),
            Some(raw) => InspectionStatus::from_str(raw)
                .map(Some)
                .ok_or_else(|| InspectionError::InvalidInput(format!("unknown status: {raw}"))),
        }
    }

    // ── Target-row probe ─────────────────────────────────────

    /// Locate the row a non-completion write should merge into (§ probe
    /// order: explicit id, `data` field, content markers, `metadata`, any).
    pub fn probe_target(
        &self,
        rows: &[AnswerRow],
        write: &SectionWrite,
    ) -> Result<WriteTarget, InspectionError> {
        if let Some(id) = write.answer_id {
            if rows.iter().any(|r| r.id == id) {
                return Ok(WriteTarget::Existing(id));
            }
        }

        let probed = rows
            .iter()
            .find(|r| r.answers.get("data").is_some())
            .or_else(|| {
                rows.iter()
                    .find(|r| PROBE_CONTENT_KEYS.iter().any(|k| r.answers.get(k).is_some()))
            })
            .or_else(|| rows.iter().find(|r| r.answers.get("metadata").is_some()))
            .or_else(|| rows.first());

        match probed {
            Some(row) => Ok(WriteTarget::Existing(row.id)),
            None => match classify(&write.section) {
                SectionClass::Content => Ok(WriteTarget::CreateNew),
                _ => Err(InspectionError::NoInspectionRecord(
                    write.inspection_id.to_string(),
                )),
            },
        }
    }

    // ── Merge ────────────────────────────────────────────────

    /// Apply one section write to an aggregate document.
    ///
    /// Invariants enforced here:
    /// - `metadata` is populated only by first-section writes;
    ///   `metadata.date`, once set, is never overwritten.
    /// - scraped metadata/remarks/signatures keys never land as field answers.
    /// - section field order is rewritten to template order after the merge.
    pub fn apply_write(&self, aggregate: &mut Value, write: &SectionWrite) {
        if !aggregate.is_object() {
            *aggregate = Value::Object(Map::new());
        }

        let mut payload = self.effective_payload(write);

        if write.is_first_section {
            let (metadata, remarks, signatures) = extract_metadata(&mut payload);
            if let Some(meta) = metadata {
                self.fold_metadata(aggregate, meta);
            }
            if let Some(r) = remarks {
                self.fold_remarks(aggregate, r);
            }
            if let Some(s) = signatures {
                self.fold_signatures(aggregate, s);
            }
        }

        match classify(&write.section) {
            SectionClass::Remarks => {
                self.fold_remarks(aggregate, extract_remarks_payload(payload));
            }
            SectionClass::Signatures => {
                // `{ signatures: {...} }` wrapper and bare role maps both occur.
                let payload = match payload {
                    Value::Object(ref m) if m.contains_key("signatures") => {
                        m.get("signatures").cloned().unwrap_or_default()
                    }
                    other => other,
                };
                self.fold_signatures(aggregate, payload);
            }
            SectionClass::Content => {
                let map = aggregate.as_object_mut().expect("aggregate is an object");
                match map.get_mut(&write.section) {
                    Some(existing) => deep_merge(existing, payload),
                    None => {
                        map.insert(write.section.clone(), payload);
                    }
                }
                let declared = self.catalogue.field_order(&write.section);
                if let Some(section) = map.get(&write.section) {
                    let ordered = reorder_section_fields(section, &declared);
                    map.insert(write.section.clone(), ordered);
                }
            }
        }
    }

    fn effective_payload(&self, write: &SectionWrite) -> Value {
        let payload = write.data.clone().unwrap_or_else(|| write.answers.clone());
        // Unwrap a lone `data` wrapper one level deep.
        if let Value::Object(ref m) = payload {
            if m.len() == 1 {
                if let Some(inner) = m.get("data") {
                    return inner.clone();
                }
            }
        }
        payload
    }

    fn fold_metadata(&self, aggregate: &mut Value, incoming: Value) {
        let map = aggregate.as_object_mut().expect("aggregate is an object");
        match map.get_mut("metadata") {
            Some(existing) if metadata_is_populated(Some(existing)) => {
                // date is sticky: keep the first-written value.
                let sticky_date = existing.get("date").cloned();
                deep_merge(existing, incoming);
                if let (Some(date), Some(obj)) = (sticky_date, existing.as_object_mut()) {
                    obj.insert("date".into(), date);
                }
            }
            _ => {
                map.insert("metadata".into(), incoming);
            }
        }
    }

    fn fold_remarks(&self, aggregate: &mut Value, incoming: Value) {
        let map = aggregate.as_object_mut().expect("aggregate is an object");
        let merged = merge_remarks(map.get("remarks"), incoming);
        map.insert("remarks".into(), merged);
    }

    fn fold_signatures(&self, aggregate: &mut Value, incoming: Value) {
        let map = aggregate.as_object_mut().expect("aggregate is an object");
        match map.get_mut("signatures") {
            Some(existing) => deep_merge(existing, incoming),
            None => {
                map.insert("signatures".into(), incoming);
            }
        }
    }

    // ── Completion ───────────────────────────────────────────

    /// The single completion predicate.
    ///
    /// A content write completes when the writer targets SUBMITTED, or marks
    /// the template's last section COMPLETED. A signatures write completes
    /// when it targets SUBMITTED and every template section has been
    /// answered. Remarks writes never complete.
    pub fn is_completion(
        &self,
        write: &SectionWrite,
        status: Option<InspectionStatus>,
        aggregate: &Value,
    ) -> bool {
        match classify(&write.section) {
            SectionClass::Content => {
                status == Some(InspectionStatus::Submitted)
                    || (write.section_status == Some(SectionStatus::Completed)
                        && self.catalogue.is_last(&write.section))
            }
            SectionClass::Signatures => {
                status == Some(InspectionStatus::Submitted)
                    && self
                        .catalogue
                        .section_keys()
                        .iter()
                        .all(|k| aggregate.get(k).is_some())
            }
            SectionClass::Remarks => false,
        }
    }

    /// Collapse every transient row into the single final aggregate.
    ///
    /// Rows must arrive in `answered_at` ascending order. Later writers win
    /// for overlapping fields; the earliest non-empty metadata is carried
    /// forward; remarks follow the writer-wins type rule; signatures
    /// deep-merge.
    pub fn collapse(&self, rows: &[AnswerRow]) -> Value {
        let mut metadata: Option<Value> = None;
        let mut remarks: Option<Value> = None;
        let mut signatures: Option<Value> = None;
        let mut sections: Map<String, Value> = Map::new();

        for row in rows {
            let Some(doc) = row.answers.as_object() else {
                continue;
            };
            // Legacy rows wrap their payload in `data`.
            let doc = match doc.get("data") {
                Some(Value::Object(inner)) if doc.len() == 1 => inner,
                _ => doc,
            };
            for (key, value) in doc {
                match key.as_str() {
                    "metadata" => {
                        if !metadata_is_populated(metadata.as_ref()) {
                            metadata = Some(value.clone());
                        }
                    }
                    REMARKS_SECTION => {
                        remarks = Some(merge_remarks(remarks.as_ref(), value.clone()));
                    }
                    SIGNATURES_SECTION => match signatures.as_mut() {
                        Some(existing) => deep_merge(existing, value.clone()),
                        None => signatures = Some(value.clone()),
                    },
                    _ => match sections.get_mut(key) {
                        Some(existing) => deep_merge(existing, value.clone()),
                        None => {
                            sections.insert(key.clone(), value.clone());
                        }
                    },
                }
            }
        }

        // Assemble in presentation order: metadata, sections in template
        // order, unknown sections, remarks, signatures.
        let mut out = Map::new();
        if let Some(meta) = metadata {
            out.insert("metadata".into(), meta);
        }
        for key in self.catalogue.section_keys() {
            if let Some(section) = sections.shift_remove(&key) {
                let ordered = reorder_section_fields(&section, &self.catalogue.field_order(&key));
                out.insert(key, ordered);
            }
        }
        for (key, section) in sections {
            out.insert(key, section);
        }
        if let Some(r) = remarks {
            out.insert(REMARKS_SECTION.into(), r);
        }
        if let Some(s) = signatures {
            out.insert(SIGNATURES_SECTION.into(), s);
        }
        Value::Object(out)
    }

    // ── Planning ─────────────────────────────────────────────

    /// Plan one section write against the current row set. Pure; the store
    /// calls this on the snapshot it locked, inside its transaction.
    pub fn plan_write(
        &self,
        rows: &[AnswerRow],
        write: &SectionWrite,
        target_status: Option<InspectionStatus>,
        answered_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<WritePlan, InspectionError> {
        let target = self.probe_target(rows, write)?;

        let mut merged = match target {
            WriteTarget::Existing(id) => rows
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.answers.clone())
                .unwrap_or(Value::Null),
            WriteTarget::CreateNew => Value::Null,
        };
        self.apply_write(&mut merged, write);

        if self.is_completion(write, target_status, &merged) {
            // Fold the in-flight write into the row set as the latest
            // writer, then collapse everything to the final aggregate.
            let mut rows = rows.to_vec();
            match target {
                WriteTarget::Existing(id) => {
                    if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                        row.answers = merged;
                        row.answered_at = now;
                        row.answered_by = answered_by;
                    }
                }
                WriteTarget::CreateNew => rows.push(AnswerRow {
                    id: Uuid::new_v4(),
                    inspection_id: write.inspection_id,
                    answers: merged,
                    answered_by,
                    answered_at: now,
                    created_at: now,
                    updated_at: now,
                }),
            }
            rows.sort_by_key(|r| r.answered_at);
            return Ok(WritePlan::Collapse {
                answers: self.collapse(&rows),
            });
        }

        let status = target_status.filter(|s| *s != InspectionStatus::Submitted);
        let progress = self
            .navigation(write, false)
            .progress
            .unwrap_or(0)
            .max(write.progress.unwrap_or(0))
            .clamp(0, 100);
        Ok(WritePlan::Merge {
            target,
            answers: merged,
            status,
            progress,
        })
    }

    // ── Navigation ───────────────────────────────────────────

    pub fn navigation(&self, write: &SectionWrite, is_completion: bool) -> Navigation {
        let index = self
            .catalogue
            .index_of(&write.section)
            .or(write.section_index);
        Navigation {
            next_section: self.catalogue.next_after(&write.section).map(|s| s.key.clone()),
            is_last_section: self.catalogue.is_last(&write.section),
            is_completion,
            section_order: self.catalogue.section_keys(),
            progress: index.map(|i| self.catalogue.progress_after(i)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn engine() -> AggregationEngine {
        AggregationEngine::new(TemplateCatalogue::default_catalogue())
    }

    fn write(section: &str, answers: Value) -> SectionWrite {
        SectionWrite {
            inspection_id: Uuid::new_v4(),
            section: section.into(),
            answers,
            data: None,
            answer_id: None,
            section_index: None,
            is_first_section: false,
            status: None,
            section_status: None,
            progress: None,
        }
    }

    fn row(answers: Value, minutes: i64) -> AnswerRow {
        let t = Utc::now() + Duration::minutes(minutes);
        AnswerRow {
            id: Uuid::new_v4(),
            inspection_id: Uuid::new_v4(),
            answers,
            answered_by: Uuid::new_v4(),
            answered_at: t,
            created_at: t,
            updated_at: t,
        }
    }

    // ── apply_write ──────────────────────────────────────────

    #[test]
    fn first_section_write_scrapes_metadata() {
        let e = engine();
        let mut agg = Value::Null;
        let mut w = write(
            "exterior",
            json!({
                "date": "2024-06-01",
                "inspector": "A. Batbold",
                "platform_plate": {"status": "ok", "comment": ""}
            }),
        );
        w.is_first_section = true;
        e.apply_write(&mut agg, &w);

        assert_eq!(agg["metadata"]["date"], json!("2024-06-01"));
        assert_eq!(agg["metadata"]["inspector"], json!("A. Batbold"));
        assert_eq!(agg["exterior"]["platform_plate"]["status"], json!("ok"));
        assert!(agg["exterior"].get("date").is_none());
    }

    #[test]
    fn metadata_date_is_sticky_across_rewrites() {
        let e = engine();
        let mut agg = Value::Null;
        let mut w = write("exterior", json!({"date": "2024-06-01", "f": {"status": "ok"}}));
        w.is_first_section = true;
        e.apply_write(&mut agg, &w);

        let mut again = write(
            "exterior",
            json!({"date": "2024-07-15", "inspector": "B. Dorj", "f": {"status": "bad"}}),
        );
        again.is_first_section = true;
        e.apply_write(&mut agg, &again);

        assert_eq!(agg["metadata"]["date"], json!("2024-06-01"));
        assert_eq!(agg["metadata"]["inspector"], json!("B. Dorj"));
        assert_eq!(agg["exterior"]["f"]["status"], json!("bad"));
    }

    #[test]
    fn remarks_write_lands_as_aggregate_remarks() {
        let e = engine();
        let mut agg = json!({"exterior": {"beam": {"status": "ok"}}});
        let w = write(
            REMARKS_SECTION,
            json!({"remarks_field": {"comment": "Нэмэлт тэмдэглэл"}}),
        );
        e.apply_write(&mut agg, &w);

        assert_eq!(agg["remarks"], json!("Нэмэлт тэмдэглэл"));
        assert!(agg.get("remarks_field").is_none());
        assert!(agg["exterior"].get("remarks_field").is_none());
    }

    #[test]
    fn signatures_deep_merge_by_role() {
        let e = engine();
        let mut agg = json!({});
        e.apply_write(
            &mut agg,
            &write(SIGNATURES_SECTION, json!({"signatures": {"inspector": "data:image/png;base64,AA=="}})),
        );
        e.apply_write(
            &mut agg,
            &write(SIGNATURES_SECTION, json!({"customer": "data:image/png;base64,BB=="})),
        );

        assert_eq!(agg["signatures"]["inspector"], json!("data:image/png;base64,AA=="));
        assert_eq!(agg["signatures"]["customer"], json!("data:image/png;base64,BB=="));
    }

    #[test]
    fn content_section_fields_follow_template_order() {
        let e = engine();
        let mut agg = json!({});
        e.apply_write(
            &mut agg,
            &write("sensor", json!({"mounting": {"status": "ok"}, "ball": {"status": "ok"}, "custom_extra": {"status": "ok"}})),
        );
        let keys: Vec<&String> = agg["sensor"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["ball", "mounting", "custom_extra"]);
    }

    #[test]
    fn data_wrapper_is_unwrapped() {
        let e = engine();
        let mut agg = json!({});
        let mut w = write("jbox", Value::Null);
        w.data = Some(json!({"data": {"terminals": {"status": "ok"}}}));
        e.apply_write(&mut agg, &w);
        assert_eq!(agg["jbox"]["terminals"]["status"], json!("ok"));
    }

    // ── validation ───────────────────────────────────────────

    #[test]
    fn array_answers_are_rejected() {
        let e = engine();
        let w = write("exterior", json!([1, 2]));
        assert!(e.validate(&w).is_err());
    }

    #[test]
    fn status_is_normalized_uppercase() {
        let e = engine();
        let mut w = write("exterior", json!({}));
        w.status = Some("submitted".into());
        assert_eq!(e.validate(&w).unwrap(), Some(InspectionStatus::Submitted));

        w.status = Some("nonsense".into());
        assert!(e.validate(&w).is_err());
    }

    // ── probe ────────────────────────────────────────────────

    #[test]
    fn probe_prefers_explicit_answer_id() {
        let e = engine();
        let rows = vec![row(json!({"exterior": {}}), 0), row(json!({"metadata": {}}), 1)];
        let mut w = write("indicator", json!({}));
        w.answer_id = Some(rows[1].id);
        assert_eq!(e.probe_target(&rows, &w).unwrap(), WriteTarget::Existing(rows[1].id));
    }

    #[test]
    fn probe_order_data_then_content_then_metadata() {
        let e = engine();
        let rows = vec![
            row(json!({"metadata": {"date": "2024-01-01"}}), 0),
            row(json!({"sensor": {"ball": {}}}), 1),
            row(json!({"data": {"exterior": {}}}), 2),
        ];
        let w = write("indicator", json!({}));
        // data-field row wins despite being newest
        assert_eq!(e.probe_target(&rows, &w).unwrap(), WriteTarget::Existing(rows[2].id));

        let rows = vec![
            row(json!({"metadata": {"date": "2024-01-01"}}), 0),
            row(json!({"sensor": {"ball": {}}}), 1),
        ];
        assert_eq!(e.probe_target(&rows, &w).unwrap(), WriteTarget::Existing(rows[1].id));

        let rows = vec![row(json!({"metadata": {"date": "2024-01-01"}}), 0)];
        assert_eq!(e.probe_target(&rows, &w).unwrap(), WriteTarget::Existing(rows[0].id));
    }

    #[test]
    fn probe_with_no_rows_branches_on_class() {
        let e = engine();
        let w = write("exterior", json!({}));
        assert_eq!(e.probe_target(&[], &w).unwrap(), WriteTarget::CreateNew);

        let w = write(REMARKS_SECTION, json!({}));
        assert!(matches!(
            e.probe_target(&[], &w),
            Err(InspectionError::NoInspectionRecord(_))
        ));
    }

    // ── completion ───────────────────────────────────────────

    #[test]
    fn submitted_status_completes_any_content_section() {
        let e = engine();
        let mut w = write("indicator", json!({}));
        w.status = Some("SUBMITTED".into());
        assert!(e.is_completion(&w, Some(InspectionStatus::Submitted), &json!({})));
    }

    #[test]
    fn last_section_completed_completes() {
        let e = engine();
        let mut w = write("cleanliness", json!({}));
        w.section_status = Some(SectionStatus::Completed);
        assert!(e.is_completion(&w, None, &json!({})));

        let mut w = write("exterior", json!({}));
        w.section_status = Some(SectionStatus::Completed);
        assert!(!e.is_completion(&w, None, &json!({})));
    }

    #[test]
    fn remarks_never_complete() {
        let e = engine();
        let mut w = write(REMARKS_SECTION, json!({}));
        w.status = Some("SUBMITTED".into());
        w.section_status = Some(SectionStatus::Completed);
        assert!(!e.is_completion(&w, Some(InspectionStatus::Submitted), &json!({})));
    }

    #[test]
    fn terminal_signatures_write_completes_only_when_all_sections_answered() {
        let e = engine();
        let mut w = write(SIGNATURES_SECTION, json!({}));
        w.status = Some("SUBMITTED".into());

        let partial = json!({"exterior": {}, "indicator": {}});
        assert!(!e.is_completion(&w, Some(InspectionStatus::Submitted), &partial));

        let full = json!({
            "exterior": {}, "indicator": {}, "jbox": {},
            "sensor": {}, "foundation": {}, "cleanliness": {}
        });
        assert!(e.is_completion(&w, Some(InspectionStatus::Submitted), &full));
    }

    // ── collapse ─────────────────────────────────────────────

    #[test]
    fn collapse_carries_earliest_metadata_and_merges_sections() {
        let e = engine();
        let rows = vec![
            row(json!({"metadata": {"date": "2024-06-01"}, "exterior": {"beam": {"status": "ok"}}}), 0),
            row(json!({"metadata": {"date": "2024-09-09"}, "indicator": {"display": {"status": "ok"}}}), 1),
            row(json!({"exterior": {"beam": {"status": "bad"}}, "remarks": "эхний"}), 2),
            row(json!({"remarks": "сүүлийн", "signatures": {"inspector": "data:..."}}), 3),
        ];
        let agg = e.collapse(&rows);

        assert_eq!(agg["metadata"]["date"], json!("2024-06-01"));
        assert_eq!(agg["exterior"]["beam"]["status"], json!("bad"));
        assert_eq!(agg["indicator"]["display"]["status"], json!("ok"));
        assert_eq!(agg["remarks"], json!("сүүлийн"));
        assert_eq!(agg["signatures"]["inspector"], json!("data:..."));

        // top-level order: metadata, sections in template order, remarks, signatures
        let keys: Vec<&String> = agg.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["metadata", "exterior", "indicator", "remarks", "signatures"]);
    }

    #[test]
    fn collapse_unwraps_legacy_data_rows() {
        let e = engine();
        let rows = vec![row(json!({"data": {"jbox": {"terminals": {"status": "ok"}}}}), 0)];
        let agg = e.collapse(&rows);
        assert_eq!(agg["jbox"]["terminals"]["status"], json!("ok"));
    }

    // ── planning ─────────────────────────────────────────────

    #[test]
    fn plan_write_merges_into_the_probed_row() {
        let e = engine();
        let rows = vec![row(json!({"exterior": {"beam": {"status": "ok"}}}), 0)];
        let w = write("indicator", json!({"display": {"status": "ok"}}));

        let plan = e
            .plan_write(&rows, &w, None, Uuid::new_v4(), Utc::now())
            .unwrap();
        match plan {
            WritePlan::Merge { target, answers, status, progress } => {
                assert_eq!(target, WriteTarget::Existing(rows[0].id));
                assert_eq!(answers["exterior"]["beam"]["status"], json!("ok"));
                assert_eq!(answers["indicator"]["display"]["status"], json!("ok"));
                assert_eq!(status, None);
                assert_eq!(progress, 33); // indicator is second of six
            }
            other => panic!("expected merge plan, got {other:?}"),
        }
    }

    #[test]
    fn plan_write_collapses_on_completion() {
        let e = engine();
        let rows = vec![row(
            json!({"metadata": {"date": "2024-06-01"}, "exterior": {"beam": {"status": "ok"}}}),
            0,
        )];
        let mut w = write("cleanliness", json!({"platform": {"status": "ok"}}));
        w.section_status = Some(SectionStatus::Completed);

        let plan = e
            .plan_write(&rows, &w, None, Uuid::new_v4(), Utc::now())
            .unwrap();
        match plan {
            WritePlan::Collapse { answers } => {
                assert_eq!(answers["metadata"]["date"], json!("2024-06-01"));
                assert_eq!(answers["exterior"]["beam"]["status"], json!("ok"));
                assert_eq!(answers["cleanliness"]["platform"]["status"], json!("ok"));
            }
            other => panic!("expected collapse plan, got {other:?}"),
        }
    }

    #[test]
    fn plan_write_surfaces_probe_errors() {
        let e = engine();
        let w = write(REMARKS_SECTION, json!({"x": {"comment": "hi"}}));
        assert!(matches!(
            e.plan_write(&[], &w, None, Uuid::new_v4(), Utc::now()),
            Err(InspectionError::NoInspectionRecord(_))
        ));
    }

    // ── navigation ───────────────────────────────────────────

    #[test]
    fn navigation_reports_next_section_and_progress() {
        let e = engine();
        let nav = e.navigation(&write("exterior", json!({})), false);
        assert_eq!(nav.next_section.as_deref(), Some("indicator"));
        assert!(!nav.is_last_section);
        assert_eq!(nav.progress, Some(17));
        assert_eq!(nav.section_order.len(), 6);

        let nav = e.navigation(&write("cleanliness", json!({})), true);
        assert!(nav.is_last_section);
        assert!(nav.is_completion);
        assert_eq!(nav.progress, Some(100));
    }
}
