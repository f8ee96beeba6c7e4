//! Template catalogue — the parsed, ordered view of an
//! `InspectionTemplate.questions` definition.
//!
//! The catalogue is pure: once built it does no I/O. The aggregation engine
//! uses it to rewrite field order and compute navigation; the report
//! composer uses it to scaffold placeholder defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InspectionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub text_required: bool,
    #[serde(default)]
    pub image_required: bool,
}

#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub key: String,
    pub title: String,
    /// 0-based template position.
    pub order: usize,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone)]
pub struct TemplateCatalogue {
    sections: Vec<SectionSpec>,
}

impl TemplateCatalogue {
    /// Parse a `questions` document: an ordered array of
    /// `{ section, title, fields: [{ id, question, type, ... }] }`.
    pub fn from_questions(questions: &Value) -> Result<Self, InspectionError> {
        let arr = questions.as_array().ok_or_else(|| {
            InspectionError::InvalidInput("template questions must be an array".into())
        })?;

        let mut sections = Vec::with_capacity(arr.len());
        for (order, entry) in arr.iter().enumerate() {
            let key = entry
                .get("section")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    InspectionError::InvalidInput(format!(
                        "template section {order} is missing its machine key"
                    ))
                })?
                .to_string();
            let title = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(&key)
                .to_string();
            let fields = match entry.get("fields") {
                Some(f) => serde_json::from_value::<Vec<FieldSpec>>(f.clone()).map_err(|e| {
                    InspectionError::InvalidInput(format!("bad fields for section {key}: {e}"))
                })?,
                None => Vec::new(),
            };
            sections.push(SectionSpec {
                key,
                title,
                order,
                fields,
            });
        }
        Ok(Self { sections })
    }

    /// The built-in six-section catalogue used when an inspection carries no
    /// template reference.
    pub fn default_catalogue() -> Self {
        Self::from_questions(&default_questions()).expect("built-in catalogue is well-formed")
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, key: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.key == key)
    }

    pub fn is_last(&self, key: &str) -> bool {
        self.index_of(key)
            .map(|i| i + 1 == self.sections.len())
            .unwrap_or(false)
    }

    pub fn next_after(&self, key: &str) -> Option<&SectionSpec> {
        let i = self.index_of(key)?;
        self.sections.get(i + 1)
    }

    pub fn section_keys(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.key.clone()).collect()
    }

    /// Declared field ids for one section, in template order.
    pub fn field_order(&self, key: &str) -> Vec<String> {
        self.section(key)
            .map(|s| s.fields.iter().map(|f| f.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Writer-visible progress after finishing the section at `index`.
    pub fn progress_after(&self, index: usize) -> i16 {
        if self.sections.is_empty() {
            return 0;
        }
        (((index + 1) as f64 / self.sections.len() as f64) * 100.0).round() as i16
    }
}

fn field(id: &str, question: &str) -> Value {
    serde_json::json!({ "id": id, "question": question, "type": "status", "text_required": false, "image_required": true })
}

/// The stock weighbridge questionnaire. Section keys are load-bearing: the
/// engine treats anything outside this alphabet plus `remarks`/`signatures`
/// as a content section too, but the report template is authored against
/// these six.
pub fn default_questions() -> Value {
    serde_json::json!([
        {
            "section": "exterior",
            "title": "Гадна үзлэг",
            "fields": [
                field("platform_plate", "Платформын төмөр хавтан"),
                field("beam", "Хөндлөвч"),
                field("side_rails", "Хажуугийн хашлага"),
                field("approach", "Орох гарах налуу зам"),
                field("paint_condition", "Будгийн байдал"),
            ]
        },
        {
            "section": "indicator",
            "title": "Индикатор",
            "fields": [
                field("display", "Дэлгэц"),
                field("keypad", "Товчлуур"),
                field("cable", "Холбох кабель"),
                field("calibration_seal", "Баталгаажуулалтын лац"),
            ]
        },
        {
            "section": "jbox",
            "title": "Холболтын хайрцаг",
            "fields": [
                field("enclosure", "Хайрцагны битүүмжлэл"),
                field("terminals", "Холболтын клемм"),
                field("moisture", "Чийг орсон эсэх"),
                field("cable_glands", "Кабелийн оролт"),
            ]
        },
        {
            "section": "sensor",
            "title": "Мэдрэгч",
            "fields": [
                field("ball", "Бөмбөлөг тулгуур"),
                field("cup", "Аяга тулгуур"),
                field("load_cell", "Ачааллын мэдрэгч"),
                field("mounting", "Суурилуулалт"),
                field("cable_condition", "Кабелийн байдал"),
            ]
        },
        {
            "section": "foundation",
            "title": "Суурь",
            "fields": [
                field("concrete", "Бетон суурь"),
                field("drainage", "Ус зайлуулах систем"),
                field("bolts", "Бэхэлгээний боолт"),
                field("clearance", "Чөлөөт зай"),
            ]
        },
        {
            "section": "cleanliness",
            "title": "Цэвэрлэгээ",
            "fields": [
                field("platform", "Платформ доогуур"),
                field("pit", "Нүхний цэвэрлэгээ"),
                field("surroundings", "Орчны цэвэрлэгээ"),
            ]
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalogue_has_six_ordered_sections() {
        let cat = TemplateCatalogue::default_catalogue();
        assert_eq!(
            cat.section_keys(),
            vec!["exterior", "indicator", "jbox", "sensor", "foundation", "cleanliness"]
        );
        assert_eq!(cat.section("sensor").unwrap().order, 3);
        assert!(cat.is_last("cleanliness"));
        assert!(!cat.is_last("foundation"));
        assert_eq!(cat.next_after("jbox").unwrap().key, "sensor");
        assert!(cat.next_after("cleanliness").is_none());
    }

    #[test]
    fn field_order_follows_declaration() {
        let cat = TemplateCatalogue::default_catalogue();
        let order = cat.field_order("sensor");
        assert_eq!(order[0], "ball");
        assert_eq!(order.last().unwrap(), "cable_condition");
    }

    #[test]
    fn progress_rounds_to_whole_percent() {
        let cat = TemplateCatalogue::default_catalogue();
        assert_eq!(cat.progress_after(0), 17); // 1/6
        assert_eq!(cat.progress_after(2), 50);
        assert_eq!(cat.progress_after(5), 100);
    }

    #[test]
    fn malformed_questions_are_rejected() {
        let err = TemplateCatalogue::from_questions(&serde_json::json!({"not": "an array"}));
        assert!(err.is_err());

        let err = TemplateCatalogue::from_questions(&serde_json::json!([{"title": "no key"}]));
        assert!(err.is_err());
    }
}
