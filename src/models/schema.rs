//! 题型 Schema 描述模块
//! 描述生成/批改结果的字段契约，用于提示词构造和模型输出校验

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 字段语义类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
    Object,
}

impl FieldKind {
    /// 提示词中展示给模型的类型名
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::StringArray => "array of strings",
            FieldKind::Object => "object",
        }
    }

    /// 检查 JSON 值是否符合该类型
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::StringArray => value
                .as_array()
                .map(|items| items.iter().all(|v| v.is_string()))
                .unwrap_or(false),
            FieldKind::Object => value.is_object(),
        }
    }
}

/// 单个字段契约
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub description: String,
}

impl FieldSpec {
    pub fn required(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        }
    }
}

/// Schema 描述
///
/// 校验是结构性的：要求的字段必须存在且类型匹配，多余字段不视为违规，
/// 批改结果投影到规范形状时会丢弃多余字段。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    /// 校验 JSON 载荷，返回全部违规项（而不是只报第一个）
    pub fn validate(&self, payload: &Value) -> Result<(), Vec<String>> {
        let object = match payload.as_object() {
            Some(object) => object,
            None => return Err(vec!["payload is not a JSON object".to_string()]),
        };

        let mut violations = Vec::new();
        for field in &self.fields {
            match object.get(&field.name) {
                Some(value) => {
                    if !field.kind.matches(value) {
                        violations.push(format!(
                            "field \"{}\" should be {}, got {}",
                            field.name,
                            field.kind.display_name(),
                            json_type_name(value)
                        ));
                    }
                }
                None if field.required => {
                    violations.push(format!("missing required field \"{}\"", field.name));
                }
                None => {}
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn conforms(&self, payload: &Value) -> bool {
        self.validate(payload).is_ok()
    }

    /// 渲染为提示词中的输出契约说明
    pub fn render_instructions(&self) -> String {
        let mut lines = vec![format!(
            "Output a single JSON object for \"{}\" with the following fields:",
            self.name
        )];
        for field in &self.fields {
            let requirement = if field.required { "required" } else { "optional" };
            lines.push(format!(
                "- \"{}\" ({}, {}): {}",
                field.name,
                field.kind.display_name(),
                requirement,
                field.description
            ));
        }
        lines.push("Output only the JSON object, no other text.".to_string());
        lines.join("\n")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "multiple-choice",
            vec![
                FieldSpec::required("question", FieldKind::String, "题干"),
                FieldSpec::required("options", FieldKind::StringArray, "选项"),
                FieldSpec::required("correct_index", FieldKind::Integer, "正确选项下标"),
                FieldSpec::optional("explanation", FieldKind::String, "解析"),
            ],
        )
    }

    #[test]
    fn test_validate_conformant_payload() {
        let payload = json!({
            "question": "Der Hund ___ im Garten.",
            "options": ["schläft", "schlafen", "schläfst"],
            "correct_index": 0,
        });
        assert!(sample_schema().validate(&payload).is_ok());
    }

    #[test]
    fn test_validate_reports_all_violations() {
        let payload = json!({
            "options": "not-an-array",
            "correct_index": "zero",
        });
        let violations = sample_schema().validate(&payload).unwrap_err();
        assert_eq!(violations.len(), 3);
        assert!(violations[0].contains("question"));
        assert!(violations[1].contains("options"));
        assert!(violations[2].contains("correct_index"));
    }

    #[test]
    fn test_extra_fields_are_not_violations() {
        let payload = json!({
            "question": "q",
            "options": ["a", "b"],
            "correct_index": 1,
            "id": "model-made-this-up",
        });
        assert!(sample_schema().conforms(&payload));
    }

    #[test]
    fn test_non_object_payload() {
        let violations = sample_schema().validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(violations, vec!["payload is not a JSON object".to_string()]);
    }

    #[test]
    fn test_render_instructions_lists_fields() {
        let rendered = sample_schema().render_instructions();
        assert!(rendered.contains("\"question\" (string, required)"));
        assert!(rendered.contains("\"options\" (array of strings, required)"));
        assert!(rendered.contains("Output only the JSON object"));
    }
}
