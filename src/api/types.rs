use serde::Serialize;
use std::collections::BTreeMap;

/// エラーレスポンス
///
/// `errors`は入力検証エラー時のフィールド別メッセージ、
/// `category`は内部エラー時の失敗したコンポーネント名。
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            errors: None,
            category: None,
        }
    }

    pub fn with_field_errors(mut self, errors: BTreeMap<String, String>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// フィールド別の検証エラーを集める
#[derive(Debug, Default)]
pub(crate) struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub(crate) fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// 必須の文字列フィールド（空白のみも不可）
    pub(crate) fn require_text(&mut self, field: &str, value: Option<String>) -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                self.add(field, format!("{} is required", field));
                String::new()
            }
        }
    }

    pub(crate) fn into_result(self) -> Result<(), BTreeMap<String, String>> {
        if self.0.is_empty() { Ok(()) } else { Err(self.0) }
    }
}
