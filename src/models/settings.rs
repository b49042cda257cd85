use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: i32,
    pub max_upload_bytes: i64,
    pub allow_duplicate_imports: bool,
    pub currency: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub max_upload_bytes: Option<i64>,
    pub allow_duplicate_imports: Option<bool>,
    pub currency: Option<String>,
}
