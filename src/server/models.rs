use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ThumbnailRequest {
    pub(crate) title: Option<String>,
    pub(crate) keyword: Option<String>,
    pub(crate) bg_color1: Option<String>,
    pub(crate) bg_color2: Option<String>,
    pub(crate) variant: Option<String>,
    pub(crate) format: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageResponse {
    pub(crate) success: bool,
    pub(crate) image: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) success: bool,
    pub(crate) error: String,
}
