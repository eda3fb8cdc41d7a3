//! Relay 端的錯誤與 HTTP 回應對應
//!
//! 失敗時回傳純文字訊息：請求格式錯誤為 400，其餘下游失敗為 500。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("malformed relay request: {0}")]
    BadRequest(String),

    #[error("upstream responded with status {status}")]
    UpstreamStatus { status: u16 },

    #[error("upstream call failed: {0}")]
    Transport(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamStatus { .. } | RelayError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
