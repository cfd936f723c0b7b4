use axum::http::{HeaderMap, header};

/// Representation negotiated from the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    Html,
    Json,
}

impl ResponseFormat {
    /// JSON only when the client lists `application/json` before any HTML
    /// or wildcard type; everything else gets HTML.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
            return ResponseFormat::Html;
        };

        for entry in accept.split(',') {
            let media = entry.split(';').next().unwrap_or_default().trim();
            match media {
                "application/json" => return ResponseFormat::Json,
                "text/html" | "application/xhtml+xml" | "*/*" | "text/*" => {
                    return ResponseFormat::Html;
                }
                _ => {}
            }
        }
        ResponseFormat::Html
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Html => "html",
            ResponseFormat::Json => "json",
        }
    }
}
