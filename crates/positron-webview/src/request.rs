//! What a window is asked to display.

use std::path::Path;

use positron_common::WindowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Navigate to a URL (`http(s)://`, `file://`, ...).
    Url(String),
    /// Render an HTML document. Relative references resolve against
    /// `base_url` when the engine supports it.
    Html {
        html: String,
        base_url: Option<String>,
    },
}

impl LoadRequest {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn html(html: impl Into<String>, base_url: Option<String>) -> Self {
        Self::Html {
            html: html.into(),
            base_url,
        }
    }

    /// A local file as a `file://` URL. The file must exist.
    pub fn file(path: &Path) -> Result<Self, WindowError> {
        if !path.is_file() {
            return Err(WindowError::ContentNotFound(path.to_path_buf()));
        }
        let absolute = path
            .canonicalize()
            .map_err(|_| WindowError::ContentNotFound(path.to_path_buf()))?;
        let url = url::Url::from_file_path(&absolute)
            .map_err(|()| WindowError::ContentNotFound(path.to_path_buf()))?;
        Ok(Self::Url(url.to_string()))
    }

    /// URL the engine reports for this request.
    pub fn display_url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Html {
                base_url: Some(base),
                ..
            } => base,
            Self::Html { base_url: None, .. } => "about:blank",
        }
    }
}
