//! Render kind and image format
//!
//! The kind comes from the upload path, the format from the declared
//! `Content-Type`. Together they name the output file.

use std::fmt;

/// Which render a client is returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Image,
    Depth,
}

impl RenderKind {
    /// Match one of the two upload paths
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/return/image" => Some(Self::Image),
            "/return/depth" => Some(Self::Depth),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Depth => "depth",
        }
    }
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted upload encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Exact match on the header value; parameters are not accepted
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// File extension including the leading dot
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
        }
    }

    pub const fn data_url_prefix(self) -> &'static str {
        match self {
            Self::Jpeg => "data:image/jpeg;base64,",
            Self::Png => "data:image/png;base64,",
        }
    }
}
