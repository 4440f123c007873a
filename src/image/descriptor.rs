//! Fully specified HTTP requests, built before anything is sent.

use crate::error::{PollinateError, Result};
use crate::image::types::ImageFormat;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, Url};

/// The HTTP request an adapter wants executed.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// JSON body, for POST providers.
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    /// A bodyless GET.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A POST with a JSON body.
    pub fn post_json(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// Adds `Authorization: Bearer <key>`.
    pub fn bearer(mut self, key: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", key.trim())).map_err(|_| {
            PollinateError::Validation("API key contains invalid characters".into())
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Adds `Accept: application/json`.
    pub fn accept_json(mut self) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        self
    }

    /// Returns true if the request carries credentials.
    pub fn is_authenticated(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Returns the value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// A provider response reduced to one of the displayable shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedImage {
    /// Remote URL usable directly.
    Url(String),
    /// `data:` URI.
    DataUri(String),
    /// Raw image bytes to be held as a transient object.
    Bytes {
        /// Encoded image.
        data: Vec<u8>,
        /// Detected format.
        format: ImageFormat,
    },
}

/// Parses a base URL, reporting bad overrides as validation errors.
pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| PollinateError::Validation(format!("invalid URL {raw:?}: {e}")))
}

/// Builds a `data:` URI around an already base64-encoded payload.
pub(crate) fn data_uri(format: ImageFormat, base64: &str) -> String {
    format!("data:{};base64,{}", format.mime_type(), base64)
}

/// Checks that bytes decode as an image and returns their format.
pub(crate) fn decode_image(data: &[u8]) -> Result<ImageFormat> {
    if data.is_empty() {
        return Err(PollinateError::Decode("empty image payload".into()));
    }
    ::image::load_from_memory(data).map_err(|e| PollinateError::Decode(e.to_string()))?;
    Ok(ImageFormat::from_magic_bytes(data).unwrap_or_default())
}

#[cfg(test)]
pub(crate) mod test_support {
    /// A small valid PNG.
    pub fn tiny_png() -> Vec<u8> {
        let img = ::image::RgbaImage::from_pixel(2, 2, ::image::Rgba([255, 0, 0, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_marks_authenticated() {
        let url = parse_url("https://example.com/x").unwrap();
        let desc = RequestDescriptor::get(url.clone());
        assert!(!desc.is_authenticated());

        let desc = RequestDescriptor::get(url).bearer(" sk-test ").unwrap();
        assert!(desc.is_authenticated());
        assert_eq!(desc.headers[AUTHORIZATION], "Bearer sk-test");
    }

    #[test]
    fn test_bearer_rejects_control_characters() {
        let url = parse_url("https://example.com/x").unwrap();
        let err = RequestDescriptor::get(url).bearer("bad\nkey").unwrap_err();
        assert!(matches!(err, PollinateError::Validation(_)));
    }

    #[test]
    fn test_decode_image_accepts_png() {
        let png = test_support::tiny_png();
        assert_eq!(decode_image(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(matches!(
            decode_image(b"<html>not an image</html>"),
            Err(PollinateError::Decode(_))
        ));
        assert!(matches!(decode_image(&[]), Err(PollinateError::Decode(_))));
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(
            data_uri(ImageFormat::Png, "AQID"),
            "data:image/png;base64,AQID"
        );
    }
}
