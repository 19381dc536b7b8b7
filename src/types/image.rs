//! Image blob type: URI, raw bytes, and preview bytes, with lazy content
//! resolution through an injected [`ContentResolver`].

use std::sync::Arc;

use arrow::array::{Array, BinaryArray, BinaryBuilder, StringArray, StringBuilder, StructArray};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::codec::{column, ArrowCodec};
use crate::content::ContentResolver;
use crate::error::ArrowlabelError;

/// An image referenced by URI, carried as bytes, or both, with optional
/// preview bytes.
///
/// Content access is lazy: the URI is only read when content is requested
/// and no explicit bytes are present. An image with neither URI nor bytes is
/// representable; its content resolves to an explicit absent value rather
/// than an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URI, resolved on demand by a [`ContentResolver`].
    #[serde(default)]
    pub uri: Option<String>,

    /// Explicit image bytes; take precedence over the URI.
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,

    /// Downscaled preview bytes.
    #[serde(default)]
    pub preview_bytes: Option<Vec<u8>>,
}

impl Image {
    /// Creates an image from its three optional parts.
    pub fn new(uri: Option<String>, bytes: Option<Vec<u8>>, preview_bytes: Option<Vec<u8>>) -> Self {
        Self {
            uri,
            bytes,
            preview_bytes,
        }
    }

    /// Creates an image referencing content by URI only.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            bytes: None,
            preview_bytes: None,
        }
    }

    /// Creates an image carrying explicit bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            uri: None,
            bytes: Some(bytes),
            preview_bytes: None,
        }
    }

    /// Sets the preview bytes.
    pub fn with_preview(mut self, preview_bytes: Vec<u8>) -> Self {
        self.preview_bytes = Some(preview_bytes);
        self
    }

    /// Returns the image content.
    ///
    /// Explicit bytes win; otherwise the URI is read through `resolver`. If
    /// neither is present the content is absent, not an error. Resolver
    /// failures propagate unchanged.
    pub fn content(
        &self,
        resolver: &dyn ContentResolver,
    ) -> Result<Option<Vec<u8>>, ArrowlabelError> {
        if let Some(bytes) = &self.bytes {
            return Ok(Some(bytes.clone()));
        }
        if let Some(uri) = &self.uri {
            return resolver.resolve(uri).map(Some);
        }
        Ok(None)
    }

    /// Returns the content as a base64 `data:` URL, or an empty string when
    /// no content is available.
    pub fn url(&self, resolver: &dyn ContentResolver) -> Result<String, ArrowlabelError> {
        match self.content(resolver)? {
            Some(data) => Ok(data_url(&data)),
            None => Ok(String::new()),
        }
    }

    /// Returns the preview bytes as a base64 `data:` URL, or an empty string
    /// when no preview is available.
    pub fn preview_url(&self) -> String {
        match &self.preview_bytes {
            Some(data) => data_url(data),
            None => String::new(),
        }
    }
}

fn data_url(data: &[u8]) -> String {
    format!("data:image;base64,{}", STANDARD.encode(data))
}

impl ArrowCodec for Image {
    const EXTENSION_NAME: &'static str = "arrowlabel.image";

    fn storage_fields() -> Fields {
        Fields::from(vec![
            Field::new("uri", DataType::Utf8, true),
            Field::new("bytes", DataType::Binary, true),
            Field::new("preview_bytes", DataType::Binary, true),
        ])
    }

    fn encode_column(items: &[Option<Self>]) -> Result<StructArray, ArrowlabelError> {
        let mut uri = StringBuilder::new();
        let mut bytes = BinaryBuilder::new();
        let mut preview_bytes = BinaryBuilder::new();

        for item in items {
            match item {
                Some(image) => {
                    uri.append_option(image.uri.as_deref());
                    bytes.append_option(image.bytes.as_deref());
                    preview_bytes.append_option(image.preview_bytes.as_deref());
                }
                None => {
                    uri.append_null();
                    bytes.append_null();
                    preview_bytes.append_null();
                }
            }
        }

        let validity = NullBuffer::from(items.iter().map(Option::is_some).collect::<Vec<bool>>());
        let array = StructArray::try_new(
            Self::storage_fields(),
            vec![
                Arc::new(uri.finish()),
                Arc::new(bytes.finish()),
                Arc::new(preview_bytes.finish()),
            ],
            Some(validity),
        )?;
        Ok(array)
    }

    fn decode_row(array: &StructArray, row: usize) -> Result<Option<Self>, ArrowlabelError> {
        if array.is_null(row) {
            return Ok(None);
        }

        let uri = column::<StringArray>(array, "uri")?;
        let bytes = column::<BinaryArray>(array, "bytes")?;
        let preview_bytes = column::<BinaryArray>(array, "preview_bytes")?;

        Ok(Some(Image {
            uri: (!uri.is_null(row)).then(|| uri.value(row).to_string()),
            bytes: (!bytes.is_null(row)).then(|| bytes.value(row).to_vec()),
            preview_bytes: (!preview_bytes.is_null(row)).then(|| preview_bytes.value(row).to_vec()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver(Vec<u8>);

    impl ContentResolver for StaticResolver {
        fn resolve(&self, _uri: &str) -> Result<Vec<u8>, ArrowlabelError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_bytes_take_precedence_over_uri() {
        let resolver = StaticResolver(b"resolved".to_vec());
        let image = Image::new(Some("a.png".into()), Some(b"inline".to_vec()), None);
        assert_eq!(image.content(&resolver).unwrap(), Some(b"inline".to_vec()));
    }

    #[test]
    fn test_uri_content_is_resolved_lazily() {
        let resolver = StaticResolver(b"resolved".to_vec());
        let image = Image::from_uri("a.png");
        assert_eq!(image.content(&resolver).unwrap(), Some(b"resolved".to_vec()));
    }

    #[test]
    fn test_absent_content_is_not_an_error() {
        let resolver = StaticResolver(Vec::new());
        let image = Image::default();
        assert_eq!(image.content(&resolver).unwrap(), None);
        assert_eq!(image.url(&resolver).unwrap(), "");
        assert_eq!(image.preview_url(), "");
    }

    #[test]
    fn test_url_is_base64_data_uri() {
        let resolver = StaticResolver(Vec::new());
        let image = Image::from_bytes(b"png".to_vec());
        let url = image.url(&resolver).unwrap();
        assert!(url.starts_with("data:image;base64,"));
        assert_eq!(url, format!("data:image;base64,{}", STANDARD.encode(b"png")));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let image = Image::new(Some("a.png".into()), None, Some(b"thumb".to_vec()));
        let row = image.encode().unwrap();
        assert_eq!(Image::decode(&row).unwrap(), Some(image));
    }
}
