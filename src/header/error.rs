/// Errors produced while decoding or encoding an ISMRMRD XML header
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// The document is not well-formed XML or does not follow the header schema
    #[error("Malformed header document: {0}")]
    MalformedDocument(String),

    /// The in-memory header cannot be represented in the XML schema
    #[error("Header encoding error: {0}")]
    EncodingError(String),
}

impl HeaderError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        HeaderError::MalformedDocument(message.into())
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        HeaderError::EncodingError(message.into())
    }
}

impl From<quick_xml::Error> for HeaderError {
    fn from(e: quick_xml::Error) -> Self {
        HeaderError::MalformedDocument(format!("XML parsing error: {}", e))
    }
}

impl From<quick_xml::events::attributes::AttrError> for HeaderError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        HeaderError::MalformedDocument(format!("Invalid attribute: {}", e))
    }
}

impl From<std::str::Utf8Error> for HeaderError {
    fn from(e: std::str::Utf8Error) -> Self {
        HeaderError::MalformedDocument(format!("UTF-8 encoding error: {}", e))
    }
}
