//! Core traits for document representation and serialization.
//!
//! A document is any serde type whose serialized form is a JSON-like object.
//! This module converts documents to the stored representation
//! ([`bson::Document`]) and back, classifying failures by direction: a value
//! that cannot be written is an [`InvalidDocument`](DocumentStoreError::InvalidDocument),
//! stored content that cannot be read is a [`Decoding`](DocumentStoreError::Decoding) error.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The stored form of a document: an ordered map of field names to values.
pub type Content = bson::Document;

/// Marker trait for values that can be written to and read from a bucket.
///
/// It is implemented for every `Serialize + DeserializeOwned` type, so deriving
/// serde is enough. Field names on the wire are whatever serde produces; pin them
/// with `#[serde(rename = "...")]` or `rename_all` when other systems read the
/// stored documents.
///
/// # Example
///
/// ```ignore
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "lowercase")]
/// pub struct Book {
///     pub isbn: String,
///     pub name: String,
///     pub cost: String,
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<D> Document for D where D: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Extension trait providing conversions between documents and stored content.
///
/// Automatically implemented for all [`Document`] types.
pub trait DocumentExt: Document + Sized {
    /// Converts this document to stored content.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if serialization fails or
    /// the value does not serialize to an object.
    fn to_content(&self) -> DocumentStoreResult<Content>;

    /// Creates a document from stored content.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Decoding`] if the content does not match `Self`.
    fn from_content(content: Content) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_content(&self) -> DocumentStoreResult<Content> {
        to_content(self)
    }

    fn from_content(content: Content) -> DocumentStoreResult<Self> {
        from_content(content)
    }
}

/// Serializes any value into stored content, rejecting non-object values.
pub fn to_content<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<Content> {
    match serialize_to_bson(value) {
        Ok(Bson::Document(content)) => Ok(content),
        Ok(other) => Err(DocumentStoreError::InvalidDocument(format!(
            "expected an object, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(DocumentStoreError::InvalidDocument(e.to_string())),
    }
}

/// Deserializes stored content into `T`.
pub fn from_content<T: DeserializeOwned>(content: Content) -> DocumentStoreResult<T> {
    deserialize_from_bson(Bson::Document(content))
        .map_err(|e| DocumentStoreError::Decoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        #[serde(rename = "isbn")]
        code: String,
        name: String,
        cost: String,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Priced {
        cost: f64,
    }

    fn book() -> Book {
        Book {
            code: "978-1-4919-1889-0".into(),
            name: "Minecraft Modding with Forge".into(),
            cost: "29.99".into(),
        }
    }

    #[test]
    fn test_wire_names_follow_serde_attributes() {
        let content = book().to_content().unwrap();
        let keys: Vec<&str> = content.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["isbn", "name", "cost"]);
        assert_eq!(Book::from_content(content).unwrap(), book());
    }

    #[test]
    fn test_non_object_values_are_rejected() {
        let err = to_content(&"just a string").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err = to_content(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn test_shape_mismatch_is_decoding_error() {
        let content = book().to_content().unwrap();
        let err = from_content::<Priced>(content).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }
}
