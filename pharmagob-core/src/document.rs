//! Typed models stored in a collection.
//!
//! Repositories work on raw BSON documents. A [`Model`] is a serde type bound to a
//! collection name; [`ModelExt`] converts it to and from BSON or JSON.

use bson::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::{RepositoryError, RepositoryResult};

/// A serde type that lives in one collection.
///
/// # Example
///
/// ```ignore
/// use pharmagob_core::document::Model;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Patient {
///     pub curp: String,
///     pub umu_id: String,
/// }
///
/// impl Model for Patient {
///     const COLLECTION: &'static str = "patients";
/// }
/// ```
pub trait Model: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Name of the collection this model is stored in.
    const COLLECTION: &'static str;
}

/// BSON and JSON conversions for every [`Model`].
pub trait ModelExt: Model {
    /// Serializes to a top-level document.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidDocument`] when the model does not serialize to
    /// a document (for example a newtype around a scalar).
    fn to_document(&self) -> RepositoryResult<Document>;

    fn from_document(document: Document) -> RepositoryResult<Self>;

    fn to_json(&self) -> RepositoryResult<Value>;

    fn from_json(value: Value) -> RepositoryResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> RepositoryResult<Document> {
        match bson::ser::serialize_to_bson(self)? {
            bson::Bson::Document(document) => Ok(document),
            other => Err(RepositoryError::InvalidDocument(format!(
                "{} did not serialize to a document: {other}",
                M::COLLECTION
            ))),
        }
    }

    fn from_document(document: Document) -> RepositoryResult<Self> {
        Ok(bson::de::deserialize_from_document(document)?)
    }

    fn to_json(&self) -> RepositoryResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> RepositoryResult<Self> {
        Ok(from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Location {
        umu_id: String,
        label_code: String,
    }

    impl Model for Location {
        const COLLECTION: &'static str = "locations";
    }

    #[test]
    fn model_round_trips_through_bson_and_json() {
        let location = Location { umu_id: "U-1".into(), label_code: "A-01".into() };

        let document = location.to_document().unwrap();
        assert_eq!(document, doc! { "umu_id": "U-1", "label_code": "A-01" });
        assert_eq!(Location::from_document(document).unwrap(), location);

        let value = location.to_json().unwrap();
        assert_eq!(value, json!({ "umu_id": "U-1", "label_code": "A-01" }));
        assert_eq!(Location::from_json(value).unwrap(), location);
    }

    #[test]
    fn scalar_model_is_not_a_document() {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Code(String);

        impl Model for Code {
            const COLLECTION: &'static str = "codes";
        }

        let err = Code("X".into()).to_document().unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidDocument(_)));
    }
}
