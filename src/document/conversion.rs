use super::definition::Document;
use crate::error::ConversionError;

/// A trait for custom data models that can be converted into a flowcanvas `Document`.
///
/// This is the extension point for loading flows saved by other editors. By
/// implementing this trait on your own structs, you provide a translation layer
/// from your wire format into the canonical node/connection model.
///
/// # Example
///
/// ```rust,no_run
/// use flowcanvas::prelude::*;
/// use flowcanvas::error::ConversionError;
///
/// struct MyStep { id: String, kind: String }
/// struct MyFlow { steps: Vec<MyStep> }
///
/// impl IntoDocument for MyFlow {
///     fn into_document(self) -> std::result::Result<Document, ConversionError> {
///         let nodes = self
///             .steps
///             .into_iter()
///             .map(|step| Node::new(step.id, step.kind))
///             .collect();
///         Ok(Document { nodes, connections: vec![], groups: vec![] })
///     }
/// }
/// ```
pub trait IntoDocument {
    /// Consumes the object and converts it into a flowcanvas document.
    fn into_document(self) -> Result<Document, ConversionError>;
}

impl IntoDocument for Document {
    fn into_document(self) -> Result<Document, ConversionError> {
        Ok(self)
    }
}

impl IntoDocument for serde_json::Value {
    fn into_document(self) -> Result<Document, ConversionError> {
        serde_json::from_value(self).map_err(|e| ConversionError::ValidationError(e.to_string()))
    }
}
