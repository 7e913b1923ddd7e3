//! Shape checks for context items crossing into answer generation.

use crate::types::Rejection;
use grounded_knowledge::ContextItem;

/// Anything that can be checked as a context item.
///
/// Typed items always have text; loosely-typed JSON items may be malformed or
/// lack a `text` field.
pub trait ContextText {
    fn context_text(&self) -> Result<&str, Rejection>;
}

impl ContextText for ContextItem {
    fn context_text(&self) -> Result<&str, Rejection> {
        Ok(&self.text)
    }
}

impl ContextText for serde_json::Value {
    fn context_text(&self) -> Result<&str, Rejection> {
        let object = self.as_object().ok_or(Rejection::MalformedItem)?;
        match object.get("text") {
            None => Err(Rejection::MissingText),
            Some(value) => value.as_str().ok_or(Rejection::MalformedItem),
        }
    }
}

impl<T: ContextText + ?Sized> ContextText for &T {
    fn context_text(&self) -> Result<&str, Rejection> {
        (**self).context_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_item_shapes() {
        assert_eq!(json!({"text": "abc"}).context_text(), Ok("abc"));
        assert_eq!(json!("abc").context_text(), Err(Rejection::MalformedItem));
        assert_eq!(json!({"source": "a.pdf"}).context_text(), Err(Rejection::MissingText));
        assert_eq!(json!({"text": 42}).context_text(), Err(Rejection::MalformedItem));
    }

    #[test]
    fn test_typed_item_text() {
        let item = ContextItem::from_document("passage", 0.9, "a.pdf", 1);
        assert_eq!(item.context_text(), Ok("passage"));
    }
}
