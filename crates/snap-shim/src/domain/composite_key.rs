//! Composite keys: an object type plus ordered attributes folded into one
//! ledger key, so related entries sort together and can be range-scanned.
//!
//! Layout: `\u{0}` `object_type` `\u{0}` (`attribute` `\u{0}`)*

use crate::domain::errors::ShimError;

/// Prefix and separator of composite keys.
pub const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';

/// Upper bound used to close a partial-key range scan.
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

fn validate_part(part: &str) -> Result<(), ShimError> {
    if part.contains(COMPOSITE_KEY_NAMESPACE) || part.contains(MAX_UNICODE_RUNE) {
        return Err(ShimError::InvalidArgument(format!(
            "input {:?} contains a reserved character (U+0000 or U+10FFFF)",
            part
        )));
    }
    Ok(())
}

/// Build a composite key from an object type and attributes.
pub fn create_composite_key<S: AsRef<str>>(
    object_type: &str,
    attributes: &[S],
) -> Result<String, ShimError> {
    validate_part(object_type)?;
    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.as_ref().len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_NAMESPACE);
    for attribute in attributes {
        let attribute = attribute.as_ref();
        validate_part(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    Ok(key)
}

/// Split a composite key back into its object type and attributes.
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), ShimError> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_NAMESPACE)
        .ok_or_else(|| ShimError::InvalidArgument(format!("{:?} is not a composite key", key)))?;

    let mut parts: Vec<String> = body
        .split(COMPOSITE_KEY_NAMESPACE)
        .map(str::to_owned)
        .collect();
    // Every component is terminated by the separator, so the last split is empty.
    if parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    if parts.is_empty() {
        return Err(ShimError::InvalidArgument(format!(
            "{:?} has no object type",
            key
        )));
    }
    let object_type = parts.remove(0);
    Ok((object_type, parts))
}
