use crate::dialect::FilterDocument;

/// Shallow merge by top-level key with precedence
/// permanent < base < advanced < contextual.
pub fn merge_filters(
    permanent: &FilterDocument,
    base: &FilterDocument,
    advanced: &FilterDocument,
    contextual: &FilterDocument,
) -> FilterDocument {
    merge_layers([permanent, base, advanced, contextual])
}

/// Later layers overwrite earlier ones key by key.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a FilterDocument>) -> FilterDocument {
    let mut out = FilterDocument::new();
    for layer in layers {
        for (k, v) in layer {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}
