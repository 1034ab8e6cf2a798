use rustc_hash::FxHashMap;
use serde_json::Value;

/// Fresh map for the extra channel or a `NodePartial.extra` delta.
///
/// ```
/// use threadloom::utils::collections::new_extra_map;
/// use serde_json::json;
///
/// let mut extra = new_extra_map();
/// extra.insert("pending_payment".to_string(), json!(true));
/// ```
#[must_use]
pub fn new_extra_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}
