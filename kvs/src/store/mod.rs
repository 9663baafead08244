pub mod editor;
pub mod kvs;
pub mod memory;
pub mod preference;
pub mod value;

pub use editor::Editor;
pub use kvs::Kvs;
pub use memory::InMemoryStore;
pub use preference::PreferenceStore;
pub use value::ValueKind;

use std::collections::BTreeMap;

/// 偏好存储的内存状态: key → 文本值。
/// BTreeMap keeps serialization canonical (keys in lexicographic order).
pub type KvState = BTreeMap<String, String>;

/// Getter coercion: absent text yields the default, present text is returned
/// as-is (strings) or parsed (everything else), and a parse failure yields
/// the default. Never an error.
pub(crate) fn coerce_string(text: Option<&str>, default: &str) -> String {
    match text {
        Some(text) => text.to_string(),
        None => default.to_string(),
    }
}

pub(crate) fn coerce_i32(text: Option<&str>, default: i32) -> i32 {
    text.and_then(ValueKind::parse_i32).unwrap_or(default)
}

pub(crate) fn coerce_i64(text: Option<&str>, default: i64) -> i64 {
    text.and_then(ValueKind::parse_i64).unwrap_or(default)
}

pub(crate) fn coerce_f32(text: Option<&str>, default: f32) -> f32 {
    text.and_then(ValueKind::parse_f32).unwrap_or(default)
}

pub(crate) fn coerce_bool(text: Option<&str>, default: bool) -> bool {
    text.and_then(ValueKind::parse_bool).unwrap_or(default)
}
