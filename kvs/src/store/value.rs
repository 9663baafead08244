//! The scalar kinds a store can hold, and the textual representation they
//! share on disk. Values are persisted as text (decimal for numerics,
//! `true`/`false` for bools), which keeps the on-disk format type-agnostic:
//! readers coerce through the getter they call, and a value that fails to
//! parse as the requested kind falls back to the caller's default.

/// A typed scalar value, tagged by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    String(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Bool(bool),
}

impl ValueKind {
    /// The canonical textual representation persisted on disk.
    pub fn render(&self) -> String {
        match self {
            ValueKind::String(v) => v.clone(),
            ValueKind::Int32(v) => v.to_string(),
            ValueKind::Int64(v) => v.to_string(),
            ValueKind::Float32(v) => v.to_string(),
            ValueKind::Bool(v) => v.to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ValueKind::String(_) => "string",
            ValueKind::Int32(_) => "i32",
            ValueKind::Int64(_) => "i64",
            ValueKind::Float32(_) => "f32",
            ValueKind::Bool(_) => "bool",
        }
    }

    pub fn parse_i32(text: &str) -> Option<i32> {
        text.parse().ok()
    }

    pub fn parse_i64(text: &str) -> Option<i64> {
        text.parse().ok()
    }

    pub fn parse_f32(text: &str) -> Option<f32> {
        text.parse().ok()
    }

    /// Strict but case-insensitive: only `true`/`false` in any casing parse.
    pub fn parse_bool(text: &str) -> Option<bool> {
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
