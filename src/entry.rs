//! Entry-point specifiers — parsing and container-name normalization.
//!
//! Actions designate their entry point as `"Container#method"`. Source files
//! compile to a generated container whose name carries a `Kt` suffix and a
//! capitalized first letter, so user-supplied specifiers are normalized here
//! before lookup. Pure string transforms, no module access.

/// Suffix the toolchain appends to a file-level container.
pub const CONTAINER_SUFFIX: &str = "Kt";

/// Container used when the specifier names no type at all.
pub const DEFAULT_CONTAINER: &str = "MainKt";

/// Method used when the specifier names no method.
pub const DEFAULT_METHOD: &str = "main";

/// A parsed and normalized entry-point specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Normalized container name, e.g. `FooKt` or `pkg.FooKt`.
    pub type_name: String,
    /// Method name, matched against declared functions as a prefix.
    pub method: String,
}

impl EntryPoint {
    /// Parse a raw `main` specifier. Never fails: missing pieces fall back
    /// to [`DEFAULT_CONTAINER`] and [`DEFAULT_METHOD`].
    pub fn parse(main: &str) -> Self {
        let (type_part, method_part) = match main.split_once('#') {
            Some((t, m)) => (t, m),
            None => (main, ""),
        };

        let type_name = if type_part.is_empty() {
            DEFAULT_CONTAINER.to_string()
        } else {
            normalize_container(type_part)
        };

        let method = if method_part.is_empty() {
            DEFAULT_METHOD.to_string()
        } else {
            method_part.to_string()
        };

        Self { type_name, method }
    }

    /// Whether this entry point targets the synthetic file-level container.
    pub fn is_default_container(&self) -> bool {
        self.type_name == DEFAULT_CONTAINER
    }
}

/// Normalize an explicit container name to its compiled form: append the
/// container suffix when absent, then capitalize exactly one character —
/// the first letter after the last package separator, or the first letter
/// overall when the separator is absent or leading.
pub fn normalize_container(name: &str) -> String {
    let mut name = name.to_string();
    if !name.ends_with(CONTAINER_SUFFIX) {
        name.push_str(CONTAINER_SUFFIX);
    }

    match name.rfind('.') {
        Some(i) if i > 0 => capitalize_at(&name, i + 1),
        _ => capitalize_at(&name, 0),
    }
}

/// Uppercase the character starting at `byte_idx`, leaving the rest intact.
/// Out-of-range indices leave the name unchanged rather than panicking
/// (a trailing `.` in the specifier lands here).
fn capitalize_at(name: &str, byte_idx: usize) -> String {
    let Some(rest) = name.get(byte_idx..) else {
        return name.to_string();
    };
    let Some(c) = rest.chars().next() else {
        return name.to_string();
    };

    let mut out = String::with_capacity(name.len());
    out.push_str(&name[..byte_idx]);
    out.extend(c.to_uppercase());
    out.push_str(&rest[c.len_utf8()..]);
    out
}
