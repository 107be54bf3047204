// Tenant namespace derivation
// Every backend operation is scoped by the key this module produces


use std::fmt::Write;

const NAMESPACE_PREFIX: &str = "user_";

/// Derive the backend-safe collection key for a tenant.
///
/// Deterministic and injective: ASCII alphanumerics pass through, every
/// other byte of the UTF-8 encoding becomes `_xx` (lowercase hex). The
/// substitution is reversible rather than a hash so namespaces stay
/// human-debuggable.
#[inline]
pub fn namespace_for(user_id: &str) -> String {
    let mut namespace = String::with_capacity(NAMESPACE_PREFIX.len() + user_id.len());
    namespace.push_str(NAMESPACE_PREFIX);

    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() {
            namespace.push(char::from(byte));
        } else {
            // Infallible for String targets
            let _ = write!(namespace, "_{byte:02x}");
        }
    }

    namespace
}

/// Invert [`namespace_for`], for diagnostics.
///
/// Returns `None` for strings this module did not produce.
#[inline]
pub fn user_id_for(namespace: &str) -> Option<String> {
    let encoded = namespace.strip_prefix(NAMESPACE_PREFIX)?;

    let mut bytes = Vec::with_capacity(encoded.len());
    let mut chars = encoded.bytes();

    while let Some(byte) = chars.next() {
        if byte == b'_' {
            let high = chars.next()?;
            let low = chars.next()?;
            let hex = [high, low];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else if byte.is_ascii_alphanumeric() {
            bytes.push(byte);
        } else {
            return None;
        }
    }

    String::from_utf8(bytes).ok()
}
