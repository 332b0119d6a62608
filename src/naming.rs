//! Naming-convention reconciliation between camel-case field names and
//! snake-case source keys.

use std::borrow::Cow;

/// Alternate (snake-case) form of a camel-case field name.
///
/// Inserts `_` wherever an ASCII lowercase letter is immediately followed by an
/// ASCII uppercase letter, then lowercases the whole string:
///
/// ```rust
/// use brrtbind::naming::alt_form;
///
/// assert_eq!(alt_form("userId"), "user_id");
/// assert_eq!(alt_form("page"), "page");
/// ```
///
/// Only single lowercase-to-uppercase transitions create a boundary, so runs of
/// capitals collapse: `HTTPCode` becomes `httpcode` and `userID` becomes `user_id`.
///
/// Returns a borrowed value when the name has no alternate form.
pub fn alt_form(name: &str) -> Cow<'_, str> {
    let needs_work = name.bytes().any(|b| b.is_ascii_uppercase());
    if !needs_work {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        out.push(c.to_ascii_lowercase());
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(alt_form("userId"), "user_id");
        assert_eq!(alt_form("createdAtUtc"), "created_at_utc");
        assert_eq!(alt_form("id"), "id");
    }

    #[test]
    fn test_already_snake_is_borrowed() {
        assert!(matches!(alt_form("user_id"), Cow::Borrowed("user_id")));
    }

    #[test]
    fn test_acronym_edge_cases() {
        // Capital runs do not split.
        assert_eq!(alt_form("userID"), "user_id");
        assert_eq!(alt_form("HTTPCode"), "httpcode");
        assert_eq!(alt_form("getHTTPResponse"), "get_httpresponse");
        assert_eq!(alt_form("Name"), "name");
    }

    #[test]
    fn test_digits_do_not_create_boundaries() {
        assert_eq!(alt_form("address2Line"), "address2line");
        assert_eq!(alt_form("line2"), "line2");
    }
}
