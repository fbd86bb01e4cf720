//! `Content-Disposition` for user-supplied filenames (RFC 6266 / RFC 8187)

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything but RFC 3986 unreserved characters gets escaped
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn encode_filename(name: &str) -> String {
    utf8_percent_encode(name, FILENAME_ENCODE_SET).to_string()
}

/// `attachment; filename*=UTF-8''<percent-encoded name>`
pub fn content_disposition(name: &str) -> String {
    format!("attachment; filename*=UTF-8''{}", encode_filename(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;
    use proptest::prelude::*;

    #[test]
    fn test_plain_name_is_untouched() {
        assert_eq!(encode_filename("report-2024_v1.pdf"), "report-2024_v1.pdf");
    }

    #[test]
    fn test_spaces_and_unicode_are_escaped() {
        assert_eq!(encode_filename("tài liệu.pdf"), "t%C3%A0i%20li%E1%BB%87u.pdf");
    }

    #[test]
    fn test_path_separators_and_quotes_are_escaped() {
        assert_eq!(encode_filename("../etc/passwd"), "..%2Fetc%2Fpasswd");
        assert_eq!(encode_filename("a\"b;c"), "a%22b%3Bc");
    }

    #[test]
    fn test_header_value() {
        assert_eq!(
            content_disposition("Giáo trình.pdf"),
            "attachment; filename*=UTF-8''Gi%C3%A1o%20tr%C3%ACnh.pdf"
        );
    }

    proptest! {
        #[test]
        fn prop_encoded_name_is_header_safe(name in "\\PC{0,40}") {
            let encoded = encode_filename(&name);
            prop_assert!(encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"-_.~%".contains(&b)));
            prop_assert_eq!(percent_decode_str(&encoded).decode_utf8().unwrap(), name.as_str());
        }
    }
}
