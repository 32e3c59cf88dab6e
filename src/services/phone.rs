pub const COUNTRY_CODE: &str = "254";
const TRUNK_PREFIX: char = '0';

/// Rewrites a subscriber number into the `2547XXXXXXXX` form Daraja expects.
/// Anything that matches none of the rules is returned trimmed but otherwise
/// untouched.
pub fn format_phone_number(phone: &str) -> String {
    let phone = phone.trim();
    let phone = phone.strip_prefix('+').unwrap_or(phone);

    if let Some(rest) = phone.strip_prefix(TRUNK_PREFIX) {
        return format!("{COUNTRY_CODE}{rest}");
    }

    let is_subscriber_number = phone.len() == 9 && phone.bytes().all(|b| b.is_ascii_digit());
    if is_subscriber_number && !phone.starts_with(COUNTRY_CODE) {
        return format!("{COUNTRY_CODE}{phone}");
    }

    phone.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_format() {
        assert_eq!(format_phone_number("0712345678"), "254712345678");
    }

    #[test]
    fn plus_prefixed_international() {
        assert_eq!(format_phone_number("+254712345678"), "254712345678");
    }

    #[test]
    fn bare_subscriber_number() {
        assert_eq!(format_phone_number("712345678"), "254712345678");
        assert_eq!(format_phone_number("110345678"), "254110345678");
    }

    #[test]
    fn already_international_is_unchanged() {
        assert_eq!(format_phone_number("254712345678"), "254712345678");
        let once = format_phone_number("0712345678");
        assert_eq!(format_phone_number(&once), once);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(format_phone_number("  0712345678 "), "254712345678");
    }

    #[test]
    fn malformed_input_passes_through() {
        assert_eq!(format_phone_number("phone"), "phone");
        assert_eq!(format_phone_number("12345"), "12345");
        assert_eq!(format_phone_number("71234567a"), "71234567a");
        assert_eq!(format_phone_number(""), "");
    }
}
