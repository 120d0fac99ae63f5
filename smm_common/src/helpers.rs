/// Parse a boolean flag from a stored string value, or return the given default otherwise.
///
/// Settings rows and environment variables both store booleans as text, with the usual zoo of spellings.
pub fn parse_boolean_flag(value: Option<&str>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod test {
    use super::parse_boolean_flag;

    #[test]
    fn boolean_spellings() {
        assert!(parse_boolean_flag(Some("true"), false));
        assert!(parse_boolean_flag(Some("YES"), false));
        assert!(parse_boolean_flag(Some(" 1 "), false));
        assert!(!parse_boolean_flag(Some("off"), true));
        assert!(!parse_boolean_flag(Some("0"), true));
        assert!(parse_boolean_flag(Some("maybe"), true));
        assert!(!parse_boolean_flag(None, false));
    }
}
