/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            var_name.push(c);
        }

        match (closed, std::env::var(&var_name)) {
            (true, Ok(val)) if !var_name.is_empty() => result.push_str(&val),
            (true, _) => {
                result.push_str("${");
                result.push_str(&var_name);
                result.push('}');
            },
            // Unterminated placeholder, emit what we consumed.
            (false, _) => {
                result.push_str("${");
                result.push_str(&var_name);
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn substitutes_known_var() {
        unsafe { std::env::set_var("PALAVER_TEST_TABLE", "chat_sessions") };
        assert_eq!(
            substitute_env("table_name = \"${PALAVER_TEST_TABLE}\""),
            "table_name = \"chat_sessions\""
        );
        unsafe { std::env::remove_var("PALAVER_TEST_TABLE") };
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${PALAVER_NONEXISTENT_XYZ}"),
            "${PALAVER_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env("url = ${DB"), "url = ${DB");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("price: $5"), "price: $5");
    }
}
