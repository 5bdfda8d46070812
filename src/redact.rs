//! Obfuscation of personal data before it reaches the logs.

use regex::{NoExpand, Regex};

pub const PII_FIELDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "ssn",
    "password",
    "new_password",
    "reset_token",
];

pub const REDACTION: &str = "***";

pub const SEPARATOR: &str = ";";

/// Replaces the value of every `field=value<separator>` occurrence of the
/// given fields with `redaction`.
pub fn filter_datum(fields: &[&str], redaction: &str, message: &str, separator: &str) -> String {
    let mut message = message.to_string();
    for field in fields {
        let pattern = format!(
            "{}=.*?{}",
            regex::escape(field),
            regex::escape(separator)
        );
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::error!("Error compiling redaction pattern for {}: {}", field, e);
                return redaction.to_string();
            }
        };
        let replacement = format!("{field}={redaction}{separator}");
        message = re
            .replace_all(&message, NoExpand(&replacement))
            .into_owned();
    }
    message
}

/// Renders `pairs` as `key=value;` entries. Values of PII fields never
/// enter the rendered string, and PII fields embedded in other values are
/// filtered afterwards.
pub fn redact_pairs(pairs: &[(&str, &str)]) -> String {
    let message = pairs
        .iter()
        .map(|&(key, value)| {
            let value = if PII_FIELDS.contains(&key) {
                REDACTION
            } else {
                value
            };
            format!("{key}={value}{SEPARATOR}")
        })
        .collect::<Vec<_>>()
        .join(" ");
    filter_datum(PII_FIELDS, REDACTION, &message, SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_datum() {
        let message = "name=egg;email=eggmin@eggsample.com;password=eggcellent;date_of_birth=12/12/1986;";
        assert_eq!(
            filter_datum(&["email", "date_of_birth"], "xxx", message, ";"),
            "name=egg;email=xxx;password=eggcellent;date_of_birth=xxx;"
        );
    }

    #[test]
    fn test_filter_datum_other_separator() {
        let message = "name=bob|email=bob@dylan.com|ssn=000-123-0000|password=bobbyabc|";
        assert_eq!(
            filter_datum(&["password", "ssn"], "***", message, "|"),
            "name=bob|email=bob@dylan.com|ssn=***|password=***|"
        );
    }

    #[test]
    fn test_filter_datum_replacement_is_literal() {
        assert_eq!(
            filter_datum(&["password"], "$1", "password=abc;", ";"),
            "password=$1;"
        );
    }

    #[test]
    fn test_redact_pairs() {
        let line = redact_pairs(&[
            ("email", "me@me.com"),
            ("new_password", "s3cret"),
            ("user_agent", "curl"),
        ]);
        assert_eq!(line, "email=***; new_password=***; user_agent=curl;");
    }

    #[test]
    fn test_redact_pairs_value_containing_separator() {
        let line = redact_pairs(&[
            ("email", "me;@me.com"),
            ("password", "hunter;2secret"),
            ("reset_token", "a;b;c"),
        ]);
        assert_eq!(line, "email=***; password=***; reset_token=***;");
        assert!(!line.contains("2secret"));
        assert!(!line.contains("@me.com"));
    }

    #[test]
    fn test_redact_pairs_embedded_field() {
        let line = redact_pairs(&[("user_agent", "curl;password=abc;")]);
        assert_eq!(line, "user_agent=curl;password=***;;");
    }
}
