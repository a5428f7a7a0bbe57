use rawhttp::{Error, Headers};

#[cfg(test)]
mod field_line_parsing_tests {
    use super::*;

    #[test]
    fn test_valid_single_field_line() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(n, 23); // full line including the CRLF
        assert!(!done);
        assert_eq!(headers.get("Host"), "localhost:42069");
    }

    #[test]
    fn test_extra_value_whitespace_is_trimmed() {
        let mut headers = Headers::new();
        let data = b"Host:   localhost:42069\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(n, 25);
        assert!(!done);
        assert_eq!(headers.get("host"), "localhost:42069");
    }

    #[test]
    fn test_trailing_spaces_count_toward_consumed_length() {
        let mut headers = Headers::new();
        let data = b"Host:   localhost:42069   \r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(n, 28);
        assert!(!done);
        assert_eq!(headers.get("host"), "localhost:42069");
    }

    #[test]
    fn test_two_field_lines_parsed_sequentially() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\nFoo: bar\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();
        assert_eq!(n, 23);
        assert!(!done);

        let (n, done) = headers.parse(&data[n..]).unwrap();
        assert_eq!(n, 10);
        assert!(!done);

        assert_eq!(headers.get("Host"), "localhost:42069");
        assert_eq!(headers.get("Foo"), "bar");
    }

    #[test]
    fn test_repeated_field_name_accumulates() {
        let mut headers = Headers::new();
        let data = b"Example-Field:   Foo, Bar\r\nExample-Field:     Baz\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();
        assert_eq!(n, 27);
        assert!(!done);
        assert_eq!(headers.get("example-field"), "Foo, Bar");

        let (n, done) = headers.parse(&data[n..]).unwrap();
        assert_eq!(n, 24);
        assert!(!done);
        assert_eq!(headers.get("example-field"), "Foo, Bar, Baz");
    }

    #[test]
    fn test_empty_line_reports_done() {
        let mut headers = Headers::new();
        let data = b"Host: localhost\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();
        assert!(!done);

        let (n2, done) = headers.parse(&data[n..]).unwrap();
        assert_eq!(n2, 2);
        assert!(done);
    }

    #[test]
    fn test_partial_line_reports_zero_consumed() {
        let mut headers = Headers::new();

        let (n, done) = headers.parse(b"Host: local").unwrap();

        assert_eq!(n, 0);
        assert!(!done);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_space_inside_field_name_is_rejected() {
        let mut headers = Headers::new();
        let data = b"       Host : localhost:42069       \r\n\r\n";

        let err = headers.parse(data).unwrap_err();

        assert!(matches!(err, Error::InvalidFieldName));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_non_ascii_field_name_is_rejected() {
        let mut headers = Headers::new();
        let data = "H\u{00a9}st: localhost:42069\r\n\r\n".as_bytes();

        let err = headers.parse(data).unwrap_err();

        assert!(matches!(err, Error::InvalidFieldName));
    }

    #[test]
    fn test_empty_field_name_is_rejected() {
        let mut headers = Headers::new();
        let data = b": localhost:42069\r\n\r\n";

        let err = headers.parse(data).unwrap_err();

        assert!(matches!(err, Error::InvalidFieldName));
    }

    #[test]
    fn test_missing_colon_is_rejected() {
        let mut headers = Headers::new();
        let data = b"Host localhost\r\n\r\n";

        let err = headers.parse(data).unwrap_err();

        assert!(matches!(err, Error::MalformedFieldLine));
    }

    #[test]
    fn test_token_punctuation_in_field_name_is_accepted() {
        let mut headers = Headers::new();
        let data = b"X-Custom.Header_1!: value\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(n, 27);
        assert!(!done);
        assert_eq!(headers.get("x-custom.header_1!"), "value");
    }

    #[test]
    fn test_internal_value_whitespace_is_preserved() {
        let mut headers = Headers::new();
        let data = b"User-Agent: curl/8.0 (x86_64 linux)\r\n\r\n";

        headers.parse(data).unwrap();

        assert_eq!(headers.get("user-agent"), "curl/8.0 (x86_64 linux)");
    }
}

#[cfg(test)]
mod header_store_tests {
    use super::*;

    #[test]
    fn test_get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");

        assert_eq!(headers.get("content-type"), "text/plain");
        assert_eq!(headers.get("CONTENT-TYPE"), "text/plain");
        assert_eq!(headers.get("Content-Type"), "text/plain");
    }

    #[test]
    fn test_get_absent_returns_empty_string() {
        let headers = Headers::new();
        assert_eq!(headers.get("missing"), "");
    }

    #[test]
    fn test_set_same_name_joins_with_comma() {
        let mut headers = Headers::new();
        headers.set("Trailer", "X-Content-SHA256");
        headers.set("Trailer", "X-Content-Length");

        assert_eq!(headers.get("trailer"), "X-Content-SHA256, X-Content-Length");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_replace_discards_accumulated_value() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("Content-Type", "text/html");
        headers.replace("Content-Type", "video/mp4");

        assert_eq!(headers.get("content-type"), "video/mp4");
    }

    #[test]
    fn test_remove_deletes_entry() {
        let mut headers = Headers::new();
        headers.set("Content-Length", "42");
        headers.remove("content-length");

        assert_eq!(headers.get("Content-Length"), "");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_iter_walks_every_field() {
        let mut headers = Headers::new();
        headers.set("Host", "localhost");
        headers.set("Connection", "close");

        let mut fields: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        fields.sort();

        assert_eq!(
            fields,
            vec![
                ("connection".to_string(), "close".to_string()),
                ("host".to_string(), "localhost".to_string()),
            ]
        );
    }
}
