//! Parse collected response header lines.

/// One raw header line as text. Bytes outside UTF-8 are percent-encoded so a
/// `Location` sent in Latin-1 or similar still yields a usable URL.
pub(crate) fn header_line(data: &[u8]) -> String {
    let line = match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => data
            .iter()
            .map(|&b| {
                if b.is_ascii() {
                    (b as char).to_string()
                } else {
                    format!("%{:02X}", b)
                }
            })
            .collect(),
    };
    line.trim_end().to_string()
}

/// `Location` value of the last response in `lines`.
///
/// libcurl hands over every header line including status lines; a new status
/// line starts a new header block (e.g. after `100 Continue`).
pub(crate) fn parse_location(lines: &[String]) -> Option<String> {
    let mut location = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            location = None;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("location") {
                location = Some(value.trim().to_string());
            }
        }
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn location_is_case_insensitive() {
        let l = lines(&[
            "HTTP/1.1 302 Found",
            "content-type: text/html",
            "LOCATION: https://dest.example/a?b=c",
            "",
        ]);
        assert_eq!(parse_location(&l).as_deref(), Some("https://dest.example/a?b=c"));
    }

    #[test]
    fn location_value_keeps_colons() {
        let l = lines(&["HTTP/1.1 301 Moved", "Location: http://h.example:8080/x"]);
        assert_eq!(parse_location(&l).as_deref(), Some("http://h.example:8080/x"));
    }

    #[test]
    fn no_location_header() {
        let l = lines(&["HTTP/1.1 200 OK", "Content-Length: 3"]);
        assert!(parse_location(&l).is_none());
    }

    #[test]
    fn only_last_response_counts() {
        let l = lines(&[
            "HTTP/1.1 302 Found",
            "Location: /first",
            "",
            "HTTP/1.1 200 OK",
            "Server: test",
        ]);
        assert!(parse_location(&l).is_none());
    }

    #[test]
    fn non_utf8_location_is_kept_percent_encoded() {
        let raw: &[u8] = b"Location: https://dest.example/caf\xe9?q=1\r\n";
        let l = vec![
            "HTTP/1.1 302 Found".to_string(),
            header_line(raw),
        ];
        assert_eq!(
            parse_location(&l).as_deref(),
            Some("https://dest.example/caf%E9?q=1")
        );
    }

    #[test]
    fn utf8_header_line_is_trimmed() {
        assert_eq!(header_line(b"Location: /a\r\n"), "Location: /a");
    }
}
