//! Delimited text rows.
//!
//! One record per line. A field may be wrapped in double quotes, in which
//! case the delimiter loses its meaning and `""` stands for a literal quote.
//! Records spanning several lines are not supported.

/// Delimiter used for pixel files.
pub const PIXEL_DELIMITER: u8 = b',';

/// Split one line (without its terminator) into fields.
///
/// An empty line yields no fields.
pub fn split_row(line: &str, delimiter: u8) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    let delimiter = delimiter as char;
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
            at_field_start = true;
            continue;
        } else if c == '"' && at_field_start {
            in_quotes = true;
        } else {
            field.push(c);
        }
        at_field_start = false;
    }
    fields.push(field);
    fields
}

/// Join fields into one comma-delimited line, quoting only where needed.
pub fn join_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(PIXEL_DELIMITER as char);
        }
        let field = field.as_ref();
        if needs_quotes(field) {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line
}

fn needs_quotes(field: &str) -> bool {
    field
        .bytes()
        .any(|b| b == PIXEL_DELIMITER || b == b'"' || b == b'\n' || b == b'\r')
}

/// Strip a trailing `\n` or `\r\n`.
pub fn trim_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_row("a,b,c", b','), vec!["a", "b", "c"]);
        assert_eq!(split_row("a,,c,", b','), vec!["a", "", "c", ""]);
        assert_eq!(split_row("10.5;-3.2;x", b';'), vec!["10.5", "-3.2", "x"]);
        assert!(split_row("", b',').is_empty());
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_row(r#"1,"Smith, J.",2"#, b','),
            vec!["1", "Smith, J.", "2"]
        );
        assert_eq!(
            split_row(r#""say ""hi""",x"#, b','),
            vec![r#"say "hi""#, "x"]
        );
        assert_eq!(split_row(r#"ab"c,d"#, b','), vec![r#"ab"c"#, "d"]);
    }

    #[test]
    fn test_join_quotes_when_needed() {
        assert_eq!(join_row(&["a", "b"]), "a,b");
        assert_eq!(join_row(&["1", "Smith, J."]), r#"1,"Smith, J.""#);
        assert_eq!(join_row(&[r#"say "hi""#]), r#""say ""hi""""#);
    }

    #[test]
    fn test_join_then_split_preserves_fields() {
        let fields = vec!["NGC 224", "10.68", "41.27", "a,b", "q\"uote", ""];
        assert_eq!(split_row(&join_row(&fields), b','), fields);
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end("a,b\r\n"), "a,b");
        assert_eq!(trim_line_end("a,b\n"), "a,b");
        assert_eq!(trim_line_end("a,b"), "a,b");
    }
}
