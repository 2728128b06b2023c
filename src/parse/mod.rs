// src/parse/mod.rs
//! Delimited-record parsing shared by every dataset loader: delimiter
//! sniffing, quote-aware field splitting, and cell cleanup.

/// Pick the record delimiter from a file's header line.
///
/// The exports come in two flavors, semicolon- and comma-separated.
/// Whichever character occurs more often in the header wins; ties go
/// to `;`. The choice applies to the whole file.
pub fn detect_delimiter(header: &str) -> char {
    let semis = header.matches(';').count();
    let commas = header.matches(',').count();
    if semis >= commas {
        ';'
    } else {
        ','
    }
}

/// Split one line into fields, honoring double-quote quoting.
///
/// A `"` toggles the quoted region, `""` inside quotes emits a literal
/// quote, and the delimiter is treated as data while quoted. A trailing
/// delimiter produces a final empty field. No trimming or further
/// unescaping happens here; callers clean fields separately.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

/// Strip every byte-order mark and surrounding whitespace from a cell.
///
/// Spreadsheet exports scatter BOMs mid-cell, not only at file start,
/// so every occurrence goes.
pub fn clean_field(raw: &str) -> String {
    raw.replace('\u{feff}', "").trim().to_string()
}

/// The non-empty lines of a source file, header first.
pub fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_prefers_semicolon_on_majority_and_ties() {
        assert_eq!(detect_delimiter("a;b,c;d;e"), ';');
        assert_eq!(detect_delimiter("a,b,c;d"), ',');
        assert_eq!(detect_delimiter("a;b,c"), ';');
        assert_eq!(detect_delimiter("plain header"), ';');
    }

    #[test]
    fn split_handles_quoted_delimiter_and_doubled_quote() {
        let fields = split_line(r#""A;B""C";D"#, ';');
        assert_eq!(fields, vec![r#"A;B"C"#.to_string(), "D".to_string()]);
    }

    #[test]
    fn split_trailing_delimiter_yields_empty_field() {
        assert_eq!(split_line("a;b;", ';'), vec!["a", "b", ""]);
    }

    #[test]
    fn split_plain_fields() {
        assert_eq!(split_line("a,b,c", ','), vec!["a", "b", "c"]);
        assert_eq!(split_line("", ','), vec![""]);
    }

    #[test]
    fn split_quoted_region_spans_commas() {
        assert_eq!(
            split_line(r#"x,"1,2,3",y"#, ','),
            vec!["x", "1,2,3", "y"]
        );
    }

    #[test]
    fn clean_field_strips_bom_everywhere_and_trims() {
        assert_eq!(clean_field("\u{feff} AB1234 "), "AB1234");
        assert_eq!(clean_field("AB\u{feff}1234"), "AB1234");
        assert_eq!(clean_field("   "), "");
    }

    #[test]
    fn non_empty_lines_drops_blanks_and_crlf() {
        let lines: Vec<_> = non_empty_lines("a\r\n\r\nb\nc\n").collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }
}
