//! Line parser - Splits raw input into a keyword and its arguments

/// One line of input, split for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// First whitespace-delimited token, lowercased
    pub keyword: String,
    /// Everything after the keyword and its separator, verbatim
    pub arguments: String,
}

impl ParsedLine {
    pub fn is_empty(&self) -> bool {
        self.keyword.is_empty()
    }
}

/// Parse a line typed in a channel
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim_start();

    match line.find(char::is_whitespace) {
        Some(index) => {
            let (keyword, rest) = line.split_at(index);
            let mut chars = rest.chars();
            chars.next();
            ParsedLine {
                keyword: keyword.to_lowercase(),
                arguments: chars.as_str().to_string(),
            }
        }
        None => ParsedLine {
            keyword: line.to_lowercase(),
            arguments: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_is_lowercased_and_arguments_kept_verbatim() {
        let parsed = parse_line("Hello How are  you doing?");
        assert_eq!(parsed.keyword, "hello");
        assert_eq!(parsed.arguments, "How are  you doing?");
    }

    #[test]
    fn single_token_has_no_arguments() {
        let parsed = parse_line("  version");
        assert_eq!(parsed.keyword, "version");
        assert_eq!(parsed.arguments, "");
    }

    #[test]
    fn blank_line_is_empty() {
        assert!(parse_line("").is_empty());
        assert!(parse_line("   \t ").is_empty());
    }

    #[test]
    fn only_the_first_separator_is_consumed() {
        let parsed = parse_line("echo\t  indented");
        assert_eq!(parsed.keyword, "echo");
        assert_eq!(parsed.arguments, "  indented");
    }
}
