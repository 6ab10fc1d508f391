//! Config-file token grammar: `#` starts a to-end-of-line comment,
//! single/double quotes group whitespace, and `=`/`:` separate an option
//! from its value the same way whitespace does.

/// Splits `text` into whitespace/`=`/`:`-separated tokens, honoring quotes
/// and `#` comments.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in text.lines() {
        let mut cur = String::new();
        let mut quote: Option<char> = None;
        for c in line.chars() {
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                } else {
                    cur.push(c);
                }
                continue;
            }
            match c {
                '#' => break,
                '\'' | '"' => quote = Some(c),
                ' ' | '\t' | '=' | ':' => {
                    if !cur.is_empty() {
                        tokens.push(std::mem::take(&mut cur));
                    }
                }
                _ => cur.push(c),
            }
        }
        if !cur.is_empty() {
            tokens.push(cur);
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_equals_and_colon() {
        let toks = tokenize("tbar=5 r0:2.5 group geom");
        assert_eq!(toks, vec!["tbar", "5", "r0", "2.5", "group", "geom"]);
    }

    #[test]
    fn strips_comments_to_end_of_line() {
        let toks = tokenize("tbar 5 # this is a comment\nr0 2.5");
        assert_eq!(toks, vec!["tbar", "5", "r0", "2.5"]);
    }

    #[test]
    fn quotes_group_whitespace() {
        let toks = tokenize("olog 'my log file.txt'");
        assert_eq!(toks, vec!["olog", "my log file.txt"]);
    }
}
