//! Lexical splitting of formula text into classified fragments
//!
//! The tokenizer only splits and validates shape; mapping fragments onto
//! operators, functions, constants and variables happens in the parser.

use crate::error::{CalcError, Result};

/// One lexical fragment with its byte offset in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub start: usize,
}

impl Fragment {
    fn new(text: impl Into<String>, start: usize) -> Self {
        Self {
            text: text.into(),
            start,
        }
    }
}

/// Split a formula into fragments
///
/// Recognized shapes:
/// - numbers: `12`, `3.5`, `1.2e-3` (exponent requires a leading mantissa)
/// - radix literals: `&H1F` (hex), `&B1010` (binary)
/// - text literals: `$"..."`, retained verbatim including the marker and
///   quotes
/// - two-character operators `<=` `>=` `<>`, then single-character
///   operators and punctuation
/// - identifiers: letter or `_` start, then letters, digits, `_` and `.`
pub fn tokenize(source: &str) -> Result<Vec<Fragment>> {
    let chars: Vec<char> = source.chars().collect();
    let mut fragments = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i)) {
            let (fragment, next) = scan_number(&chars, i)?;
            fragments.push(fragment);
            i = next;
        } else if c == '&' {
            let (fragment, next) = scan_radix(&chars, i)?;
            fragments.push(fragment);
            i = next;
        } else if c == '$' {
            let (fragment, next) = scan_text(&chars, i)?;
            fragments.push(fragment);
            i = next;
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            let mut j = i;
            while j < chars.len()
                && (chars[j].is_alphanumeric() || chars[j] == '_' || chars[j] == '.')
            {
                j += 1;
            }
            fragments.push(Fragment::new(collect(&chars, start, j), start));
            i = j;
        } else if c == '<' && matches!(chars.get(i + 1), Some('=') | Some('>')) {
            fragments.push(Fragment::new(collect(&chars, i, i + 2), i));
            i += 2;
        } else if c == '>' && chars.get(i + 1) == Some(&'=') {
            fragments.push(Fragment::new(">=", i));
            i += 2;
        } else if "+-*/^()<>=,;".contains(c) {
            fragments.push(Fragment::new(c.to_string(), i));
            i += 1;
        } else {
            return Err(CalcError::lex(format!("unexpected character '{}'", c), i));
        }
    }

    Ok(fragments)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

fn collect(chars: &[char], from: usize, to: usize) -> String {
    chars[from..to].iter().collect()
}

/// Scan an integer or floating-point literal, with optional `e`/`E` exponent
fn scan_number(chars: &[char], start: usize) -> Result<(Fragment, usize)> {
    let mut i = start;
    let mut seen_dot = false;

    while i < chars.len() {
        match chars[i] {
            d if d.is_ascii_digit() => i += 1,
            '.' if !seen_dot => {
                seen_dot = true;
                i += 1;
            }
            'e' | 'E' => {
                let mut j = i + 1;
                if matches!(chars.get(j), Some('+') | Some('-')) {
                    j += 1;
                }
                if !chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                    return Err(CalcError::lex("malformed exponent", i));
                }
                while chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                    j += 1;
                }
                i = j;
                break;
            }
            _ => break,
        }
    }

    Ok((Fragment::new(collect(chars, start, i), start), i))
}

/// Scan a `&H`/`&B` radix literal
fn scan_radix(chars: &[char], start: usize) -> Result<(Fragment, usize)> {
    let marker = chars
        .get(start + 1)
        .map(|c| c.to_ascii_uppercase())
        .ok_or_else(|| CalcError::lex("dangling '&'", start))?;
    let digit_ok: fn(char) -> bool = match marker {
        'H' => |c| c.is_ascii_hexdigit(),
        'B' => |c| c == '0' || c == '1',
        _ => return Err(CalcError::lex("expected 'H' or 'B' after '&'", start)),
    };

    let mut i = start + 2;
    while chars.get(i).copied().is_some_and(digit_ok) {
        i += 1;
    }
    if i == start + 2 {
        return Err(CalcError::lex("radix literal has no digits", start));
    }
    Ok((Fragment::new(collect(chars, start, i), start), i))
}

/// Scan a `$"..."` text literal, kept verbatim for the parser
fn scan_text(chars: &[char], start: usize) -> Result<(Fragment, usize)> {
    if chars.get(start + 1) != Some(&'"') {
        return Err(CalcError::lex("expected '\"' after '$'", start));
    }
    let mut i = start + 2;
    while i < chars.len() {
        if chars[i] == '"' {
            return Ok((Fragment::new(collect(chars, start, i + 1), start), i + 1));
        }
        i += 1;
    }
    Err(CalcError::lex("unterminated text literal", start))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|f| f.text)
            .collect()
    }

    #[test]
    fn test_splits_arithmetic() {
        assert_eq!(texts("2+3*4"), vec!["2", "+", "3", "*", "4"]);
        assert_eq!(texts("(a + b) / c"), vec!["(", "a", "+", "b", ")", "/", "c"]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("3.5"), vec!["3.5"]);
        assert_eq!(texts("1.2e-3"), vec!["1.2e-3"]);
        assert_eq!(texts("2E5+1"), vec!["2E5", "+", "1"]);
        assert_eq!(texts(".5"), vec![".5"]);
        // A second dot terminates the number and starts an identifier tail
        assert!(tokenize("1.2.3").is_ok());
    }

    #[test]
    fn test_radix_literals() {
        assert_eq!(texts("&HFF + &B101"), vec!["&HFF", "+", "&B101"]);
        assert!(matches!(tokenize("&H"), Err(CalcError::Lex { .. })));
        assert!(matches!(tokenize("&Q1"), Err(CalcError::Lex { .. })));
    }

    #[test]
    fn test_text_literals() {
        assert_eq!(texts("$\"hello world\""), vec!["$\"hello world\""]);
        assert!(matches!(
            tokenize("$\"no end"),
            Err(CalcError::Lex { .. })
        ));
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(texts("a<=b"), vec!["a", "<=", "b"]);
        assert_eq!(texts("a>=b"), vec!["a", ">=", "b"]);
        assert_eq!(texts("a<>b"), vec!["a", "<>", "b"]);
        assert_eq!(texts("a<b>c"), vec!["a", "<", "b", ">", "c"]);
    }

    #[test]
    fn test_identifiers_with_dots() {
        assert_eq!(
            texts("plant.line1.flow_rate + 2"),
            vec!["plant.line1.flow_rate", "+", "2"]
        );
    }

    #[test]
    fn test_function_call_shape() {
        assert_eq!(
            texts("WINDOWAVG(x, 60000)"),
            vec!["WINDOWAVG", "(", "x", ",", "60000", ")"]
        );
    }

    #[test]
    fn test_positions() {
        let frags = tokenize("ab + cd").unwrap();
        assert_eq!(frags[0].start, 0);
        assert_eq!(frags[1].start, 3);
        assert_eq!(frags[2].start, 5);
    }

    #[test]
    fn test_rejects_unknown_character() {
        match tokenize("a # b") {
            Err(CalcError::Lex { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected lex error, got {:?}", other),
        }
    }
}
