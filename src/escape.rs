//! Backslash escape decoding for digest output.
//!
//! Model output sometimes carries literal `\n` or `\u00e9` sequences instead
//! of the characters themselves. [`decode_escapes`] turns them back into text.
//! Sequences it does not recognise are kept verbatim.

use std::iter::Peekable;
use std::str::Chars;

pub fn decode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };

        let simple = match next {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            'a' => Some('\u{07}'),
            'b' => Some('\u{08}'),
            'f' => Some('\u{0C}'),
            'v' => Some('\u{0B}'),
            _ => None,
        };
        if let Some(decoded) = simple {
            chars.next();
            out.push(decoded);
            continue;
        }

        match next {
            // Line continuation.
            '\n' => {
                chars.next();
            }
            '0'..='7' => {
                let digits = take_digits(&mut chars, 3, 8);
                push_code_point(&mut out, &digits, 8);
            }
            'x' | 'u' | 'U' => {
                chars.next();
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits = take_digits(&mut chars, width, 16);
                if digits.len() == width && push_code_point(&mut out, &digits, 16) {
                    continue;
                }
                out.push('\\');
                out.push(next);
                out.push_str(&digits);
            }
            _ => out.push('\\'),
        }
    }

    out
}

fn take_digits(chars: &mut Peekable<Chars<'_>>, max: usize, radix: u32) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek().copied() {
            Some(d) if d.is_digit(radix) => {
                digits.push(d);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

fn push_code_point(out: &mut String, digits: &str, radix: u32) -> bool {
    match u32::from_str_radix(digits, radix).ok().and_then(char::from_u32) {
        Some(c) => {
            out.push(c);
            true
        }
        None => false,
    }
}
