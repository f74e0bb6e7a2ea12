//! `pjson` text serialization and parsing.
//!
//! `to_string` emits minified JSON with object keys in stored (sorted)
//! order; `from_string` is a recursive-descent parser that leaves its
//! target as null on malformed input rather than erroring.

use crate::offset::Offset;
use crate::pas::Pas;

use super::{PJsonTag, obj_insert, push_back, set_array, set_bool, set_int, set_null, set_object, set_real, set_string, set_uint, type_tag};

/// Serializes the value at `off` as minified JSON.
#[must_use]
pub fn to_string(pas: &Pas, off: Offset) -> String {
    let mut out = String::new();
    write_value(pas, off, &mut out);
    out
}

fn write_value(pas: &Pas, off: Offset, out: &mut String) {
    match type_tag(pas, off) {
        PJsonTag::Null => out.push_str("null"),
        PJsonTag::Bool => out.push_str(if super::get_bool(pas, off) { "true" } else { "false" }),
        PJsonTag::Int => out.push_str(&super::get_int(pas, off).to_string()),
        PJsonTag::UInt => out.push_str(&super::get_uint(pas, off).to_string()),
        PJsonTag::Real => {
            let mut buf = ryu::Buffer::new();
            out.push_str(buf.format(super::get_real(pas, off)));
        }
        PJsonTag::String => write_escaped_string(super::get_string(pas, off), out),
        PJsonTag::Array => {
            out.push('[');
            let len = super::size(pas, off);
            for i in 0..len {
                if i > 0 {
                    out.push(',');
                }
                if let Some(elem) = super::at(pas, off, i) {
                    write_value(pas, elem, out);
                }
            }
            out.push(']');
        }
        PJsonTag::Object => {
            out.push('{');
            let keys = super::obj_keys(pas, off);
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped_string(key, out);
                out.push(':');
                if let Some(value_off) = super::obj_find(pas, off, key) {
                    write_value(pas, value_off, out);
                }
            }
            out.push('}');
        }
    }
}

fn write_escaped_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Parses `s` as JSON into `off`, replacing its current value. Returns
/// `true` on success; on malformed input `off` is left as null and `false`
/// is returned, matching the sentinel style the rest of this crate uses
/// instead of propagating a parse error.
pub fn from_string(pas: &mut Pas, off: Offset, s: &str) -> bool {
    let mut chars = s.char_indices().peekable();
    skip_ws(s, &mut chars);
    let ok = parse_value(pas, off, s, &mut chars).is_some();
    if ok {
        skip_ws(s, &mut chars);
        if chars.peek().is_some() {
            set_null(pas, off);
            return false;
        }
    } else {
        set_null(pas, off);
    }
    ok
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn skip_ws(_s: &str, chars: &mut Chars<'_>) {
    while matches!(chars.peek(), Some((_, ' ' | '\t' | '\n' | '\r'))) {
        chars.next();
    }
}

fn parse_value(pas: &mut Pas, off: Offset, s: &str, chars: &mut Chars<'_>) -> Option<()> {
    skip_ws(s, chars);
    match chars.peek().copied() {
        Some((_, '"')) => {
            let text = parse_string_literal(s, chars)?;
            set_string(pas, off, &text);
            Some(())
        }
        Some((_, '{')) => parse_object(pas, off, s, chars),
        Some((_, '[')) => parse_array(pas, off, s, chars),
        Some((_, 't')) => {
            consume_literal(s, chars, "true")?;
            set_bool(pas, off, true);
            Some(())
        }
        Some((_, 'f')) => {
            consume_literal(s, chars, "false")?;
            set_bool(pas, off, false);
            Some(())
        }
        Some((_, 'n')) => {
            consume_literal(s, chars, "null")?;
            set_null(pas, off);
            Some(())
        }
        Some((_, c)) if c == '-' || c.is_ascii_digit() => parse_number(pas, off, s, chars),
        _ => None,
    }
}

fn consume_literal(s: &str, chars: &mut Chars<'_>, literal: &str) -> Option<()> {
    let (start, _) = *chars.peek()?;
    let end = start + literal.len();
    if s.get(start..end) == Some(literal) {
        for _ in 0..literal.chars().count() {
            chars.next();
        }
        Some(())
    } else {
        None
    }
}

fn parse_object(pas: &mut Pas, off: Offset, s: &str, chars: &mut Chars<'_>) -> Option<()> {
    chars.next(); // '{'
    set_object(pas, off);
    skip_ws(s, chars);
    if matches!(chars.peek(), Some((_, '}'))) {
        chars.next();
        return Some(());
    }
    loop {
        skip_ws(s, chars);
        if !matches!(chars.peek(), Some((_, '"'))) {
            return None;
        }
        let key = parse_string_literal(s, chars)?;
        skip_ws(s, chars);
        if !matches!(chars.peek(), Some((_, ':'))) {
            return None;
        }
        chars.next();
        let value_off = obj_insert(pas, off, &key);
        parse_value(pas, value_off, s, chars)?;
        skip_ws(s, chars);
        match chars.peek().copied() {
            Some((_, ',')) => {
                chars.next();
            }
            Some((_, '}')) => {
                chars.next();
                return Some(());
            }
            _ => return None,
        }
    }
}

fn parse_array(pas: &mut Pas, off: Offset, s: &str, chars: &mut Chars<'_>) -> Option<()> {
    chars.next(); // '['
    set_array(pas, off);
    skip_ws(s, chars);
    if matches!(chars.peek(), Some((_, ']'))) {
        chars.next();
        return Some(());
    }
    loop {
        let elem_off = push_back(pas, off);
        parse_value(pas, elem_off, s, chars)?;
        skip_ws(s, chars);
        match chars.peek().copied() {
            Some((_, ',')) => {
                chars.next();
            }
            Some((_, ']')) => {
                chars.next();
                return Some(());
            }
            _ => return None,
        }
    }
}

fn parse_string_literal(s: &str, chars: &mut Chars<'_>) -> Option<String> {
    chars.next(); // opening quote
    let mut out = String::new();
    loop {
        let (_, c) = chars.next()?;
        match c {
            '"' => return Some(out),
            '\\' => {
                let (_, esc) = chars.next()?;
                match esc {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        let high = parse_hex4(chars)?;
                        let code = if (0xD800..=0xDBFF).contains(&high) {
                            if chars.next()?.1 != '\\' || chars.next()?.1 != 'u' {
                                return None;
                            }
                            let low = parse_hex4(chars)?;
                            if !(0xDC00..=0xDFFF).contains(&low) {
                                return None;
                            }
                            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                        } else {
                            high
                        };
                        out.push(char::from_u32(code)?);
                    }
                    _ => return None,
                }
            }
            c => out.push(c),
        }
    }
}

fn parse_hex4(chars: &mut Chars<'_>) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let (_, c) = chars.next()?;
        value = value * 16 + c.to_digit(16)?;
    }
    Some(value)
}

fn parse_number(pas: &mut Pas, off: Offset, s: &str, chars: &mut Chars<'_>) -> Option<()> {
    let (start, _) = *chars.peek()?;
    let mut end = start;
    let mut negative = false;
    let mut is_float = false;

    if matches!(chars.peek(), Some((_, '-'))) {
        negative = true;
        let (i, c) = chars.next()?;
        end = i + c.len_utf8();
    }
    while let Some((i, c)) = chars.peek().copied() {
        if c.is_ascii_digit() {
            chars.next();
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if matches!(chars.peek(), Some((_, '.'))) {
        is_float = true;
        let (i, c) = chars.next()?;
        end = i + c.len_utf8();
        while let Some((i, c)) = chars.peek().copied() {
            if c.is_ascii_digit() {
                chars.next();
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
    }
    if matches!(chars.peek(), Some((_, 'e' | 'E'))) {
        is_float = true;
        let (i, c) = chars.next()?;
        end = i + c.len_utf8();
        if matches!(chars.peek(), Some((_, '+' | '-'))) {
            let (i, c) = chars.next()?;
            end = i + c.len_utf8();
        }
        while let Some((i, c)) = chars.peek().copied() {
            if c.is_ascii_digit() {
                chars.next();
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
    }

    let text = s.get(start..end)?;
    if is_float {
        let value: f64 = text.parse().ok()?;
        set_real(pas, off, value);
    } else if negative {
        let value: i64 = text.parse().ok()?;
        set_int(pas, off, value);
    } else {
        let value: u64 = text.parse().ok()?;
        set_uint(pas, off, value);
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pas::Pas;

    fn roundtrip(s: &str) -> (bool, String) {
        let mut pas = Pas::new();
        let off = super::super::create(&mut pas, None);
        let ok = from_string(&mut pas, off, s);
        (ok, to_string(&pas, off))
    }

    #[test]
    fn object_keys_serialize_in_sorted_order() {
        let mut pas = Pas::new();
        let off = super::super::create(&mut pas, None);
        super::super::set_object(&mut pas, off);
        let c = super::super::obj_insert(&mut pas, off, "c");
        super::super::set_int(&mut pas, c, 3);
        let a = super::super::obj_insert(&mut pas, off, "a");
        super::super::set_int(&mut pas, a, 1);
        let b = super::super::obj_insert(&mut pas, off, "b");
        super::super::set_int(&mut pas, b, 2);
        assert_eq!(to_string(&pas, off), r#"{"a":1,"b":2,"c":3}"#);
    }

    #[test]
    fn array_round_trips() {
        let (ok, out) = roundtrip("[1,2,3]");
        assert!(ok);
        assert_eq!(out, "[1,2,3]");
    }

    #[test]
    fn string_escapes_control_characters() {
        let mut pas = Pas::new();
        let off = super::super::create(&mut pas, None);
        super::super::set_string(&mut pas, off, "a\nb\tc\u{1}d");
        assert_eq!(to_string(&pas, off), r#""a\nb\tcd""#);
    }

    #[test]
    fn negative_integer_is_parsed_as_signed() {
        let (ok, out) = roundtrip("-42");
        assert!(ok);
        assert_eq!(out, "-42");
    }

    #[test]
    fn minus_zero_is_treated_as_integer_zero() {
        let (ok, out) = roundtrip("-0");
        assert!(ok);
        assert_eq!(out, "0");
    }

    #[test]
    fn real_numbers_round_trip_through_ryu() {
        let (ok, out) = roundtrip("3.5");
        assert!(ok);
        assert_eq!(out, "3.5");
    }

    #[test]
    fn unicode_escape_round_trips() {
        let (ok, out) = roundtrip(r#""é""#);
        assert!(ok);
        assert_eq!(out, "\"\u{e9}\"");
    }

    #[test]
    fn surrogate_pair_decodes_to_a_single_utf8_character() {
        let (ok, out) = roundtrip(r#""😀""#);
        assert!(ok);
        assert_eq!(out, "\"\u{1F600}\"");
    }

    #[test]
    fn malformed_input_leaves_target_null() {
        let mut pas = Pas::new();
        let off = super::super::create(&mut pas, None);
        super::super::set_int(&mut pas, off, 7);
        assert!(!from_string(&mut pas, off, "{not json"));
        assert!(super::super::is_null(&pas, off));
    }

    #[test]
    fn trailing_garbage_after_a_valid_value_is_rejected() {
        let mut pas = Pas::new();
        let off = super::super::create(&mut pas, None);
        assert!(!from_string(&mut pas, off, "1 2"));
        assert!(super::super::is_null(&pas, off));
    }

    #[test]
    fn nested_object_round_trips() {
        let (ok, out) = roundtrip(r#"{"a":{"b":[1,2]}}"#);
        assert!(ok);
        assert_eq!(out, r#"{"a":{"b":[1,2]}}"#);
    }
}
