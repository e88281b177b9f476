use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use nom::bytes::complete::{take_till1, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, map, rest};
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};

/// Parse a run of non-whitespace characters
pub fn parse_token(i: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(i)
}

/// Parse a whole token as an unsigned integer
pub fn parse_uint_token(token: &str) -> Option<u32> {
    let result: IResult<&str, u32> = all_consuming(nom::character::complete::u32).parse(token);
    result.ok().map(|(_, value)| value)
}

/// Parse `<lhs> = <rhs>` where `lhs` is a single token.
/// The right hand side is returned untrimmed at the end.
pub fn parse_assignment(i: &str) -> IResult<&str, (&str, &str)> {
    (
        preceded(space0, parse_token),
        preceded((space1, char('='), space1), rest),
    )
        .parse(i)
}

/// Parse `[Name]` with optional surrounding blanks
pub fn parse_section_header(i: &str) -> IResult<&str, &str> {
    terminated(
        delimited(
            (space0, char('[')),
            map(take_while1(|c| c != ']'), str::trim),
            char(']'),
        ),
        space0,
    )
    .parse(i)
}

/// Strip one pair of surrounding double quotes, if present
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Materialize properly encoded String.
///
/// A byte order mark selects the encoding, otherwise UTF-8 is tried first
/// and Windows-1252 is the fallback used by older song packs.
pub fn make_string(i: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(i) {
        let (cow, had_errors) = encoding.decode_without_bom_handling(&i[bom_length..]);
        if had_errors {
            log::debug!("Malformed {} text replaced", encoding.name());
        }
        return cow.into_owned();
    }
    let (cow, had_errors) = UTF_8.decode_without_bom_handling(i);
    if had_errors {
        log::debug!("Text is not UTF-8, decoding with {}", WINDOWS_1252.name());
        let (cow, _) = WINDOWS_1252.decode_without_bom_handling(i);
        cow.into_owned()
    } else {
        cow.into_owned()
    }
}
