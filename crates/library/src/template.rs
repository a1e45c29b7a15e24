//! Name templating for renamed directories.
//!
//! Converts a resolved [`VideoInfo`] and its position in the publish-date
//! order into a directory name, using a user-configured template rendered by
//! [upon]. Two template syntaxes are accepted:
//!
//! - **Plain** (the default, `index-title-(yyyy-MM-dd-hh-mm-ss)`): the bare
//!   words `index` and `title` are placeholders, and the first parenthesised
//!   group is a time format. Everything else is literal text.
//! - **Native upon** (any template containing `{{`, `{%` or `{#`):
//!   Mustache-like expressions over the variables below, extended with:
//!   - **`safe`**: Applies the same filesystem sanitizing the `title`
//!     variable already gets, for use on other strings.
//!   - **`slug`**: Converts strings to URL-safe slugs, stripping quotation
//!     marks first to avoid artifacts like leading/trailing hyphens.
//!   - **`truncate`**: Truncates strings to a maximum byte length at a
//!     character boundary, `{{ title|truncate: 40 }}`.
//!   - **`date`**: Renders a unix timestamp with a time format,
//!     `{{ pubdate|date: "yyyy-MM" }}`.
//!
//! Plain templates are compiled into native ones, so both go through the
//! same lookup table of variables rather than ad hoc string replacement.
//!
//! # Template Variables
//!
//! | Variable  | Type     | Description                                          |
//! |-----------|----------|------------------------------------------------------|
//! | `index`   | `u64`    | 1-based position in ascending publish-date order     |
//! | `title`   | `String` | Video title, sanitized for use as a file name        |
//! | `aid`     | `String` | The identifier (original directory name)             |
//! | `pubdate` | `i64`    | Publish time, unix seconds                           |
//! | `time`    | `String` | Publish time rendered with the template's time format |
//!
//! # Time Formats
//!
//! `yyyy` is the year, `MM` month, `dd` day, `hh` hour (24-hour clock), `mm`
//! minute and `ss` second; all but the year are zero-padded to two digits.
//! Anything else is copied through unchanged. Plain templates without a
//! parenthesised group render `time` as `yyyy-MM-dd-hh-mm-ss`.
//!
//! # Example
//!
//! ```
//! use bilirename_api::{Identifier, VideoInfo};
//! use bilirename_library::NameGenerator;
//!
//! let info = VideoInfo { aid: Identifier::from("170001"), title: "A/B".into(), pubdate: 1_325_376_000 };
//! let generator: NameGenerator = "index-title-(yyyy-MM-dd)".parse().unwrap();
//! assert_eq!(generator.generate(1, &info).unwrap(), "1-A_B-2012-01-01");
//! ```

use crate::error::{Error, ErrorKind, Result};
use bilirename_api::VideoInfo;
use bilirename_storage::validate_name;
use exn::{OptionExt, ResultExt};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use time::{OffsetDateTime, UtcOffset};
use tracing::instrument;
use upon::{Engine, Template};

pub const DEFAULT_TEMPLATE: &str = "index-title-(yyyy-MM-dd-hh-mm-ss)";
pub const DEFAULT_TIME_FORMAT: &str = "yyyy-MM-dd-hh-mm-ss";

/// First parenthesised group, non-greedy.
static TIME_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((.*?)\)").unwrap());
static PLACEHOLDERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"index|title").unwrap());

/// Characters that are not allowed in file names on at least one common
/// filesystem.
const ILLEGAL_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
/// Device names Windows reserves regardless of extension or case.
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1", "LPT2",
    "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes a title safe to use as (part of) a directory name.
///
/// Illegal characters become `_`, and a title that *is* a reserved device
/// name gets a leading `_`.
///
/// ```
/// use bilirename_library::sanitize;
/// assert_eq!(sanitize("A/B: C?"), "A_B_ C_");
/// assert_eq!(sanitize("con"), "_con");
/// assert_eq!(sanitize("CONSOLE"), "CONSOLE");
/// ```
pub fn sanitize(title: &str) -> String {
    let safe: String = title.chars().map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c }).collect();
    if RESERVED_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(&safe)) {
        format!("_{safe}")
    } else {
        safe
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TimePart {
    Literal(String),
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// A parsed time format such as `yyyy-MM-dd-hh-mm-ss`.
///
/// Parsing never fails: unrecognized text is literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat(Vec<TimePart>);
impl TimeFormat {
    pub fn parse(format: &str) -> Self {
        const TOKENS: [(&str, TimePart); 6] = [
            ("yyyy", TimePart::Year),
            ("MM", TimePart::Month),
            ("dd", TimePart::Day),
            ("hh", TimePart::Hour),
            ("mm", TimePart::Minute),
            ("ss", TimePart::Second),
        ];
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = format;
        'scan: while let Some(c) = rest.chars().next() {
            for (token, part) in &TOKENS {
                if let Some(after) = rest.strip_prefix(token) {
                    if !literal.is_empty() {
                        parts.push(TimePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part.clone());
                    rest = after;
                    continue 'scan;
                }
            }
            literal.push(c);
            rest = &rest[c.len_utf8()..];
        }
        if !literal.is_empty() {
            parts.push(TimePart::Literal(literal));
        }
        Self(parts)
    }

    /// Renders a unix timestamp in the given offset.
    pub fn render(&self, timestamp: i64, offset: UtcOffset) -> Result<String> {
        let datetime = OffsetDateTime::from_unix_timestamp(timestamp)
            .or_raise(|| ErrorKind::Template)?
            .checked_to_offset(offset)
            .ok_or_raise(|| ErrorKind::Template)?;
        Ok(self
            .0
            .iter()
            .map(|part| match part {
                TimePart::Literal(s) => s.clone(),
                TimePart::Year => datetime.year().to_string(),
                TimePart::Month => format!("{:02}", u8::from(datetime.month())),
                TimePart::Day => format!("{:02}", datetime.day()),
                TimePart::Hour => format!("{:02}", datetime.hour()),
                TimePart::Minute => format!("{:02}", datetime.minute()),
                TimePart::Second => format!("{:02}", datetime.second()),
            })
            .collect())
    }
}
impl Default for TimeFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_TIME_FORMAT)
    }
}

/// Generates directory names from [`VideoInfo`] and a user-defined template
/// string.
///
/// Constructed via [`FromStr`] (rendering times in UTC) or [`new`](Self::new),
/// both of which compile the template eagerly so that syntax errors surface
/// at creation time rather than at render time. The compiled template is
/// reusable across many [`generate`](Self::generate) calls.
pub struct NameGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
    time_format: TimeFormat,
    offset: UtcOffset,
}
impl FromStr for NameGenerator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s, UtcOffset::UTC)
    }
}
impl NameGenerator {
    /// Compiles `template`, rendering all times in `offset`.
    ///
    /// Returns [`ErrorKind::Template`] if the template syntax is invalid.
    pub fn new(template: &str, offset: UtcOffset) -> Result<Self> {
        let mut engine = Engine::new();
        addons::configure(&mut engine, offset);
        let (source, time_format) = compile_source(template);
        tracing::debug!(template, compiled = %source, "Compiled name template");
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(source).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template, time_format, offset })
    }

    /// Renders the name for the video at 1-based position `index`.
    ///
    /// The result is used verbatim and must be a single valid directory name
    /// that is not blank; a template whose literal text contains a path
    /// separator fails here.
    #[instrument(skip_all, fields(aid = %info.aid, index))]
    pub fn generate(&self, index: usize, info: &VideoInfo) -> Result<String> {
        let name = self
            .template
            .render(&self.engine, self.parameters(index, info)?)
            .to_string()
            .or_raise(|| ErrorKind::Template)?;
        if name.trim().is_empty() {
            exn::bail!(ErrorKind::Template);
        }
        validate_name(&name).or_raise(|| ErrorKind::Template)?;
        Ok(name)
    }

    /// Builds the [`upon::Value`] map exposed to the template engine.
    fn parameters(&self, index: usize, info: &VideoInfo) -> Result<upon::Value> {
        Ok(upon::value! {
            index: u64::try_from(index).or_raise(|| ErrorKind::Template)?,
            title: sanitize(&info.title),
            aid: info.aid.as_str(),
            pubdate: info.pubdate,
            time: self.time_format.render(info.pubdate, self.offset)?,
        })
    }
}

/// Whether the template is written in upon's own syntax.
fn is_native(template: &str) -> bool {
    ["{{", "{%", "{#"].iter().any(|delimiter| template.contains(delimiter))
}

/// Translates a plain template into upon source, returning it alongside the
/// time format used for the `time` variable.
fn compile_source(template: &str) -> (String, TimeFormat) {
    if is_native(template) {
        return (template.to_string(), TimeFormat::default());
    }
    match TIME_GROUP.captures(template) {
        Some(captures) => {
            let group = captures.get_match();
            let format = captures.get(1).map_or("", |m| m.as_str());
            let mut source = plain_source(&template[..group.start()]);
            source.push_str("{{ time }}");
            source.push_str(&plain_source(&template[group.end()..]));
            (source, TimeFormat::parse(format))
        },
        None => (plain_source(template), TimeFormat::default()),
    }
}

/// Placeholders become variables; everything between them is emitted as an
/// upon string literal so no character of it is ever read as syntax.
fn plain_source(text: &str) -> String {
    let mut source = String::new();
    let mut literal_start = 0;
    for placeholder in PLACEHOLDERS.find_iter(text) {
        push_literal(&mut source, &text[literal_start..placeholder.start()]);
        source.push_str("{{ ");
        source.push_str(placeholder.as_str());
        source.push_str(" }}");
        literal_start = placeholder.end();
    }
    push_literal(&mut source, &text[literal_start..]);
    source
}

fn push_literal(source: &mut String, literal: &str) {
    if literal.is_empty() {
        return;
    }
    let escaped = literal.replace('\\', "\\\\").replace('"', "\\\"");
    source.push_str("{{ \"");
    source.push_str(&escaped);
    source.push_str("\" }}");
}

/// Custom [`upon`] extensions for name-safe string manipulation.
mod addons {
    use super::{TimeFormat, sanitize};
    use rslug::slugify;
    use std::fmt::Write;
    use time::UtcOffset;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Custom formatter that converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                // Various quotation marks: '"''""„"`«»
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn safe_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", sanitize(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Truncates a string to a maximum byte length at a character boundary.
    ///
    /// This prevents cutting UTF-8 characters in the middle, which would produce
    /// invalid strings.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    /// Registers the `safe` and `slug` formatters and the `truncate` and
    /// `date` functions on the given engine.
    pub(crate) fn configure(engine: &mut Engine<'_>, offset: UtcOffset) {
        engine.add_formatter("safe", safe_formatter);
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
        engine.add_function("date", move |timestamp: i64, format: &str| {
            // Out-of-range timestamps fall back to the raw number.
            TimeFormat::parse(format).render(timestamp, offset).unwrap_or_else(|_| timestamp.to_string())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilirename_api::Identifier;
    use rstest::rstest;

    /// 2012-01-02 03:04:05 UTC
    const TIMESTAMP: i64 = 1_325_473_445;

    fn make_info(aid: &str, title: &str, pubdate: i64) -> VideoInfo {
        VideoInfo { aid: Identifier::from(aid), title: title.to_string(), pubdate }
    }

    #[test]
    fn test_default_template() {
        let generator: NameGenerator = "index-title-(yyyy-MM-dd-hh-mm-ss)".parse().unwrap();
        let name = generator.generate(1, &make_info("170001", "A/B", TIMESTAMP)).unwrap();
        assert_eq!(name, "1-A_B-2012-01-02-03-04-05");
    }

    #[test]
    fn test_no_residual_tokens() {
        let generator: NameGenerator = "index-title-(yyyy-MM-dd-hh-mm-ss)".parse().unwrap();
        let name = generator.generate(7, &make_info("1", "Clip", TIMESTAMP)).unwrap();
        for token in ["index", "title", "yyyy", "MM", "dd", "hh", "mm", "ss", "(", ")"] {
            assert!(!name.contains(token), "{name} still contains {token}");
        }
    }

    #[test]
    fn test_placeholders_inside_title_are_not_expanded() {
        let generator: NameGenerator = "index-title-(yyyy)".parse().unwrap();
        let name = generator.generate(2, &make_info("1", "index of title (yyyy)", TIMESTAMP)).unwrap();
        assert_eq!(name, "2-index of title (yyyy)-2012");
    }

    #[test]
    fn test_reserved_title_sanitized() {
        let generator: NameGenerator = "title".parse().unwrap();
        assert_eq!(generator.generate(1, &make_info("1", "CON", TIMESTAMP)).unwrap(), "_CON");
    }

    #[test]
    fn test_without_time_group() {
        let generator: NameGenerator = "title [aid index]".parse().unwrap();
        assert_eq!(generator.generate(3, &make_info("1", "Clip", TIMESTAMP)).unwrap(), "Clip [aid 3]");
    }

    #[test]
    fn test_only_first_group_is_time() {
        let generator: NameGenerator = "(yyyy)-title-(MM)".parse().unwrap();
        assert_eq!(generator.generate(1, &make_info("1", "Clip", TIMESTAMP)).unwrap(), "2012-Clip-(MM)");
    }

    #[test]
    fn test_offset_applied() {
        let offset = UtcOffset::from_hms(8, 0, 0).unwrap();
        let generator = NameGenerator::new("(yyyy-MM-dd hh)", offset).unwrap();
        assert_eq!(generator.generate(1, &make_info("1", "x", TIMESTAMP)).unwrap(), "2012-01-02 11");
    }

    #[test]
    fn test_native_template() {
        let generator: NameGenerator = "{{ index }} - {{ title|slug }} [{{ aid }}] {{ time }}".parse().unwrap();
        let name = generator.generate(4, &make_info("170001", "Hello World!", TIMESTAMP)).unwrap();
        assert_eq!(name, "4 - hello-world [170001] 2012-01-02-03-04-05");
    }

    #[test]
    fn test_native_date_function() {
        let generator: NameGenerator = "{{ pubdate|date: \"yyyyMMdd\" }}_{{ title|truncate: 5 }}".parse().unwrap();
        let name = generator.generate(1, &make_info("1", "Long title", TIMESTAMP)).unwrap();
        assert_eq!(name, "20120102_Long ");
    }

    #[test]
    fn test_surrounding_whitespace_kept() {
        let generator: NameGenerator = "title-index".parse().unwrap();
        assert_eq!(generator.generate(1, &make_info("1", " Padded ", TIMESTAMP)).unwrap(), " Padded -1");
    }

    #[test]
    fn test_blank_name_rejected() {
        let generator: NameGenerator = "title".parse().unwrap();
        let err = generator.generate(1, &make_info("1", "   ", TIMESTAMP)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template));
    }

    #[rstest]
    #[case("{index}-{title}-(yyyy)", "{3}-{Clip}-2012")]
    #[case("[index] title}} (yyyy)", "[3] Clip}} 2012")]
    #[case("index}title{(MM)", "3}Clip{01")]
    #[case(r#"index "title" \ (dd)"#, r#"3 "Clip" \ 02"#)]
    fn test_plain_literals_are_not_syntax(#[case] template: &str, #[case] expected: &str) {
        let generator: NameGenerator = template.parse().unwrap();
        assert_eq!(generator.generate(3, &make_info("1", "Clip", TIMESTAMP)).unwrap(), expected);
    }

    #[test]
    fn test_invalid_native_template_fails_fast() {
        assert!("{{ title ".parse::<NameGenerator>().is_err());
        assert!("{% if title %}".parse::<NameGenerator>().is_err());
    }

    #[test]
    fn test_separator_in_template_rejected() {
        let generator: NameGenerator = "title/index".parse().unwrap();
        let err = generator.generate(1, &make_info("1", "x", TIMESTAMP)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template));
    }

    #[rstest]
    #[case("yyyy-MM-dd-hh-mm-ss", "2012-01-02-03-04-05")]
    #[case("hh:mm", "03:04")]
    #[case("MMmm", "0104")]
    #[case("yyyyy", "2012y")]
    #[case("[dd.MM]", "[02.01]")]
    #[case("", "")]
    #[case("no tokens", "no tokens")]
    fn test_time_format(#[case] format: &str, #[case] expected: &str) {
        assert_eq!(TimeFormat::parse(format).render(TIMESTAMP, UtcOffset::UTC).unwrap(), expected);
    }

    #[test]
    fn test_time_format_out_of_range() {
        assert!(TimeFormat::default().render(i64::MAX, UtcOffset::UTC).is_err());
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case(r#"a/b\c:d*e?f"g<h>i|j"#, "a_b_c_d_e_f_g_h_i_j")]
    #[case("CON", "_CON")]
    #[case("nul", "_nul")]
    #[case("Lpt9", "_Lpt9")]
    #[case("COM10", "COM10")]
    #[case("AUX/", "AUX_")]
    #[case("", "")]
    fn test_sanitize(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(sanitize(title), expected);
    }
}
