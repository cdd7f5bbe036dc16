//! Date code matching for file names.
//!
//! A [`DateGlob`] is compiled once from a strftime-style format such as
//! `%Y-%m-%d` and then used two ways: as a wildcard pattern when listing
//! files, and to recover the date from a matching file name.
//!
//! Supported directives: `%Y` (4 digits), `%m` and `%d` (2 digits), `%j`
//! (3-digit day of year) and `%%` (a literal percent sign). Everything else
//! is copied as a literal.

use chrono::NaiveDate;

use crate::error::{CubeError, Result};

const DIGIT: &str = "[0-9]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    Year,
    Month,
    Day,
    DayOfYear,
}

impl Token {
    /// Characters this token spans in a file name.
    fn width(self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Year => 4,
            Token::Month | Token::Day => 2,
            Token::DayOfYear => 3,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Token::Literal(_) => "",
            Token::Year => "%Y",
            Token::Month => "%m",
            Token::Day => "%d",
            Token::DayOfYear => "%j",
        }
    }
}

/// Compiled date format: a file name pattern plus the rule to parse it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGlob {
    format: String,
    tokens: Vec<Token>,
    pattern: String,
}

impl DateGlob {
    /// Compile a date format.
    ///
    /// Fails with `ConfigFormat` on an unknown directive, a trailing `%`,
    /// a directive used twice, or `%j` mixed with `%m`/`%d`.
    pub fn new(format: &str) -> Result<Self> {
        let tokens = tokenize(format)?;

        let has = |t: Token| tokens.contains(&t);
        if has(Token::DayOfYear) && (has(Token::Month) || has(Token::Day)) {
            return Err(CubeError::config_format(format!(
                "'{}': %j cannot be combined with %m or %d",
                format
            )));
        }

        let pattern = tokens
            .iter()
            .map(|token| match token {
                Token::Literal(c) => c.to_string(),
                other => DIGIT.repeat(other.width()),
            })
            .collect();

        Ok(Self {
            format: format.to_string(),
            tokens,
            pattern,
        })
    }

    /// The original format expression.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Wildcard pattern: each directive becomes a run of `[0-9]`, literals
    /// are kept verbatim and in order.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Like [`pattern`](Self::pattern) but with literals escaped, safe to
    /// embed in a larger glob.
    pub fn glob_pattern(&self) -> String {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Literal(c) => glob::Pattern::escape(&c.to_string()),
                other => DIGIT.repeat(other.width()),
            })
            .collect()
    }

    /// Number of characters a date occupies in a file name.
    fn width(&self) -> usize {
        self.tokens.iter().map(|t| t.width()).sum()
    }

    fn matches_at(&self, chars: &[char]) -> bool {
        let mut pos = 0;
        for token in &self.tokens {
            let width = token.width();
            let matched = match token {
                Token::Literal(c) => chars[pos] == *c,
                _ => chars[pos..pos + width].iter().all(|c| c.is_ascii_digit()),
            };
            if !matched {
                return false;
            }
            pos += width;
        }
        true
    }

    /// Every substring of `filename` matching the pattern, left to right.
    fn candidates<'a>(&'a self, filename: &str) -> impl Iterator<Item = String> + 'a {
        let chars: Vec<char> = filename.chars().collect();
        let width = self.width();
        let starts = if width == 0 || chars.len() < width {
            0
        } else {
            chars.len() - width + 1
        };

        (0..starts).filter_map(move |start| {
            let window = &chars[start..start + width];
            self.matches_at(window).then(|| window.iter().collect())
        })
    }

    /// First substring of `filename` matching the pattern.
    pub fn find(&self, filename: &str) -> Option<String> {
        self.candidates(filename).next()
    }

    /// Parse a substring that matches the pattern back into a date.
    ///
    /// A missing `%m` or `%d` defaults to 1. A format without `%Y` cannot
    /// name a date and fails with `ConfigFormat`.
    pub fn parse(&self, text: &str) -> Result<NaiveDate> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() != self.width() || !self.matches_at(&chars) {
            return Err(self.no_date(text));
        }

        let (mut year, mut month, mut day, mut ordinal) = (None, 1, 1, None);
        let mut pos = 0;
        for token in &self.tokens {
            let width = token.width();
            if !matches!(token, Token::Literal(_)) {
                let value = digits(&chars[pos..pos + width]);
                match token {
                    Token::Year => year = Some(value as i32),
                    Token::Month => month = value,
                    Token::Day => day = value,
                    Token::DayOfYear => ordinal = Some(value),
                    Token::Literal(_) => {}
                }
            }
            pos += width;
        }

        let year = year.ok_or_else(|| {
            CubeError::config_format(format!("'{}' has no %Y directive", self.format))
        })?;

        let date = match ordinal {
            Some(ordinal) => NaiveDate::from_yo_opt(year, ordinal),
            None => NaiveDate::from_ymd_opt(year, month, day),
        };
        date.ok_or_else(|| self.no_date(text))
    }

    /// Locate and parse the date in `filename`.
    ///
    /// Candidates are tried left to right; one that matches the pattern but
    /// is not a calendar date (`2021-13-45`) is passed over.
    pub fn extract_date(&self, filename: &str) -> Result<NaiveDate> {
        for candidate in self.candidates(filename) {
            match self.parse(&candidate) {
                Ok(date) => return Ok(date),
                Err(CubeError::NoDateFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(self.no_date(filename))
    }

    fn no_date(&self, filename: &str) -> CubeError {
        CubeError::NoDateFound {
            filename: filename.to_string(),
            format: self.format.clone(),
        }
    }
}

fn digits(chars: &[char]) -> u32 {
    chars
        .iter()
        .filter_map(|c| c.to_digit(10))
        .fold(0, |acc, d| acc * 10 + d)
}

fn tokenize(format: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(format.len());
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            tokens.push(Token::Literal(c));
            continue;
        }

        let token = match chars.next() {
            Some('Y') => Token::Year,
            Some('m') => Token::Month,
            Some('d') => Token::Day,
            Some('j') => Token::DayOfYear,
            Some('%') => Token::Literal('%'),
            Some(other) => {
                return Err(CubeError::config_format(format!(
                    "'{}': unsupported directive %{}",
                    format, other
                )))
            }
            None => {
                return Err(CubeError::config_format(format!(
                    "'{}': trailing %",
                    format
                )))
            }
        };

        if !matches!(token, Token::Literal(_)) && tokens.contains(&token) {
            return Err(CubeError::config_format(format!(
                "'{}': {} appears more than once",
                format,
                token.directive()
            )));
        }
        tokens.push(token);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pattern_with_separators() {
        let glob = DateGlob::new("%Y-%m-%d").unwrap();
        assert_eq!(
            glob.pattern(),
            "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]"
        );
    }

    #[test]
    fn test_pattern_compact() {
        let glob = DateGlob::new("%Y%m%d").unwrap();
        assert_eq!(glob.pattern(), "[0-9]".repeat(8));
    }

    #[test]
    fn test_pattern_keeps_token_order() {
        let glob = DateGlob::new("%d.%m.%Y").unwrap();
        assert_eq!(
            glob.pattern(),
            "[0-9][0-9].[0-9][0-9].[0-9][0-9][0-9][0-9]"
        );
        assert_eq!(glob.extract_date("obs_15.06.2021.tif").unwrap(), date(2021, 6, 15));
    }

    #[test]
    fn test_extract_date() {
        let glob = DateGlob::new("%Y-%m-%d").unwrap();
        assert_eq!(
            glob.extract_date("scene_2021-06-15_B02.tif").unwrap(),
            date(2021, 6, 15)
        );
    }

    #[test]
    fn test_extract_date_day_of_year() {
        let glob = DateGlob::new("%Y%j").unwrap();
        assert_eq!(glob.pattern(), "[0-9]".repeat(7));
        assert_eq!(
            glob.extract_date("HLS.S30.T10SEG.2021166T185921.v2.0.B02.tif")
                .unwrap(),
            date(2021, 6, 15)
        );
    }

    #[test]
    fn test_extract_date_skips_invalid_candidate() {
        let glob = DateGlob::new("%Y%m%d").unwrap();
        // "20219999" matches the digits but is not a date.
        assert_eq!(
            glob.extract_date("tile_20219999_20210615.tif").unwrap(),
            date(2021, 6, 15)
        );
    }

    #[test]
    fn test_no_date_found() {
        let glob = DateGlob::new("%Y-%m-%d").unwrap();
        let err = glob.extract_date("scene_20210615.tif").unwrap_err();
        assert!(matches!(err, CubeError::NoDateFound { .. }));

        let err = glob.extract_date("x").unwrap_err();
        assert!(matches!(err, CubeError::NoDateFound { .. }));
    }

    #[test]
    fn test_literal_percent() {
        let glob = DateGlob::new("%Y%%%m").unwrap();
        assert_eq!(glob.pattern(), "[0-9][0-9][0-9][0-9]%[0-9][0-9]");
        assert_eq!(glob.extract_date("a_2020%02_b").unwrap(), date(2020, 2, 1));
    }

    #[test]
    fn test_glob_pattern_escapes_literals() {
        let glob = DateGlob::new("[%Y]").unwrap();
        assert_eq!(glob.pattern(), "[[0-9][0-9][0-9][0-9]]");
        assert_eq!(glob.glob_pattern(), "[[][0-9][0-9][0-9][0-9][]]");
    }

    #[test]
    fn test_invalid_formats() {
        for format in ["%Y-%Y", "%Y%q", "%Y%", "%Y%j%m"] {
            let err = DateGlob::new(format).unwrap_err();
            assert!(
                matches!(err, CubeError::ConfigFormat(_)),
                "{} should be rejected",
                format
            );
        }
    }

    #[test]
    fn test_missing_year() {
        let glob = DateGlob::new("%m-%d").unwrap();
        let err = glob.extract_date("file_06-15.tif").unwrap_err();
        assert!(matches!(err, CubeError::ConfigFormat(_)));
    }

    #[test]
    fn test_find_returns_first_match() {
        let glob = DateGlob::new("%Y").unwrap();
        assert_eq!(glob.find("a1999b2000").as_deref(), Some("1999"));
        assert_eq!(glob.find("abc"), None);
    }
}
