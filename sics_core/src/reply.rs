//! Inbound line cleanup, tokenizing and field parsers.
//!
//! Parsers return `None` for malformed content; the session logs and drops
//! those lines without touching the model.

/// Leading character of every MT-SICS error report (`ES`, `ET`, `EL`, ...).
pub const ERROR_PREFIX: char = 'E';

/// Strip CR, LF and ESC anywhere in the line, then surrounding whitespace.
pub fn clean_line(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\x1b'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Leading run of word characters (`[A-Za-z0-9_]`), if the line starts with one.
pub fn leading_token(line: &str) -> Option<&str> {
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    (end > 0).then(|| &line[..end])
}

pub fn is_error_report(token: &str) -> bool {
    token.starts_with(ERROR_PREFIX)
}

/// Reply shapes with a field handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Weight,
    Tare,
    Model,
    ScaleType,
    SerialNumber,
    Firmware,
    WeighMode,
    EnvStability,
    AutoZero,
    StandbyTimeout,
}

impl ReplyKind {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "S" => Self::Weight,
            "TA" => Self::Tare,
            "I11" => Self::Model,
            "I2" => Self::ScaleType,
            "I4" => Self::SerialNumber,
            "I3" => Self::Firmware,
            "M01" => Self::WeighMode,
            "M02" => Self::EnvStability,
            "M03" => Self::AutoZero,
            "M16" => Self::StandbyTimeout,
            _ => return None,
        })
    }

    pub const fn token(self) -> &'static str {
        match self {
            Self::Weight => "S",
            Self::Tare => "TA",
            Self::Model => "I11",
            Self::ScaleType => "I2",
            Self::SerialNumber => "I4",
            Self::Firmware => "I3",
            Self::WeighMode => "M01",
            Self::EnvStability => "M02",
            Self::AutoZero => "M03",
            Self::StandbyTimeout => "M16",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightReading {
    pub stable: bool,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TareReading {
    pub value: f64,
    pub unit: String,
}

/// `<TOKEN> <flag> <value> <unit>` with a one-character flag.
fn parse_flagged<'a>(token: &str, line: &'a str) -> Option<(char, f64, &'a str)> {
    let mut parts = line.split_whitespace();
    if parts.next()? != token {
        return None;
    }
    let flag = parts.next()?;
    let mut flag_chars = flag.chars();
    let f = flag_chars.next()?;
    if flag_chars.next().is_some() || !(f.is_ascii_alphanumeric() || f == '_') {
        return None;
    }
    let value: f64 = parts.next()?.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let unit = parts.next()?;
    Some((f, value, unit))
}

/// `S S      12.345 g` (stable) or `S D      12.345 g` (dynamic).
pub fn parse_weight(line: &str) -> Option<WeightReading> {
    let (flag, value, unit) = parse_flagged("S", line)?;
    Some(WeightReading {
        stable: flag == 'S',
        value,
        unit: unit.to_string(),
    })
}

/// `TA A      0.000 g`
pub fn parse_tare(line: &str) -> Option<TareReading> {
    let (_, value, unit) = parse_flagged("TA", line)?;
    Some(TareReading {
        value,
        unit: unit.to_string(),
    })
}

/// `<TOKEN> A "<text>"`; text runs to the last quote and must be non-empty.
pub fn parse_quoted(token: &str, line: &str) -> Option<String> {
    let rest = line.strip_prefix(token)?;
    let rest = rest.strip_prefix(char::is_whitespace)?.trim_start();
    let rest = rest.strip_prefix('A')?;
    let rest = rest.strip_prefix(char::is_whitespace)?.trim_start();
    let body = rest.strip_prefix('"')?;
    let end = body.rfind('"')?;
    let text = &body[..end];
    (!text.is_empty()).then(|| text.to_string())
}

/// `<TOKEN> [A] <digit>`; returns the first digit of the value field.
pub fn parse_code(token: &str, line: &str) -> Option<u8> {
    let mut parts = line.split_whitespace();
    if parts.next()? != token {
        return None;
    }
    let mut field = parts.next()?;
    if field == "A" {
        field = parts.next()?;
    }
    let digit = field.chars().next()?.to_digit(10)?;
    u8::try_from(digit).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("S S      12.345 g\r\n", "S S      12.345 g")]
    #[case("\x1b  TA A 1.0 g \r", "TA A 1.0 g")]
    #[case("\r\n", "")]
    fn clean_line_strips_terminators(#[case] raw: &str, #[case] want: &str) {
        assert_eq!(clean_line(raw), want);
    }

    #[rstest]
    #[case("I4 A \"123\"", Some("I4"))]
    #[case("M12 A", Some("M12"))]
    #[case("ES", Some("ES"))]
    #[case("\"quoted\"", None)]
    #[case("", None)]
    fn leading_token_takes_word_chars(#[case] line: &str, #[case] want: Option<&str>) {
        assert_eq!(leading_token(line), want);
    }

    #[test]
    fn stable_and_dynamic_weights() {
        let s = parse_weight("S S      12.345 g").expect("stable");
        assert!(s.stable);
        assert!((s.value - 12.345).abs() < 1e-9);
        assert_eq!(s.unit, "g");
        let d = parse_weight("S D      12.345 g").expect("dynamic");
        assert!(!d.stable);
    }

    #[rstest]
    #[case("S S abc g")]
    #[case("S S 1.0")]
    #[case("S SS 1.0 g")]
    #[case("S + 1.0 g")]
    #[case("S S NaN g")]
    #[case("SX S 1.0 g")]
    fn malformed_weights_are_rejected(#[case] line: &str) {
        assert_eq!(parse_weight(line), None);
    }

    #[test]
    fn negative_tare() {
        let t = parse_tare("TA A     -0.120 g").expect("tare");
        assert!((t.value + 0.12).abs() < 1e-9);
    }

    #[rstest]
    #[case("I11 A \"XPE205\"", Some("XPE205"))]
    #[case("I2 A \"XPE205 220.00900 g\"", Some("XPE205 220.00900 g"))]
    #[case("I4 A \"\"", None)]
    #[case("I4 B \"123\"", None)]
    #[case("I4 A 123", None)]
    fn quoted_identity(#[case] line: &str, #[case] want: Option<&str>) {
        let token = leading_token(line).expect("token");
        assert_eq!(parse_quoted(token, line).as_deref(), want);
    }

    #[rstest]
    #[case("M01 A 1", Some(1))]
    #[case("M16 3", Some(3))]
    #[case("M02 A 5", Some(5))]
    #[case("M03 A x", None)]
    #[case("M03 A", None)]
    fn enumerated_codes(#[case] line: &str, #[case] want: Option<u8>) {
        let token = leading_token(line).expect("token");
        assert_eq!(parse_code(token, line), want);
    }

    #[test]
    fn reply_kind_tokens_round_trip() {
        for tok in ["S", "TA", "I11", "I2", "I4", "I3", "M01", "M02", "M03", "M16"] {
            assert_eq!(ReplyKind::from_token(tok).map(ReplyKind::token), Some(tok));
        }
        assert_eq!(ReplyKind::from_token("M12"), None);
    }
}
