use std::sync::OnceLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use tabi_core::{Amount, Clock};

use crate::types::{DatePattern, DateSource, ExtractionResult, RecognitionResult};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

/// Printed money figure: 1–3 digits, optional `,ddd` groups, optional 2-digit fraction.
/// An unseparated longer run only yields a 1–3 digit fragment.
macro_rules! money {
    () => {
        r"([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?)"
    };
}

re!(re_symbol_prefix, concat!(r"[¥$€£]\s*", money!()));
re!(re_unit_suffix, concat!(money!(), r"\s*(?:[¥$€£]|円|元|ドル)"));
re!(re_total_ja, concat!(r"合計[:：\s]*", money!()));
re!(re_total_en, concat!(r"(?i)total[:：\s]*", money!()));
re!(re_comma_grouped, r"([0-9]{1,3}(?:,[0-9]{3})+)");

re!(re_date_year_first, r"([0-9]{4})[-/年]([0-9]{1,2})[-/月]([0-9]{1,2})");
re!(re_date_day_first, r"([0-9]{1,2})[-/]([0-9]{1,2})[-/]([0-9]{4})");
re!(re_date_compact, r"([0-9]{4})([0-9]{2})([0-9]{2})");

// ── Amount matchers ───────────────────────────────────────────────────────────

/// One notational convention for money on a receipt.
pub trait AmountMatcher: Send + Sync {
    fn name(&self) -> &str;

    /// Every positive amount this convention finds in `text`.
    fn candidates(&self, text: &str) -> Vec<Amount>;
}

/// Matches a regex whose first capture group is the printed figure.
#[derive(Debug, Clone)]
pub struct RegexAmountMatcher {
    name: String,
    regex: Regex,
}

impl RegexAmountMatcher {
    pub fn new(name: impl Into<String>, regex: Regex) -> Self {
        Self { name: name.into(), regex }
    }
}

impl AmountMatcher for RegexAmountMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self, text: &str) -> Vec<Amount> {
        self.regex
            .captures_iter(text)
            .filter_map(|c| Amount::parse_printed(c.get(1)?.as_str()).ok())
            .collect()
    }
}

/// The built-in conventions: currency symbol prefix, currency/unit suffix,
/// `合計` label, `total` label, and any comma-grouped figure.
pub fn default_amount_matchers() -> Vec<Box<dyn AmountMatcher>> {
    vec![
        Box::new(RegexAmountMatcher::new("symbol_prefix", re_symbol_prefix().clone())),
        Box::new(RegexAmountMatcher::new("unit_suffix", re_unit_suffix().clone())),
        Box::new(RegexAmountMatcher::new("total_ja", re_total_ja().clone())),
        Box::new(RegexAmountMatcher::new("total_en", re_total_en().clone())),
        Box::new(RegexAmountMatcher::new("comma_grouped", re_comma_grouped().clone())),
    ]
}

// ── Public extraction API ─────────────────────────────────────────────────────

/// A date read from receipt text, or substituted when none was usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateExtraction {
    pub date: NaiveDate,
    pub source: DateSource,
}

pub struct Extractor {
    amount_matchers: Vec<Box<dyn AmountMatcher>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_matchers(default_amount_matchers())
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matchers(amount_matchers: Vec<Box<dyn AmountMatcher>>) -> Self {
        Self { amount_matchers }
    }

    /// Build the structured result for one recognition run.
    pub fn extract(&self, recognition: RecognitionResult, clock: &dyn Clock) -> ExtractionResult {
        let amount = self.extract_amount(&recognition.text);
        let DateExtraction { date, source } = extract_date_detailed(&recognition.text, clock);
        ExtractionResult {
            text: recognition.text,
            amount,
            date: Some(date),
            date_source: Some(source),
            confidence: recognition.confidence,
        }
    }

    /// Pool the candidates of every matcher and keep the largest; on a receipt
    /// the grand total is normally the biggest printed figure.
    pub fn extract_amount(&self, text: &str) -> Option<Amount> {
        self.amount_matchers
            .iter()
            .flat_map(|m| m.candidates(text))
            .max()
    }
}

fn default_extractor() -> &'static Extractor {
    static E: OnceLock<Extractor> = OnceLock::new();
    E.get_or_init(Extractor::default)
}

/// Largest plausible amount in `text` using the built-in matchers.
pub fn extract_amount(text: &str) -> Option<Amount> {
    default_extractor().extract_amount(text)
}

/// Transaction date in `text`, never later than today; today if nothing parses.
pub fn extract_date(text: &str, clock: &dyn Clock) -> NaiveDate {
    extract_date_detailed(text, clock).date
}

pub fn extract_date_detailed(text: &str, clock: &dyn Clock) -> DateExtraction {
    let today = clock.today();
    match find_date(text) {
        Some((pattern, parsed)) if parsed > today => DateExtraction {
            date: today,
            source: DateSource::Clamped { pattern, parsed },
        },
        Some((pattern, parsed)) => DateExtraction {
            date: parsed,
            source: DateSource::Parsed { pattern },
        },
        None => DateExtraction { date: today, source: DateSource::Fallback },
    }
}

// ── Date helpers ──────────────────────────────────────────────────────────────

/// Patterns in priority order. Only the first match of each pattern is
/// considered; a failed range check moves on to the next pattern.
fn find_date(text: &str) -> Option<(DatePattern, NaiveDate)> {
    [DatePattern::YearFirst, DatePattern::DayFirst, DatePattern::Compact]
        .into_iter()
        .find_map(|pattern| try_date_pattern(text, pattern).map(|d| (pattern, d)))
}

fn try_date_pattern(text: &str, pattern: DatePattern) -> Option<NaiveDate> {
    let (re, order) = match pattern {
        DatePattern::YearFirst => (re_date_year_first(), [0, 1, 2]),
        DatePattern::DayFirst => (re_date_day_first(), [2, 1, 0]),
        DatePattern::Compact => (re_date_compact(), [0, 1, 2]),
    };
    let c = re.captures(text)?;
    // `order` maps (year, month, day) to capture groups 1..=3.
    let group = |i: usize| -> Option<u32> { c.get(order[i] + 1)?.as_str().parse().ok() };
    let year = i32::try_from(group(0)?).ok()?;
    let month = group(1)?;
    let day = group(2)?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    overflowing_date(year, month, day)
}

/// Day numbers past the end of the month roll into the next one
/// (2024-02-31 → 2024-03-02).
fn overflowing_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day - 1)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tabi_core::FixedClock;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amount(s: &str) -> Option<Amount> {
        Some(s.parse().unwrap())
    }

    fn clock() -> FixedClock {
        FixedClock::new(ymd(2025, 1, 1))
    }

    // ── Amount ────────────────────────────────────────────────────────────────

    #[test]
    fn amount_takes_largest_of_pooled_candidates() {
        assert_eq!(extract_amount("小計 ¥1,200 合計 ¥3,500"), amount("3500"));
    }

    #[test]
    fn amount_absent_without_figures() {
        assert_eq!(extract_amount("ありがとうございました"), None);
        assert_eq!(extract_amount(""), None);
    }

    #[test]
    fn amount_english_total_label() {
        assert_eq!(extract_amount("Total: 45.00 USD Jan 2024"), amount("45"));
        assert_eq!(extract_amount("TOTAL 980"), amount("980"));
    }

    #[test]
    fn amount_japanese_total_label_with_fullwidth_colon() {
        assert_eq!(extract_amount("合計：2,480"), amount("2480"));
    }

    #[test]
    fn amount_fullwidth_yen_caught_by_comma_group() {
        assert_eq!(extract_amount("ランチ 合計：￥1,500 2024年12月25日"), amount("1500"));
    }

    #[test]
    fn amount_unit_suffix() {
        assert_eq!(extract_amount("コーヒー 450円 ケーキ 520円"), amount("520"));
        assert_eq!(extract_amount("3,000円"), amount("3000"));
        assert_eq!(extract_amount("30 ドル"), amount("30"));
        assert_eq!(extract_amount("88元"), amount("88"));
    }

    #[test]
    fn amount_line_items_only_yields_largest_item() {
        assert_eq!(extract_amount("$3.50\n$12.25\n$4.00"), amount("12.25"));
    }

    #[test]
    fn amount_year_before_currency_does_not_win() {
        assert_eq!(extract_amount("Date 25/12/2024 $45.00"), amount("45"));
    }

    #[test]
    fn amount_id_number_on_previous_line_does_not_win() {
        assert_eq!(extract_amount("登録番号 T1234567890123\n¥1,200"), amount("1200"));
    }

    #[test]
    fn amount_unseparated_run_yields_only_a_short_tail() {
        // "¥1500" reads as 150; a separated figure elsewhere still wins.
        assert_eq!(extract_amount("¥1500"), amount("150"));
        assert_eq!(extract_amount("¥1500 合計 1,500"), amount("1500"));
    }

    #[test]
    fn amount_mixed_currencies_compete_on_magnitude() {
        assert_eq!(extract_amount("¥1,000 ($6.80)"), amount("1000"));
    }

    #[test]
    fn amount_subtotal_does_not_beat_total() {
        assert_eq!(extract_amount("Subtotal 1,000\nTax 80\nTotal 1,080"), amount("1080"));
    }

    #[test]
    fn amount_zero_is_discarded() {
        assert_eq!(extract_amount("¥0"), None);
        assert_eq!(extract_amount("合計 0.00"), None);
    }

    #[test]
    fn amount_ignores_fullwidth_digits() {
        assert_eq!(extract_amount("¥１５００"), None);
    }

    #[test]
    fn amount_no_panic_on_garbage_input() {
        let _ = extract_amount("!@#$%^&*()\n\0\x01\x02¥¥$,,,.");
    }

    #[test]
    fn each_default_matcher_catches_its_convention() {
        let samples = [
            ("symbol_prefix", "€ 12.90", "12.90"),
            ("unit_suffix", "3,000円", "3000"),
            ("total_ja", "合計 1,200", "1200"),
            ("total_en", "total:42.10", "42.10"),
            ("comma_grouped", "12,345", "12345"),
        ];
        let matchers = default_amount_matchers();
        for (name, text, expected) in samples {
            let m = matchers.iter().find(|m| m.name() == name).unwrap();
            assert_eq!(m.candidates(text), vec![expected.parse::<Amount>().unwrap()], "{name}");
        }
    }

    #[test]
    fn comma_grouped_matcher_skips_plain_numbers() {
        let matchers = default_amount_matchers();
        let m = matchers.iter().find(|m| m.name() == "comma_grouped").unwrap();
        assert!(m.candidates("980 1200").is_empty());
    }

    #[test]
    fn custom_matchers_replace_defaults() {
        let extractor = Extractor::with_matchers(vec![Box::new(RegexAmountMatcher::new(
            "tax",
            Regex::new(r"税\s*([0-9]+)").unwrap(),
        ))]);
        assert_eq!(extractor.extract_amount("税 80 合計 ¥1,080"), amount("80"));
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    #[test]
    fn date_year_first_forms() {
        let c = clock();
        assert_eq!(extract_date("2024-12-25", &c), ymd(2024, 12, 25));
        assert_eq!(extract_date("2024/1/5 12:30", &c), ymd(2024, 1, 5));
        assert_eq!(extract_date("2024年12月25日", &c), ymd(2024, 12, 25));
    }

    #[test]
    fn date_day_first() {
        let r = extract_date_detailed("25/12/2024", &clock());
        assert_eq!(r.date, ymd(2024, 12, 25));
        assert_eq!(r.source, DateSource::Parsed { pattern: DatePattern::DayFirst });
        assert_eq!(extract_date("05-06-2024", &clock()), ymd(2024, 6, 5));
    }

    #[test]
    fn date_compact() {
        let r = extract_date_detailed("20241225", &clock());
        assert_eq!(r.date, ymd(2024, 12, 25));
        assert_eq!(r.source, DateSource::Parsed { pattern: DatePattern::Compact });
    }

    #[test]
    fn date_year_first_wins_regardless_of_position() {
        assert_eq!(extract_date("25/12/2024 2023-01-05", &clock()), ymd(2023, 1, 5));
    }

    #[test]
    fn date_out_of_range_falls_back_to_today() {
        let r = extract_date_detailed("2024-13-40", &clock());
        assert_eq!(r.date, ymd(2025, 1, 1));
        assert_eq!(r.source, DateSource::Fallback);
    }

    #[test]
    fn date_out_of_range_falls_through_to_next_pattern() {
        assert_eq!(extract_date("2024-13-40 25/12/2024", &clock()), ymd(2024, 12, 25));
    }

    #[test]
    fn date_us_month_first_is_not_reinterpreted() {
        // 12/25/2024 read day-first gives month 25, so nothing parses.
        assert_eq!(
            extract_date_detailed("12/25/2024", &clock()).source,
            DateSource::Fallback
        );
    }

    #[test]
    fn date_future_is_clamped_to_today() {
        let r = extract_date_detailed("2030/05/01", &clock());
        assert_eq!(r.date, ymd(2025, 1, 1));
        assert_eq!(
            r.source,
            DateSource::Clamped { pattern: DatePattern::YearFirst, parsed: ymd(2030, 5, 1) }
        );
    }

    #[test]
    fn date_today_itself_is_not_clamped() {
        let r = extract_date_detailed("2025-01-01", &clock());
        assert_eq!(r.source, DateSource::Parsed { pattern: DatePattern::YearFirst });
    }

    #[test]
    fn date_without_pattern_is_today() {
        let c = FixedClock::new(ymd(2026, 10, 19));
        assert_eq!(extract_date("Total: 45.00 USD Jan 2024", &c), ymd(2026, 10, 19));
        assert_eq!(extract_date("", &c), ymd(2026, 10, 19));
    }

    #[test]
    fn date_day_overflow_rolls_into_next_month() {
        assert_eq!(extract_date("2024-02-31", &clock()), ymd(2024, 3, 2));
        assert_eq!(extract_date("2023-04-31", &clock()), ymd(2023, 5, 1));
    }

    #[test]
    fn date_no_panic_on_garbage_input() {
        let _ = extract_date("0000-00-00 99/99/9999 00000000 \u{0}", &clock());
    }

    // ── Whole result ──────────────────────────────────────────────────────────

    #[test]
    fn extract_carries_text_and_confidence_through() {
        let r = Extractor::new().extract(
            RecognitionResult::new("ランチ 合計：￥1,500 2024年12月25日", 83.5),
            &clock(),
        );
        assert_eq!(r.text, "ランチ 合計：￥1,500 2024年12月25日");
        assert_eq!(r.amount, amount("1500"));
        assert_eq!(r.date, Some(ymd(2024, 12, 25)));
        assert_eq!(r.confidence, 83.5);
    }

    #[test]
    fn extract_empty_text() {
        let r = Extractor::new().extract(RecognitionResult::new("", 12.0), &clock());
        assert_eq!(r.amount, None);
        assert_eq!(r.date, Some(ymd(2025, 1, 1)));
        assert_eq!(r.date_source, Some(DateSource::Fallback));
        assert_eq!(r.confidence, 12.0);
    }
}
