//! Parser for clinic-evaluation survey messages.

pub mod layout;
pub mod list;
pub mod record;

pub use layout::{check_layout, LayoutError, Part, Section, Threshold};
pub use record::SurveyRecord;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

/// A message is a survey submission only if it contains all of these.
pub const ELIGIBILITY_MARKERS: [&str; 3] = [
    "Полная оценка медицинских клиник СПб",
    "ЧАСТЬ 1: РЕПУТАЦИЯ",
    "ЧАСТЬ 2: МАРКЕТИНГ",
];

static NAME: Lazy<Regex> = Lazy::new(|| labeled("Имя"));
static POSITION: Lazy<Regex> = Lazy::new(|| labeled("Должность"));
static COMPANY: Lazy<Regex> = Lazy::new(|| labeled("Компания"));

fn labeled(label: &str) -> Regex {
    Regex::new(&format!(r"{}:[ \t]*([^\r\n]+)", regex::escape(label)))
        .expect("label pattern should compile")
}

fn labeled_value(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .unwrap_or_default()
}

pub fn is_eligible(text: &str) -> bool {
    ELIGIBILITY_MARKERS
        .iter()
        .all(|marker| text.contains(marker))
}

/// Extract a [`SurveyRecord`] from `text`. Never fails: anything missing is
/// left empty.
#[instrument(level = "debug", skip(text), fields(text_len = text.len()))]
pub fn parse(text: &str) -> SurveyRecord {
    let mut record = SurveyRecord {
        name: labeled_value(&NAME, text),
        position: labeled_value(&POSITION, text),
        company: labeled_value(&COMPANY, text),
        ..SurveyRecord::default()
    };

    for region in layout::regions(text) {
        *record.list_mut(region.section) = list::numbered_entries(region.body);
    }

    debug!(counts = ?record.counts(), "parsed survey");
    record
}

/// Like [`parse`], but rejects messages whose section headings are out of
/// order, repeated, or outside a part.
pub fn parse_checked(text: &str) -> Result<SurveyRecord, LayoutError> {
    check_layout(text)?;
    Ok(parse(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSION: &str = "Полная оценка медицинских клиник СПб

Имя: Петров Пётр
Должность: Главный врач
Компания: ООО «Здоровье»

ЧАСТЬ 1: РЕПУТАЦИЯ
Список 1 (до 400 млн руб.):
1. Клиника А
2. Клиника Б
3. Клиника В

Список 2 (свыше 400 млн руб.):
1. Клиника Г
2. Клиника Д

ЧАСТЬ 2: МАРКЕТИНГ
Список 1 (до 400 млн руб.):
1. Клиника Е

Список 2 (свыше 400 млн руб.):
1. Клиника Ж
2. Клиника З
";

    #[test]
    fn eligibility_needs_all_markers() {
        assert!(is_eligible(SUBMISSION));
        for marker in ELIGIBILITY_MARKERS {
            let stripped = SUBMISSION.replace(marker, "");
            assert!(!is_eligible(&stripped), "still eligible without {marker}");
        }
        assert!(!is_eligible("Привет!"));
    }

    #[test]
    fn parses_full_submission() {
        let record = parse(SUBMISSION);
        assert_eq!(record.name, "Петров Пётр");
        assert_eq!(record.position, "Главный врач");
        assert_eq!(record.company, "ООО «Здоровье»");
        assert_eq!(
            record.reputation_under_threshold,
            vec!["Клиника А", "Клиника Б", "Клиника В"]
        );
        assert_eq!(
            record.reputation_over_threshold,
            vec!["Клиника Г", "Клиника Д"]
        );
        assert_eq!(record.marketing_under_threshold, vec!["Клиника Е"]);
        assert_eq!(
            record.marketing_over_threshold,
            vec!["Клиника Ж", "Клиника З"]
        );
        assert_eq!(record.counts(), [3, 2, 1, 2]);
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse(SUBMISSION), parse(SUBMISSION));
    }

    #[test]
    fn reputation_only_submission() {
        let text = "Имя: Иванов\n\
            ЧАСТЬ 1: РЕПУТАЦИЯ\n\
            Список 1 (до 400 млн руб.):\n\
            1. Клиника А\n\
            2. Клиника Б\n";
        let record = parse(text);
        assert_eq!(record.name, "Иванов");
        assert_eq!(
            record.reputation_under_threshold,
            vec!["Клиника А", "Клиника Б"]
        );
        assert!(record.reputation_over_threshold.is_empty());
        assert!(record.marketing_under_threshold.is_empty());
        assert!(record.marketing_over_threshold.is_empty());
        assert_eq!(record.position, "");
        assert_eq!(record.company, "");
    }

    #[test]
    fn empty_label_does_not_swallow_next_line() {
        let record = parse("Имя:\nДолжность: Врач\n");
        assert_eq!(record.name, "");
        assert_eq!(record.position, "Врач");
    }

    #[test]
    fn first_label_wins() {
        let record = parse("Компания:  Альфа  \nКомпания: Бета\n");
        assert_eq!(record.company, "Альфа");
    }

    #[test]
    fn garbage_yields_empty_record() {
        assert_eq!(parse("просто текст\n1. без раздела"), SurveyRecord::default());
        assert_eq!(parse(""), SurveyRecord::default());
    }

    #[test]
    fn parse_checked_accepts_documented_order() {
        assert_eq!(parse_checked(SUBMISSION), Ok(parse(SUBMISSION)));
    }

    #[test]
    fn parse_checked_rejects_reordered_parts() {
        let reordered = "Полная оценка медицинских клиник СПб\n\
            ЧАСТЬ 2: МАРКЕТИНГ\nСписок 1 (до 400 млн руб.):\n1. М\n\
            ЧАСТЬ 1: РЕПУТАЦИЯ\nСписок 1 (до 400 млн руб.):\n1. Р\n";
        assert!(matches!(
            parse_checked(reordered),
            Err(LayoutError::PartOutOfOrder { .. })
        ));
    }
}
