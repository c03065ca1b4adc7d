use serde::Serialize;

use crate::survey::SurveyRecord;

/// Shown instead of an empty name, position or company.
pub const NOT_FOUND: &str = "Не найдено";

pub const WELCOME: &str = "👋 *Добро пожаловать в Medical Survey Parser!*\n\n\
    Я обрабатываю данные оценок медицинских клиник и записываю их в таблицу.\n\n\
    Отправьте мне сообщение в формате:\n\
    \"Полная оценка медицинских клиник СПб...\"";

pub const DISK_OK: &str = "✅ Подключение к Яндекс Диску работает!\n\n\
    Отправьте сообщение с форматом \"Полная оценка медицинских клиник СПб\" для теста.";

pub const DISK_FAILED: &str = "❌ Ошибка подключения к Яндекс Диску";

pub fn failure_notice(reason: &str) -> String {
    format!("❌ Ошибка обработки данных: {reason}")
}

/// What the submitter is told after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub name: String,
    pub position: String,
    pub company: String,
    pub reputation_under: usize,
    pub reputation_over: usize,
    pub marketing_under: usize,
    pub marketing_over: usize,
}

impl From<&SurveyRecord> for Confirmation {
    fn from(record: &SurveyRecord) -> Self {
        let or_placeholder = |s: &str| {
            if s.is_empty() {
                NOT_FOUND.to_string()
            } else {
                s.to_string()
            }
        };
        let [reputation_under, reputation_over, marketing_under, marketing_over] =
            record.counts();
        Self {
            name: or_placeholder(&record.name),
            position: or_placeholder(&record.position),
            company: or_placeholder(&record.company),
            reputation_under,
            reputation_over,
            marketing_under,
            marketing_over,
        }
    }
}

impl Confirmation {
    /// Telegram Markdown rendering.
    pub fn render(&self) -> String {
        format!(
            "✅ *Данные успешно обработаны!*\n\n\
             📊 *Извлеченные данные:*\n\
             👤 Имя: {}\n\
             💼 Должность: {}\n\
             🏢 Компания: {}\n\n\
             📈 *Клиники в рейтингах:*\n\
             • Репутация (до 400 млн): {} клиник\n\
             • Репутация (свыше 400 млн): {} клиник\n\
             • Маркетинг (до 400 млн): {} клиник\n\
             • Маркетинг (свыше 400 млн): {} клиник\n\n\
             *Данные записаны в таблицу*",
            escape_markdown(&self.name),
            escape_markdown(&self.position),
            escape_markdown(&self.company),
            self.reputation_under,
            self.reputation_over,
            self.marketing_under,
            self.marketing_over,
        )
    }
}

/// Escape the characters legacy Telegram Markdown treats as entity markers.
fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
