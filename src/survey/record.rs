use serde::{Deserialize, Serialize};

use super::layout::{Part, Section, Threshold};

/// Structured result of parsing one survey message.
///
/// Every field is empty when its label or section is missing from the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub name: String,
    pub position: String,
    pub company: String,
    pub reputation_under_threshold: Vec<String>,
    pub reputation_over_threshold: Vec<String>,
    pub marketing_under_threshold: Vec<String>,
    pub marketing_over_threshold: Vec<String>,
}

impl SurveyRecord {
    pub fn list(&self, section: Section) -> &[String] {
        match (section.part, section.threshold) {
            (Part::Reputation, Threshold::Under) => &self.reputation_under_threshold,
            (Part::Reputation, Threshold::Over) => &self.reputation_over_threshold,
            (Part::Marketing, Threshold::Under) => &self.marketing_under_threshold,
            (Part::Marketing, Threshold::Over) => &self.marketing_over_threshold,
        }
    }

    pub fn list_mut(&mut self, section: Section) -> &mut Vec<String> {
        match (section.part, section.threshold) {
            (Part::Reputation, Threshold::Under) => &mut self.reputation_under_threshold,
            (Part::Reputation, Threshold::Over) => &mut self.reputation_over_threshold,
            (Part::Marketing, Threshold::Under) => &mut self.marketing_under_threshold,
            (Part::Marketing, Threshold::Over) => &mut self.marketing_over_threshold,
        }
    }

    /// Entry counts of the four lists, in document order.
    pub fn counts(&self) -> [usize; 4] {
        Section::ALL.map(|section| self.list(section).len())
    }
}
