//! Study modes and prompt assembly.

use std::fmt;
use std::str::FromStr;

use crate::documents::truncate_chars;

const PERSONA: &str = "You are a demanding, expert exam-preparation coach. \
Your only source is the attached PDF documents. ";

/// What kind of answer the user wants from the documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudyMode {
    /// A numbered mock exam with an answer key
    Quiz,
    /// Free-form questions about the material
    #[default]
    Chat,
    /// A structured summary
    Summary,
    /// A spreadsheet-ready table of facts
    Table,
}

impl StudyMode {
    /// Every mode, in menu order.
    pub const ALL: [StudyMode; 4] = [Self::Quiz, Self::Chat, Self::Summary, Self::Table];

    /// Instructions sent ahead of the documents.
    pub fn system_prompt(self) -> String {
        let instruction = match self {
            Self::Quiz => {
                "MODE: Mock exam. OUTPUT: a numbered questionnaire followed by a final \
                 answer key. NO explanations."
            }
            Self::Table => {
                "OUTPUT: a spreadsheet-compatible table using `|` as separator with the \
                 columns Concept | Data | Article | Note."
            }
            Self::Chat | Self::Summary => {
                "Answer in a technical, structured way. Use '###' for headings."
            }
        };
        format!("{PERSONA}{instruction}")
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiz => write!(f, "quiz"),
            Self::Chat => write!(f, "chat"),
            Self::Summary => write!(f, "summary"),
            Self::Table => write!(f, "table"),
        }
    }
}

impl FromStr for StudyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quiz" | "exam" => Ok(Self::Quiz),
            "chat" => Ok(Self::Chat),
            "summary" => Ok(Self::Summary),
            "table" | "excel" | "csv" => Ok(Self::Table),
            other => Err(format!(
                "unknown mode `{other}`, expected one of: quiz, chat, summary, table"
            )),
        }
    }
}

/// Assembles the single prompt string sent to the model.
///
/// Document text beyond `budget` characters is dropped.
pub fn build_prompt(mode: StudyMode, documents: &str, question: &str, budget: usize) -> String {
    format!(
        "{}\nDOCS: {}\nUSER: {}",
        mode.system_prompt(),
        truncate_chars(documents, budget),
        question
    )
}
