use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ModuleId, OptionId, QuestionId};

/// Course content shipped with the crate.
const BUILTIN_CATALOG: &str = include_str!("../../data/course.json");

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a catalog document is rejected at load time.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog has no modules")]
    Empty,

    #[error("module ids must run 1..N in order: expected {expected}, found {found}")]
    ModuleOutOfOrder { expected: ModuleId, found: ModuleId },

    #[error("module {module}: hasQuiz does not match quiz presence")]
    QuizFlagMismatch { module: ModuleId },

    #[error("module {module}: quiz has no questions")]
    EmptyQuiz { module: ModuleId },

    #[error("module {module}: passing score {score} is above 100")]
    InvalidPassingScore { module: ModuleId, score: u8 },

    #[error("module {module}: duplicate question id {question}")]
    DuplicateQuestion { module: ModuleId, question: QuestionId },

    #[error("module {module}, question {question}: duplicate option id {option}")]
    DuplicateOption {
        module: ModuleId,
        question: QuestionId,
        option: OptionId,
    },

    #[error("module {module}, question {question}: correct answer {answer} is not an option")]
    UnknownCorrectAnswer {
        module: ModuleId,
        question: QuestionId,
        answer: OptionId,
    },

    #[error("module {module}: duplicate section id {section}")]
    DuplicateSection { module: ModuleId, section: String },
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Text,
    Interactive,
    Image,
    Objectives,
    Calculator,
}

/// Widget embedded in an interactive section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractiveKind {
    Checklist,
    Rating,
    Calculator,
    FacilityDesign,
    RiskMatrix,
    FmeaCalculator,
    HaccpDecisionTree,
    RiskAssessmentFlowchart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculatorType {
    Thc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveElement {
    #[serde(rename = "type")]
    pub kind: InteractiveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculator_type: Option<CalculatorType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<InteractiveElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: OptionId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<QuizOption>,
    pub correct_answer: OptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&QuizOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

/// A module's knowledge check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub questions: Vec<Question>,
    /// Minimum percentage (0-100) needed to pass.
    pub passing_score: u8,
}

impl Quiz {
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContent {
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    /// Human-readable estimate such as `"2-3 hours"`.
    pub duration: String,
    pub objectives: u32,
    pub has_quiz: bool,
    pub content: ModuleContent,
}

impl Module {
    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.content.quiz.as_ref()
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.content.sections.iter().find(|s| s.id == id)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let module = self.id;

        let mut sections = HashSet::new();
        for section in &self.content.sections {
            if !sections.insert(section.id.as_str()) {
                return Err(CatalogError::DuplicateSection {
                    module,
                    section: section.id.clone(),
                });
            }
        }

        if self.has_quiz != self.content.quiz.is_some() {
            return Err(CatalogError::QuizFlagMismatch { module });
        }
        let Some(quiz) = &self.content.quiz else {
            return Ok(());
        };

        if quiz.questions.is_empty() {
            return Err(CatalogError::EmptyQuiz { module });
        }
        if quiz.passing_score > 100 {
            return Err(CatalogError::InvalidPassingScore {
                module,
                score: quiz.passing_score,
            });
        }

        let mut questions = HashSet::new();
        for question in &quiz.questions {
            if !questions.insert(&question.id) {
                return Err(CatalogError::DuplicateQuestion {
                    module,
                    question: question.id.clone(),
                });
            }

            let mut options = HashSet::new();
            for option in &question.options {
                if !options.insert(&option.id) {
                    return Err(CatalogError::DuplicateOption {
                        module,
                        question: question.id.clone(),
                        option: option.id.clone(),
                    });
                }
            }

            if !options.contains(&question.correct_answer) {
                return Err(CatalogError::UnknownCorrectAnswer {
                    module,
                    question: question.id.clone(),
                    answer: question.correct_answer.clone(),
                });
            }
        }

        Ok(())
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct CatalogDocument {
    modules: Vec<Module>,
}

/// Ordered, validated, read-only list of course modules.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    modules: Vec<Module>,
}

impl Catalog {
    /// Parse and validate a catalog document of the form `{"modules": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON and the structural
    /// variants for ordering or quiz consistency problems.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::new(document.modules)
    }

    /// Validate an already-built module list.
    ///
    /// # Errors
    ///
    /// See [`Catalog::from_json`].
    pub fn new(modules: Vec<Module>) -> Result<Self, CatalogError> {
        if modules.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, module) in modules.iter().enumerate() {
            let expected = ModuleId::new(index as u64 + 1);
            if module.id != expected {
                return Err(CatalogError::ModuleOutOfOrder {
                    expected,
                    found: module.id,
                });
            }
            module.validate()?;
        }
        Ok(Self { modules })
    }

    /// The course content embedded in the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded document itself is broken.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        let index = usize::try_from(id.value()).ok()?.checked_sub(1)?;
        self.modules.get(index)
    }

    #[must_use]
    pub fn contains(&self, id: ModuleId) -> bool {
        self.module(id).is_some()
    }

    #[must_use]
    pub fn quiz(&self, id: ModuleId) -> Option<&Quiz> {
        self.module(id).and_then(Module::quiz)
    }

    /// Module after `id`, if any.
    #[must_use]
    pub fn next(&self, id: ModuleId) -> Option<&Module> {
        self.module(ModuleId::new(id.value().checked_add(1)?))
    }

    /// Module before `id`, if any.
    #[must_use]
    pub fn previous(&self, id: ModuleId) -> Option<&Module> {
        self.module(ModuleId::new(id.value().checked_sub(1)?))
    }
}
