mod attempt;
mod bookmark;
pub mod catalog;
mod ids;
mod progress;
mod summary;
mod user;

pub use ids::{
    AttemptId, BookmarkId, ModuleId, OptionId, ParseIdError, ProgressId, QuestionId, UserId,
};

pub use attempt::{Answers, QuizAttempt};
pub use bookmark::Bookmark;
pub use catalog::{
    CalculatorType, Catalog, CatalogError, InteractiveElement, InteractiveKind, Module,
    ModuleContent, Question, Quiz, QuizOption, Section, SectionKind,
};
pub use progress::{ProgressError, ProgressRecord, ProgressUpdate};
pub use summary::{
    CERTIFICATE_ALPHABET, CERTIFICATE_PREFIX, CERTIFICATE_SUFFIX_LEN, Certificate, CourseSummary,
    ModuleStatus, is_certificate_id,
};
pub use user::{DEFAULT_USERNAME, NewUser, User};
