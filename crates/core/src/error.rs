use thiserror::Error;

use crate::calculators::{CalculatorError, DecisionTreeError};
use crate::model::{CatalogError, ProgressError};

/// Any domain error raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Calculator(#[from] CalculatorError),
    #[error(transparent)]
    DecisionTree(#[from] DecisionTreeError),
}
