mod constraints;
mod formats;

pub use constraints::{AnswerConstraints, AnswerRejection};
pub use formats::{FormatValidator, StandardFormats};
