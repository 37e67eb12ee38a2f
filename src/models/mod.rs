//! Data model types shared by engines and the facade.

mod criteria;
mod result;
mod value;

pub use criteria::{Criterion, CriterionGroup, GroupNode, Where};
pub use result::{Backend, QueryKind, QueryResult, Row};
pub use value::{DEFAULT_QUOTE, SqlValue};
