//! The object data model: the closed set of PDF object kinds.

mod array;
mod dictionary;
pub mod name;
mod primitive;
mod stream;
mod string;
pub mod well_known;

pub use array::Array;
pub use dictionary::Dictionary;
pub use name::Name;
pub use primitive::{Number, NumberValue, Object, ObjectId};
pub(crate) use primitive::NULL;
pub use stream::Stream;
pub use string::PdfString;
