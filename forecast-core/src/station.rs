//! Environment Canada city-page documents.

pub mod daily;
pub mod parser;
pub mod xml;

pub use daily::{RawPeriod, merge_periods};
pub use parser::parse_station_document;
pub use xml::decode_document;
