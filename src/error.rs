use std::fmt::Display;

use serde_json::Number;

use crate::options::Facet;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidAlias(Facet),
    EmptyLogicalFilter(&'static str),
    MissingFilterField,
    NonFiniteNumeric(Facet, Number),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidAlias(facet) => {
                write!(f, "Invalid parameter name for {}", facet.default_name())
            }
            Error::EmptyLogicalFilter(operator) => {
                write!(f, "{} filter has no children", operator)
            }
            Error::MissingFilterField => write!(f, "Condition filter has no field"),
            Error::NonFiniteNumeric(facet, n) => {
                write!(f, "Invalid {} value: {}", facet.default_name(), n)
            }
        }
    }
}

impl std::error::Error for Error {}
