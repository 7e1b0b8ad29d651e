//! Rule-based field extractors for the reconciliation pipeline.

pub mod factura;
pub mod patterns;
pub mod placa;

pub use factura::{CorreosExtraction, FacturaExtractor};
pub use placa::{PlacaExtractor, PLACA_UNKNOWN};
