//! Turning raw export rows into canonical readings: header canonicalization,
//! timestamp decoding and asset identity.

pub mod asset;
pub mod schema;
pub mod timestamp;

pub use asset::AssetResolver;
pub use schema::ColumnMap;
pub use timestamp::{decode_column, DecodedColumn};
