/// Data layer: rows, loading, column selection and output.
///
/// Architecture:
/// ```text
///  .tsv / .csv / .gz / .bz2 / .parquet / .json / stdin
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  open input → stream of Row
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  fields   │  index spec → FieldSelection → selected cells
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Row → delimiter-joined line
///   └──────────┘
/// ```

pub mod fields;
pub mod loader;
pub mod model;
pub mod writer;
