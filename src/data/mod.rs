/// Data layer: matrices, providers, and file loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TimeSeriesProvider
///   └──────────┘
///        │
///        ▼
///   ┌───────────────────┐
///   │ dyn DataProvider   │  time steps → feature → Vec<Matrix>
///   └───────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  matrix   │  dense row-major f64 grid
///   └──────────┘
/// ```

pub mod loader;
pub mod matrix;
pub mod model;
