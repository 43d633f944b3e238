/// Data layer: core types, loading, caching, filtering and chart projections.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → BaseTable (sorted, unique dates)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  load once, explicit reload, mtime polling
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  year stage → slider bounds → range stages → FilteredView
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ projection  │  FilteredView → four chart series
///   └────────────┘
/// ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod projection;
