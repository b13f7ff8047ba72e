/// Analysis pipeline: strategies, their registry, and the document that
/// drives them.
///
/// ```text
///   DataProvider(s)
///        │
///        ▼
///   ┌──────────────────┐  available_strategies   ┌──────────────────┐
///   │ AnalysisDocument  │ ─────────────────────▶ │ StrategyRegistry  │
///   └──────────────────┘ ◀── Box<dyn Strategy> ─ └──────────────────┘
///        │ execute                                  │ StrategyBuilder
///        ▼                                          ▼
///   ┌──────────────┐   reduce   ┌─────────────────────────┐
///   │   Strategy    │ ────────▶ │ WeightedReductionEngine  │
///   └──────────────┘            └─────────────────────────┘
///        │ persist
///        ▼
///   ArtifactStore  →  Asset
/// ```

pub mod artifact;
pub mod document;
pub mod pin_power;
pub mod reduction;
pub mod registry;
pub mod strategy;
