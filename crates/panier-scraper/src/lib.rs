pub mod dispatch;
pub mod error;
pub mod estimate;
pub mod normalize;
pub mod parse;
pub mod render;
pub mod score;
pub mod stores;

pub use dispatch::{summarize, BatchSummary, Estimator, StoreBatch};
pub use error::ScraperError;
pub use estimate::{reduce, PricePairing};
pub use normalize::normalize_text;
pub use render::{ChromiumRenderer, NavigationOptions, PageElement, RenderedPage, Renderer};
pub use score::fuzzy_score;
pub use stores::{PreStepReport, StoreAdapter, StoreProfile};
