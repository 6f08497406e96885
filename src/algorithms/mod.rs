pub mod encoder;
pub mod lime;
pub mod saliency;
pub mod surrogate;
pub mod weighter;

pub use encoder::{DatasetEncoder, EncodedColumn, EncodedDataset};
pub use lime::{CompositeEncoding, LimeConfig, LimeExplainer};
pub use saliency::{ColumnAggregation, SaliencyAggregator};
pub use surrogate::{SurrogateFit, WeightedRidge};
pub use weighter::ProximityWeighter;
