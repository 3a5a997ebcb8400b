//! Feature specifications and padding-value resolution.

pub mod config;
pub mod padding;
pub mod resolver;
pub mod spec;

pub use config::FeatureConfig;
pub use padding::{PaddingPolicy, PaddingRegistry, ZeroPadding};
pub use resolver::{ResolvedSpecs, SpecResolver, scalar_default};
pub use spec::{DefaultValue, FeatureSpec, FeatureSpecs, FixedLenFeature, SequenceFeatureSpec, VarLenFeature};
