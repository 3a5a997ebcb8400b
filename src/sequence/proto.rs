//! `SequenceExample` protobuf messages.
//!
//! Wire-compatible with `tensorflow/core/example/{feature,example}.proto`.
//! Field tags and packing follow those definitions.

use std::collections::HashMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Features {
    #[prost(map = "string, message", tag = "1")]
    pub feature: HashMap<String, Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FeatureList {
    #[prost(message, repeated, tag = "1")]
    pub feature: Vec<Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FeatureLists {
    #[prost(map = "string, message", tag = "1")]
    pub feature_list: HashMap<String, FeatureList>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SequenceExample {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Features>,
    #[prost(message, optional, tag = "2")]
    pub feature_lists: Option<FeatureLists>,
}

impl Feature {
    pub fn floats(values: Vec<f32>) -> Self {
        Self {
            kind: Some(feature::Kind::FloatList(FloatList { value: values })),
        }
    }

    pub fn int64s(values: Vec<i64>) -> Self {
        Self {
            kind: Some(feature::Kind::Int64List(Int64List { value: values })),
        }
    }

    pub fn bytes<I, B>(values: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            kind: Some(feature::Kind::BytesList(BytesList {
                value: values.into_iter().map(Into::into).collect(),
            })),
        }
    }

    /// A feature with no value list at all.
    pub fn empty() -> Self {
        Self { kind: None }
    }
}

impl SequenceExample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context<S: Into<String>>(mut self, name: S, feature: Feature) -> Self {
        self.context
            .get_or_insert_with(Features::default)
            .feature
            .insert(name.into(), feature);
        self
    }

    pub fn with_feature_list<S: Into<String>>(mut self, name: S, features: Vec<Feature>) -> Self {
        self.feature_lists
            .get_or_insert_with(FeatureLists::default)
            .feature_list
            .insert(name.into(), FeatureList { feature: features });
        self
    }

    pub fn context_feature(&self, name: &str) -> Option<&Feature> {
        self.context.as_ref().and_then(|c| c.feature.get(name))
    }

    pub fn feature_list(&self, name: &str) -> Option<&FeatureList> {
        self.feature_lists
            .as_ref()
            .and_then(|lists| lists.feature_list.get(name))
    }
}
