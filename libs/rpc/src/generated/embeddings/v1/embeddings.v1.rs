// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct EmbedRequest {
    #[prost(string, repeated, tag = "1")]
    pub inputs: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "2")]
    pub normalize: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "3")]
    pub prompt_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "4")]
    pub truncate: ::core::option::Option<bool>,
    #[prost(enumeration = "TruncationDirection", optional, tag = "5")]
    pub truncation_direction: ::core::option::Option<i32>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Embedding {
    #[prost(float, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<f32>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmbedResponse {
    #[prost(message, repeated, tag = "1")]
    pub embeddings: ::prost::alloc::vec::Vec<Embedding>,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct EmbedAllRequest {
    #[prost(string, repeated, tag = "1")]
    pub inputs: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub prompt_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "3")]
    pub truncate: ::core::option::Option<bool>,
    #[prost(enumeration = "TruncationDirection", optional, tag = "4")]
    pub truncation_direction: ::core::option::Option<i32>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokenEmbeddings {
    #[prost(message, repeated, tag = "1")]
    pub embeddings: ::prost::alloc::vec::Vec<Embedding>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmbedAllResponse {
    #[prost(message, repeated, tag = "1")]
    pub token_embeddings: ::prost::alloc::vec::Vec<TokenEmbeddings>,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct EmbedSparseRequest {
    #[prost(string, repeated, tag = "1")]
    pub inputs: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub prompt_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "3")]
    pub truncate: ::core::option::Option<bool>,
    #[prost(enumeration = "TruncationDirection", optional, tag = "4")]
    pub truncation_direction: ::core::option::Option<i32>,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SparseValue {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(float, tag = "2")]
    pub value: f32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SparseEmbedding {
    #[prost(message, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<SparseValue>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmbedSparseResponse {
    #[prost(message, repeated, tag = "1")]
    pub sparse_embeddings: ::prost::alloc::vec::Vec<SparseEmbedding>,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SimilarityParameters {
    #[prost(string, optional, tag = "1")]
    pub prompt_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "2")]
    pub truncate: ::core::option::Option<bool>,
    #[prost(enumeration = "TruncationDirection", optional, tag = "3")]
    pub truncation_direction: ::core::option::Option<i32>,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SimilarityRequest {
    #[prost(string, tag = "1")]
    pub source_sentence: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub sentences: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "3")]
    pub parameters: ::core::option::Option<SimilarityParameters>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SimilarityResponse {
    #[prost(float, repeated, tag = "1")]
    pub similarities: ::prost::alloc::vec::Vec<f32>,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TruncationDirection {
    Unspecified = 0,
    Left = 1,
    Right = 2,
}
impl TruncationDirection {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "TRUNCATION_DIRECTION_UNSPECIFIED",
            Self::Left => "TRUNCATION_DIRECTION_LEFT",
            Self::Right => "TRUNCATION_DIRECTION_RIGHT",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "TRUNCATION_DIRECTION_UNSPECIFIED" => Some(Self::Unspecified),
            "TRUNCATION_DIRECTION_LEFT" => Some(Self::Left),
            "TRUNCATION_DIRECTION_RIGHT" => Some(Self::Right),
            _ => None,
        }
    }
}
include!("embeddings.v1.tonic.rs");
// @@protoc_insertion_point(module)
