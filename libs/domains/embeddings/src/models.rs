use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Backend endpoints, one per operation.
pub const ENDPOINT_EMBED: &str = "/embed";
pub const ENDPOINT_EMBED_ALL: &str = "/embed_all";
pub const ENDPOINT_EMBED_SPARSE: &str = "/embed_sparse";
pub const ENDPOINT_SIMILARITY: &str = "/similarity";

pub const DEFAULT_NORMALIZE: bool = true;
pub const DEFAULT_TRUNCATE: bool = false;

/// Which end of an over-length input the backend trims.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum TruncationDirection {
    Left,
    #[default]
    Right,
}

/// One or more input texts.
///
/// On the wire a single text is a bare JSON string and several are an array;
/// both forms are accepted when decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs(Vec<String>);

impl Inputs {
    pub fn new(texts: Vec<String>) -> Self {
        Self(texts)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Inputs {
    fn from(texts: Vec<String>) -> Self {
        Self(texts)
    }
}

impl From<&str> for Inputs {
    fn from(text: &str) -> Self {
        Self(vec![text.to_string()])
    }
}

impl From<String> for Inputs {
    fn from(text: String) -> Self {
        Self(vec![text])
    }
}

impl Serialize for Inputs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Inputs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        match Raw::deserialize(deserializer) {
            Ok(Raw::One(text)) => Ok(Self(vec![text])),
            Ok(Raw::Many(texts)) => Ok(Self(texts)),
            Err(_) => Err(serde::de::Error::custom(
                "input must be a string or array of strings",
            )),
        }
    }
}

/// Fields shared by every embed-style request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_direction: Option<TruncationDirection>,
}

impl EmbedOptions {
    /// Fill unset fields. An empty prompt name counts as unset.
    pub fn set_defaults(&mut self) {
        if self.prompt_name.as_deref().is_some_and(str::is_empty) {
            self.prompt_name = None;
        }
        self.truncate.get_or_insert(DEFAULT_TRUNCATE);
        self.truncation_direction
            .get_or_insert(TruncationDirection::default());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub inputs: Inputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(flatten)]
    pub options: EmbedOptions,
}

impl EmbedRequest {
    pub fn new(inputs: impl Into<Inputs>) -> Self {
        Self {
            inputs: inputs.into(),
            ..Default::default()
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn set_defaults(&mut self) {
        self.normalize.get_or_insert(DEFAULT_NORMALIZE);
        self.options.set_defaults();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAllRequest {
    pub inputs: Inputs,
    #[serde(flatten)]
    pub options: EmbedOptions,
}

impl EmbedAllRequest {
    pub fn new(inputs: impl Into<Inputs>) -> Self {
        Self {
            inputs: inputs.into(),
            ..Default::default()
        }
    }

    pub fn set_defaults(&mut self) {
        self.options.set_defaults();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSparseRequest {
    pub inputs: Inputs,
    #[serde(flatten)]
    pub options: EmbedOptions,
}

impl EmbedSparseRequest {
    pub fn new(inputs: impl Into<Inputs>) -> Self {
        Self {
            inputs: inputs.into(),
            ..Default::default()
        }
    }

    pub fn set_defaults(&mut self) {
        self.options.set_defaults();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityInputs {
    pub source_sentence: String,
    pub sentences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub inputs: SimilarityInputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<EmbedOptions>,
}

impl SimilarityRequest {
    pub fn new(source_sentence: impl Into<String>, sentences: Vec<String>) -> Self {
        Self {
            inputs: SimilarityInputs {
                source_sentence: source_sentence.into(),
                sentences,
            },
            parameters: None,
        }
    }

    pub fn set_defaults(&mut self) {
        self.parameters
            .get_or_insert_with(EmbedOptions::default)
            .set_defaults();
    }
}

/// One dense vector per input.
pub type Embeddings = Vec<Vec<f32>>;

/// Per input, one dense vector per token.
pub type TokenEmbeddings = Vec<Vec<Vec<f32>>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseValue {
    pub index: u32,
    pub value: f32,
}

/// Per input, the non-zero `(index, value)` pairs.
pub type SparseEmbeddings = Vec<Vec<SparseValue>>;

/// Response body from the backend.
///
/// TEI answers with a bare JSON array; some deployments wrap it in an object
/// keyed by `embeddings` or `similarities`. Both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BackendPayload<T> {
    Bare(T),
    Embeddings { embeddings: T },
    Similarities { similarities: T },
}

impl<T> BackendPayload<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            BackendPayload::Bare(inner)
            | BackendPayload::Embeddings { embeddings: inner }
            | BackendPayload::Similarities {
                similarities: inner,
            } => inner,
        }
    }
}

/// A candidate ranked by similarity to a source sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarSentence {
    pub index: usize,
    pub sentence: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostSimilar {
    pub source_sentence: String,
    pub top_matches: Vec<SimilarSentence>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_input_round_trip() {
        let inputs = Inputs::from("hello");
        let encoded = serde_json::to_value(&inputs).unwrap();
        assert_eq!(encoded, json!("hello"));

        let decoded: Inputs = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.as_slice(), ["hello"]);
    }

    #[test]
    fn test_multi_input_round_trip_preserves_order() {
        let inputs = Inputs::new(vec!["b".into(), "a".into(), "c".into()]);
        let encoded = serde_json::to_value(&inputs).unwrap();
        assert_eq!(encoded, json!(["b", "a", "c"]));

        let decoded: Inputs = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, inputs);
    }

    #[test]
    fn test_inputs_reject_other_json() {
        let err = serde_json::from_value::<Inputs>(json!(42)).unwrap_err();
        assert!(err.to_string().contains("string or array of strings"));
    }

    #[test]
    fn test_embed_defaults() {
        let mut request = EmbedRequest::new("hi");
        request.set_defaults();

        assert_eq!(request.normalize, Some(true));
        assert_eq!(request.options.truncate, Some(false));
        assert_eq!(
            request.options.truncation_direction,
            Some(TruncationDirection::Right)
        );
        assert_eq!(request.options.prompt_name, None);
    }

    #[test]
    fn test_defaults_keep_explicit_values() {
        let mut request = EmbedRequest::new("hi").with_normalize(false);
        request.options.truncate = Some(true);
        request.options.truncation_direction = Some(TruncationDirection::Left);
        request.options.prompt_name = Some("query".into());
        request.set_defaults();

        assert_eq!(request.normalize, Some(false));
        assert_eq!(request.options.truncate, Some(true));
        assert_eq!(
            request.options.truncation_direction,
            Some(TruncationDirection::Left)
        );
        assert_eq!(request.options.prompt_name.as_deref(), Some("query"));
    }

    #[test]
    fn test_empty_prompt_name_is_dropped() {
        let mut request = EmbedAllRequest::new("hi");
        request.options.prompt_name = Some(String::new());
        request.set_defaults();
        assert_eq!(request.options.prompt_name, None);
    }

    #[test]
    fn test_embed_request_wire_format() {
        let mut request = EmbedRequest::new("hi");
        request.set_defaults();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "inputs": "hi",
                "normalize": true,
                "truncate": false,
                "truncation_direction": "Right",
            })
        );
    }

    #[test]
    fn test_unset_fields_are_not_sent() {
        let request = EmbedSparseRequest::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "inputs": ["a", "b"] })
        );
    }

    #[test]
    fn test_similarity_request_wire_format() {
        let mut request = SimilarityRequest::new("source", vec!["x".into(), "y".into()]);
        request.set_defaults();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "inputs": { "source_sentence": "source", "sentences": ["x", "y"] },
                "parameters": { "truncate": false, "truncation_direction": "Right" },
            })
        );
    }

    #[test]
    fn test_backend_payload_shapes() {
        let bare: BackendPayload<Embeddings> =
            serde_json::from_value(json!([[0.1, 0.2]])).unwrap();
        assert_eq!(bare.into_inner(), vec![vec![0.1, 0.2]]);

        let wrapped: BackendPayload<Embeddings> =
            serde_json::from_value(json!({ "embeddings": [[0.5]] })).unwrap();
        assert_eq!(wrapped.into_inner(), vec![vec![0.5]]);

        let scores: BackendPayload<Vec<f32>> =
            serde_json::from_value(json!({ "similarities": [0.9, 0.1] })).unwrap();
        assert_eq!(scores.into_inner(), vec![0.9, 0.1]);

        let sparse: BackendPayload<SparseEmbeddings> =
            serde_json::from_value(json!([[{ "index": 3, "value": 0.25 }]])).unwrap();
        assert_eq!(
            sparse.into_inner(),
            vec![vec![SparseValue {
                index: 3,
                value: 0.25
            }]]
        );
    }
}
