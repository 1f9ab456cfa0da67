use std::sync::LazyLock;

use core_config::{ConfigError, FromEnv, env_parse};
use regex::Regex;
use serde_json::json;
use validator::Validate;

use crate::error::{MultiValidationError, ValidationError};
use crate::models::{
    EmbedAllRequest, EmbedOptions, EmbedRequest, EmbedSparseRequest, SimilarityRequest,
    TruncationDirection,
};

static PROMPT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

/// Limits applied to every request before it reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ValidationConfig {
    /// Maximum characters per text (default: 8192)
    #[validate(range(min = 1))]
    pub max_input_length: usize,
    /// Maximum texts per request (default: 32)
    #[validate(range(min = 1))]
    pub max_batch_size: usize,
    /// Maximum candidate sentences per similarity request (default: 100)
    #[validate(range(min = 1))]
    pub max_sentences_count: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_input_length: 8192,
            max_batch_size: 32,
            max_sentences_count: 100,
        }
    }
}

impl FromEnv for ValidationConfig {
    /// Reads `TEI_MAX_INPUT_LENGTH`, `TEI_MAX_BATCH_SIZE` and `TEI_MAX_SENTENCES_COUNT`.
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_input_length: env_parse("TEI_MAX_INPUT_LENGTH", defaults.max_input_length)?,
            max_batch_size: env_parse("TEI_MAX_BATCH_SIZE", defaults.max_batch_size)?,
            max_sentences_count: env_parse(
                "TEI_MAX_SENTENCES_COUNT",
                defaults.max_sentences_count,
            )?,
        };
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

/// Stateless rule checker for request payloads.
///
/// Never mutates its input; defaulting is the caller's job and must happen first.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Rejects blank text and text longer than `max_input_length` characters.
    ///
    /// `&str` is always valid UTF-8; invalid bytes are refused by protobuf
    /// decoding before a request gets here.
    pub fn validate_text(&self, text: &str, field: &str) -> Result<(), ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::new(field, "cannot be empty").with_value(text));
        }

        let length = text.chars().count();
        if length > self.config.max_input_length {
            return Err(ValidationError::new(field, "exceeds maximum length").with_value(
                json!({ "length": length, "max_length": self.config.max_input_length }),
            ));
        }

        Ok(())
    }

    /// Checks the batch as a whole, then every element, reporting each offender
    /// under an indexed field name such as `inputs[2]`.
    pub fn validate_texts(&self, texts: &[String], field: &str) -> Result<(), MultiValidationError> {
        let mut errors = MultiValidationError::new();

        if texts.is_empty() {
            errors.add(field, "cannot be empty", Some(json!(0)));
            return errors.into_result();
        }

        if texts.len() > self.config.max_batch_size {
            errors.add(
                field,
                "exceeds maximum batch size",
                Some(json!({ "size": texts.len(), "max_size": self.config.max_batch_size })),
            );
        }

        self.collect_text_errors(texts, field, &mut errors);
        errors.into_result()
    }

    /// Absent and empty names pass; anything else must match `[A-Za-z0-9_-]+`.
    pub fn validate_prompt_name(&self, prompt_name: Option<&str>) -> Result<(), ValidationError> {
        match prompt_name {
            None | Some("") => Ok(()),
            Some(name) if PROMPT_NAME.is_match(name) => Ok(()),
            Some(name) => Err(ValidationError::new(
                "prompt_name",
                "must contain only letters, numbers, underscores, and hyphens",
            )
            .with_value(name)),
        }
    }

    /// Maps a raw wire enum value onto a direction.
    ///
    /// Absent and unspecified (0) mean "not set"; unknown values are rejected.
    pub fn validate_truncation_direction(
        raw: Option<i32>,
    ) -> Result<Option<TruncationDirection>, ValidationError> {
        use rpc::embeddings::TruncationDirection as Wire;

        match raw.map(Wire::try_from) {
            None | Some(Ok(Wire::Unspecified)) => Ok(None),
            Some(Ok(Wire::Left)) => Ok(Some(TruncationDirection::Left)),
            Some(Ok(Wire::Right)) => Ok(Some(TruncationDirection::Right)),
            Some(Err(_)) => Err(ValidationError::new(
                "truncation_direction",
                "must be LEFT or RIGHT",
            )
            .with_value(raw)),
        }
    }

    pub fn validate_embed_request(&self, request: &EmbedRequest) -> Result<(), MultiValidationError> {
        self.validate_inputs_and_options(request.inputs.as_slice(), &request.options)
    }

    pub fn validate_embed_all_request(
        &self,
        request: &EmbedAllRequest,
    ) -> Result<(), MultiValidationError> {
        self.validate_inputs_and_options(request.inputs.as_slice(), &request.options)
    }

    pub fn validate_embed_sparse_request(
        &self,
        request: &EmbedSparseRequest,
    ) -> Result<(), MultiValidationError> {
        self.validate_inputs_and_options(request.inputs.as_slice(), &request.options)
    }

    /// Source sentence, then the candidate count limit, then the candidates
    /// under the same rules as any other batch.
    pub fn validate_similarity_request(
        &self,
        request: &SimilarityRequest,
    ) -> Result<(), MultiValidationError> {
        let mut errors = MultiValidationError::new();
        let sentences = &request.inputs.sentences;

        if let Err(e) = self.validate_text(&request.inputs.source_sentence, "source_sentence") {
            errors.push(e);
        }

        if sentences.len() > self.config.max_sentences_count {
            errors.add(
                "sentences",
                "exceeds maximum sentences count",
                Some(json!({
                    "count": sentences.len(),
                    "max_count": self.config.max_sentences_count,
                })),
            );
        } else if let Err(e) = self.validate_texts(sentences, "sentences") {
            errors.extend(e);
        }

        if let Some(parameters) = &request.parameters {
            self.collect_option_errors(parameters, &mut errors);
        }

        errors.into_result()
    }

    fn validate_inputs_and_options(
        &self,
        inputs: &[String],
        options: &EmbedOptions,
    ) -> Result<(), MultiValidationError> {
        let mut errors = MultiValidationError::new();
        if let Err(e) = self.validate_texts(inputs, "inputs") {
            errors.extend(e);
        }
        self.collect_option_errors(options, &mut errors);
        errors.into_result()
    }

    fn collect_text_errors(&self, texts: &[String], field: &str, errors: &mut MultiValidationError) {
        for (i, text) in texts.iter().enumerate() {
            if let Err(e) = self.validate_text(text, &format!("{}[{}]", field, i)) {
                errors.push(e);
            }
        }
    }

    fn collect_option_errors(&self, options: &EmbedOptions, errors: &mut MultiValidationError) {
        if let Err(e) = self.validate_prompt_name(options.prompt_name.as_deref()) {
            errors.push(e);
        }
    }
}
