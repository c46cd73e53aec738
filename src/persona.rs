//! Persona table: who a draft sounds like and where its exemplars live.
//!
//! Personas are data. The two built-ins are `personal` and `admin`;
//! `[personas.<id>]` config tables patch them or add new ones without code
//! changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named response style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Persona {
    /// Stable identifier used in routes and responses.
    pub id: String,
    /// Similarity index collection holding this persona's past replies.
    pub collection: String,
    /// Who the replies are written as, e.g. "Jordan" or "the admin team".
    pub author: String,
    /// Name of the style, e.g. "Jordan's personal communication style".
    pub voice: String,
    /// Short style name heading the instruction checklist, e.g.
    /// "Jordan's personal style".
    pub style_label: String,
    /// Short tone description used in the task sentence.
    pub tone: String,
    /// System message for the generative model.
    pub system_instructions: String,
    /// Ordered style checklist rendered as bullets.
    pub style_directives: Vec<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_output_tokens: u32,
}

/// Partial persona definition from config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersonaOverride {
    /// Index collection.
    pub collection: Option<String>,
    /// Author name.
    pub author: Option<String>,
    /// Style name.
    pub voice: Option<String>,
    /// Checklist heading; defaults to the style name.
    pub style_label: Option<String>,
    /// Tone description.
    pub tone: Option<String>,
    /// System message.
    pub system_instructions: Option<String>,
    /// Style checklist.
    pub style_directives: Option<Vec<String>>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u32>,
}

/// Persona definition and lookup errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PersonaError {
    /// No persona is registered under this id.
    #[error("unknown persona '{0}'")]
    Unknown(String),
    /// Id contains characters outside `[a-z0-9_-]`.
    #[error("invalid persona id '{0}': use lowercase letters, digits, '-' or '_'")]
    InvalidId(String),
    /// A new persona omitted a field that has no default.
    #[error("persona '{id}' is missing required field '{field}'")]
    MissingField {
        /// Persona id.
        id: String,
        /// Missing field name.
        field: &'static str,
    },
    /// A field value is out of range.
    #[error("persona '{id}': {reason}")]
    Invalid {
        /// Persona id.
        id: String,
        /// What is wrong.
        reason: String,
    },
}

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 400;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

impl Persona {
    /// Jordan's warm, relationship-focused personal voice.
    pub fn personal() -> Self {
        Self {
            id: "personal".to_owned(),
            collection: "jordan-personal-emails".to_owned(),
            author: "Jordan".to_owned(),
            voice: "Jordan's personal communication style".to_owned(),
            style_label: "Jordan's personal style".to_owned(),
            tone: "warm, relationship-focused".to_owned(),
            system_instructions: "You are helping draft personal email responses that match \
                                  Jordan's warm, relationship-building communication style."
                .to_owned(),
            style_directives: strings(&[
                "Be warm and relationship-focused",
                "Use a friendly, approachable tone",
                "Show genuine interest in the person",
                "Keep responses conversational",
                "Match the length and formality of examples",
                "Include personal touches when appropriate",
            ]),
            temperature: 0.7,
            max_output_tokens: 400,
        }
    }

    /// The admin team's professional, service-oriented voice.
    pub fn admin() -> Self {
        Self {
            id: "admin".to_owned(),
            collection: "admin-team-emails".to_owned(),
            author: "the admin team".to_owned(),
            voice: "the admin team's professional style".to_owned(),
            style_label: "admin team style".to_owned(),
            tone: "professional, efficient".to_owned(),
            system_instructions: "You are helping draft admin team email responses that are \
                                  professional, efficient, and service-oriented."
                .to_owned(),
            style_directives: strings(&[
                "Be professional and efficient",
                "Focus on providing clear information",
                "Include specific details (dates, amounts, confirmations)",
                "Keep responses concise but complete",
                "Use a helpful, service-oriented tone",
                "Match the business-focused approach of examples",
            ]),
            temperature: 0.6,
            max_output_tokens: 400,
        }
    }

    fn apply(&mut self, patch: &PersonaOverride) {
        if let Some(v) = &patch.collection {
            self.collection.clone_from(v);
        }
        if let Some(v) = &patch.author {
            self.author.clone_from(v);
        }
        if let Some(v) = &patch.voice {
            self.voice.clone_from(v);
        }
        if let Some(v) = &patch.style_label {
            self.style_label.clone_from(v);
        }
        if let Some(v) = &patch.tone {
            self.tone.clone_from(v);
        }
        if let Some(v) = &patch.system_instructions {
            self.system_instructions.clone_from(v);
        }
        if let Some(v) = &patch.style_directives {
            self.style_directives.clone_from(v);
        }
        if let Some(v) = patch.temperature {
            self.temperature = v;
        }
        if let Some(v) = patch.max_output_tokens {
            self.max_output_tokens = v;
        }
    }

    fn from_override(id: &str, patch: &PersonaOverride) -> Result<Self, PersonaError> {
        fn required<'a>(
            id: &str,
            field: &'static str,
            value: &'a Option<String>,
        ) -> Result<&'a str, PersonaError> {
            value.as_deref().ok_or_else(|| PersonaError::MissingField {
                id: id.to_owned(),
                field,
            })
        }

        let collection = required(id, "collection", &patch.collection)?.to_owned();
        let author = required(id, "author", &patch.author)?.to_owned();
        let voice = required(id, "voice", &patch.voice)?.to_owned();
        Ok(Self {
            id: id.to_owned(),
            collection,
            author,
            style_label: patch.style_label.clone().unwrap_or_else(|| voice.clone()),
            voice,
            tone: required(id, "tone", &patch.tone)?.to_owned(),
            system_instructions: required(id, "system_instructions", &patch.system_instructions)?
                .to_owned(),
            style_directives: patch
                .style_directives
                .clone()
                .ok_or_else(|| PersonaError::MissingField {
                    id: id.to_owned(),
                    field: "style_directives",
                })?,
            temperature: patch.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_output_tokens: patch.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
        })
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError`] for a bad id, empty collection, no style
    /// directives, temperature outside `[0, 2]`, or a zero token limit.
    pub fn validate(&self) -> Result<(), PersonaError> {
        let id_ok = !self.id.is_empty()
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !id_ok {
            return Err(PersonaError::InvalidId(self.id.clone()));
        }
        let invalid = |reason: String| PersonaError::Invalid {
            id: self.id.clone(),
            reason,
        };
        if self.collection.trim().is_empty() {
            return Err(invalid("collection must not be empty".to_owned()));
        }
        if self.style_directives.iter().all(|d| d.trim().is_empty()) {
            return Err(invalid("style_directives must not be empty".to_owned()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(invalid("max_output_tokens must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Read-only persona table keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Persona>,
}

impl PersonaRegistry {
    /// The built-in `personal` and `admin` personas.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for persona in [Persona::personal(), Persona::admin()] {
            registry.personas.insert(persona.id.clone(), persona);
        }
        registry
    }

    /// Built-ins patched and extended by config overrides.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError`] if an override produces an invalid persona
    /// or a new persona lacks a required field.
    pub fn from_overrides<'a>(
        overrides: impl IntoIterator<Item = (&'a String, &'a PersonaOverride)>,
    ) -> Result<Self, PersonaError> {
        let mut registry = Self::builtin();
        for (id, patch) in overrides {
            match registry.personas.get_mut(id.as_str()) {
                Some(existing) => existing.apply(patch),
                None => {
                    let persona = Persona::from_override(id, patch)?;
                    registry.personas.insert(id.clone(), persona);
                }
            }
        }
        for persona in registry.personas.values() {
            persona.validate()?;
        }
        Ok(registry)
    }

    /// Build a registry from explicit personas.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn from_personas(personas: Vec<Persona>) -> Result<Self, PersonaError> {
        let mut registry = Self::default();
        for persona in personas {
            persona.validate()?;
            registry.personas.insert(persona.id.clone(), persona);
        }
        Ok(registry)
    }

    /// Look up a persona.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Unknown`] when no persona has this id.
    pub fn get(&self, id: &str) -> Result<&Persona, PersonaError> {
        self.personas
            .get(id)
            .ok_or_else(|| PersonaError::Unknown(id.to_owned()))
    }

    /// Persona ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.personas.keys().map(String::as_str).collect()
    }

    /// Distinct collection names in sorted order.
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .personas
            .values()
            .map(|p| p.collection.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Iterate personas in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    /// Number of personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
