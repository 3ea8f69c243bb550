//! Feature extraction from shelter records

mod encoding;
mod extractor;
mod schema;

pub use encoding::{
    coerce_flag, encode_energy, encode_size, encode_species, encode_training, normalize_age,
    AgeCategory, EnergyLevel, TrainingLevel,
};
pub use extractor::{
    FeatureExtractor, DEFAULT_ADOPTION_FEE, DEFAULT_WEIGHT, MAX_HEALTH_SEVERITY,
    NUM_BEHAVIOR_FEATURES,
};
pub use schema::{FeatureField, FeatureKind, FeatureSchema, FeatureVector, SCHEMA_VERSION};
