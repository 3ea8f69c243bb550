//! Synthetic shelter data shared by unit tests

use crate::models::{AdoptionOutcome, AnimalRecord, BehaviorProfile, LabeledExample, ShelterRecord};
use serde_json::json;

pub fn animal(id: &str) -> AnimalRecord {
    AnimalRecord {
        id: id.to_string(),
        name: format!("animal-{}", id),
        species: "dog".to_string(),
        size: "medium".to_string(),
        age: "3 years".to_string(),
        weight: json!(20.0),
        vaccinated: json!(true),
        adoption_fee: json!(120.0),
        days_in_care: json!(30),
        prior_owner: json!(false),
        health_severity: json!(0),
    }
}

pub fn profile(energy: &str, training: &str, children: bool, dogs: bool, cats: bool, special: bool) -> BehaviorProfile {
    BehaviorProfile {
        energy_level: energy.to_string(),
        training_level: training.to_string(),
        good_with_children: children,
        good_with_dogs: dogs,
        good_with_cats: cats,
        special_needs: special,
    }
}

/// An animal that looks like past approved adoptions
pub fn adoptable(i: usize) -> ShelterRecord {
    let mut a = animal(&format!("a{}", i));
    a.size = "small".to_string();
    a.age = format!("{} months", 8 + i % 5);
    a.weight = json!(8.0 + (i % 4) as f64);
    a.adoption_fee = json!(60.0 + (i % 3) as f64 * 5.0);
    a.days_in_care = json!(10 + i % 6);
    ShelterRecord {
        animal: a,
        behavior: Some(profile("medium", "advanced", true, true, i % 2 == 0, false)),
        outcome: Some(AdoptionOutcome::Approved),
        likely_adoptable: None,
    }
}

/// An animal that looks like past rejected applications
pub fn hard_to_place(i: usize) -> ShelterRecord {
    let mut a = animal(&format!("h{}", i));
    a.species = "rabbit".to_string();
    a.size = "xl".to_string();
    a.age = format!("{} years", 10 + i % 4);
    a.weight = json!(38.0 + (i % 5) as f64);
    a.vaccinated = json!("no");
    a.adoption_fee = json!(280.0 + (i % 3) as f64 * 10.0);
    a.days_in_care = json!(200 + (i % 7) * 10);
    a.health_severity = json!(2 + i % 2);
    ShelterRecord {
        animal: a,
        behavior: Some(profile("very-high", "none", false, i % 3 == 0, false, true)),
        outcome: Some(AdoptionOutcome::Rejected),
        likely_adoptable: None,
    }
}

/// `positives` adoptable records followed by `negatives` hard-to-place ones
pub fn shelter_records(positives: usize, negatives: usize) -> Vec<ShelterRecord> {
    (0..positives)
        .map(adoptable)
        .chain((0..negatives).map(hard_to_place))
        .collect()
}

pub fn labeled(positives: usize, negatives: usize) -> Vec<LabeledExample> {
    shelter_records(positives, negatives)
        .iter()
        .filter_map(ShelterRecord::to_labeled)
        .collect()
}
