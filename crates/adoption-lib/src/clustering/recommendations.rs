//! Rule-based descriptions of behavior clusters

use crate::features::{encode_energy, encode_training, EnergyLevel, TrainingLevel};
use crate::models::BehaviorProfile;
use serde::{Deserialize, Serialize};

/// Share of members above which a compatibility flag is called out
pub const COMPATIBILITY_THRESHOLD: f64 = 0.7;

/// Share of special-needs members above which experience is advised
pub const SPECIAL_NEEDS_THRESHOLD: f64 = 0.3;

/// Aggregate behavior of one cluster's members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub size: usize,
    pub dominant_energy: EnergyLevel,
    pub dominant_training: TrainingLevel,
    pub good_with_children: f64,
    pub good_with_dogs: f64,
    pub good_with_cats: f64,
    pub special_needs: f64,
}

impl ClusterProfile {
    /// Summarize members; dominant levels break ties toward the lower level
    pub fn from_members(members: &[&BehaviorProfile]) -> Self {
        let mut energy = [0usize; 4];
        let mut training = [0usize; 4];
        let mut flags = [0usize; 4];
        for p in members {
            energy[usize::from(encode_energy(&p.energy_level))] += 1;
            training[usize::from(encode_training(&p.training_level))] += 1;
            for (count, set) in flags.iter_mut().zip([
                p.good_with_children,
                p.good_with_dogs,
                p.good_with_cats,
                p.special_needs,
            ]) {
                *count += usize::from(set);
            }
        }
        let share = |count: usize| {
            if members.is_empty() {
                0.0
            } else {
                count as f64 / members.len() as f64
            }
        };
        Self {
            size: members.len(),
            dominant_energy: EnergyLevel::from_code(dominant(&energy)),
            dominant_training: TrainingLevel::from_code(dominant(&training)),
            good_with_children: share(flags[0]),
            good_with_dogs: share(flags[1]),
            good_with_cats: share(flags[2]),
            special_needs: share(flags[3]),
        }
    }

    /// Short label such as "High energy, basic training"
    pub fn label(&self) -> String {
        format!(
            "{} energy, {} training",
            self.dominant_energy.label(),
            self.dominant_training.label()
        )
    }

    pub fn recommendations(&self) -> Vec<String> {
        let mut out = vec![
            energy_advice(self.dominant_energy).to_string(),
            training_advice(self.dominant_training).to_string(),
        ];
        if self.good_with_children > COMPATIBILITY_THRESHOLD {
            out.push("Excellent family pet, good with children".to_string());
        }
        if self.good_with_dogs > COMPATIBILITY_THRESHOLD {
            out.push("Gets along well with other dogs".to_string());
        }
        if self.good_with_cats > COMPATIBILITY_THRESHOLD {
            out.push("Suitable for homes with cats".to_string());
        }
        if self.special_needs > SPECIAL_NEEDS_THRESHOLD {
            out.push("May require experienced adopters familiar with special needs".to_string());
        }
        out
    }
}

fn dominant(counts: &[usize; 4]) -> u8 {
    let mut best = 0;
    for (i, c) in counts.iter().enumerate() {
        if *c > counts[best] {
            best = i;
        }
    }
    best as u8
}

fn energy_advice(level: EnergyLevel) -> &'static str {
    match level {
        EnergyLevel::Low => "Calm temperament, suited to apartments and quieter homes",
        EnergyLevel::Medium => "Moderate exercise needs, daily walks and play are enough",
        EnergyLevel::High => "Needs an active home with regular exercise",
        EnergyLevel::VeryHigh => "Needs a very active adopter with space to run",
    }
}

fn training_advice(level: TrainingLevel) -> &'static str {
    match level {
        TrainingLevel::None => "Will benefit from basic obedience training",
        TrainingLevel::Basic => "Knows basic commands, continued training recommended",
        TrainingLevel::Intermediate => "Well trained, suitable for most adopters",
        TrainingLevel::Advanced => "Highly trained, good match for first-time adopters",
    }
}
