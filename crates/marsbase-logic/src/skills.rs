//! Skill ledger, natural attributes and experience progression.
//!
//! Every task tick writes time-proportional experience into one or more
//! skills. Experience accumulates per skill and raises the level each
//! time it reaches `25 * 2^level`.
//!
//! ```
//! use marsbase_logic::skills::{SkillManager, SkillType};
//!
//! let mut skills = SkillManager::default();
//! skills.add_experience(SkillType::Mechanics, 30.0);
//! assert_eq!(skills.level(SkillType::Mechanics), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Skills a person can train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillType {
    Areology,
    Botany,
    Chemistry,
    Cooking,
    EvaOperations,
    Materials,
    Mechanics,
    Medicine,
    Physics,
    Teaching,
}

impl SkillType {
    pub const ALL: [SkillType; 10] = [
        SkillType::Areology,
        SkillType::Botany,
        SkillType::Chemistry,
        SkillType::Cooking,
        SkillType::EvaOperations,
        SkillType::Materials,
        SkillType::Mechanics,
        SkillType::Medicine,
        SkillType::Physics,
        SkillType::Teaching,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SkillType::Areology => "Areology",
            SkillType::Botany => "Botany",
            SkillType::Chemistry => "Chemistry",
            SkillType::Cooking => "Cooking",
            SkillType::EvaOperations => "EVA Operations",
            SkillType::Materials => "Materials Science",
            SkillType::Mechanics => "Mechanics",
            SkillType::Medicine => "Medicine",
            SkillType::Physics => "Physics",
            SkillType::Teaching => "Teaching",
        }
    }
}

/// Innate attributes, each on a 0-100 scale with 50 as average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NaturalAttribute {
    AcademicAptitude,
    Agility,
    Endurance,
    ExperienceAptitude,
    StressResilience,
    Strength,
    Teaching,
}

/// Attribute lookup for one person. Missing attributes read as 50.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NaturalAttributes {
    values: BTreeMap<NaturalAttribute, u8>,
}

impl NaturalAttributes {
    pub const AVERAGE: u8 = 50;

    pub fn with(mut self, attribute: NaturalAttribute, value: u8) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn set(&mut self, attribute: NaturalAttribute, value: u8) {
        self.values.insert(attribute, value.min(100));
    }

    pub fn get(&self, attribute: NaturalAttribute) -> u8 {
        self.values
            .get(&attribute)
            .copied()
            .unwrap_or(Self::AVERAGE)
    }
}

/// Level and progress within a single skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub level: u32,
    pub experience: f64,
}

/// Experience needed to advance from `level` to `level + 1`.
pub fn experience_to_next_level(level: u32) -> f64 {
    25.0 * 2f64.powi(level.min(30) as i32)
}

/// Per-person skill ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillManager {
    skills: BTreeMap<SkillType, Skill>,
}

impl SkillManager {
    pub fn with_level(mut self, skill: SkillType, level: u32) -> Self {
        self.set_level(skill, level);
        self
    }

    pub fn set_level(&mut self, skill: SkillType, level: u32) {
        self.skills.entry(skill).or_default().level = level;
    }

    pub fn level(&self, skill: SkillType) -> u32 {
        self.skills.get(&skill).map(|s| s.level).unwrap_or(0)
    }

    pub fn experience(&self, skill: SkillType) -> f64 {
        self.skills.get(&skill).map(|s| s.experience).unwrap_or(0.0)
    }

    /// Skill level as modified by the person's current performance.
    pub fn effective_level(&self, skill: SkillType, performance: f64) -> i32 {
        (self.level(skill) as f64 * performance.clamp(0.0, 1.0)).round() as i32
    }

    /// Add experience points, levelling up as many times as they allow.
    pub fn add_experience(&mut self, skill: SkillType, points: f64) {
        if !points.is_finite() || points <= 0.0 {
            return;
        }
        let entry = self.skills.entry(skill).or_default();
        entry.experience += points;
        loop {
            let needed = experience_to_next_level(entry.level);
            if entry.experience < needed {
                break;
            }
            entry.experience -= needed;
            entry.level += 1;
        }
    }

    /// The skill with the highest level among `candidates`, first wins ties.
    pub fn best_of(&self, candidates: &[SkillType]) -> Option<(SkillType, u32)> {
        candidates
            .iter()
            .map(|&s| (s, self.level(s)))
            .fold(None, |best, (s, lvl)| match best {
                Some((_, b)) if b >= lvl => best,
                _ => Some((s, lvl)),
            })
    }
}
