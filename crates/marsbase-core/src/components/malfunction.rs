//! Malfunctions, wear and maintenance for buildings, vehicles and suits.

use rand::Rng;
use serde::{Deserialize, Serialize};

use marsbase_logic::accident::wear_modifier;
use marsbase_logic::constants::malfunction::FULL_WEAR_CONDITION;

use super::Resource;

/// What kind of entity a malfunction can strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MalfunctionScope {
    Building,
    Vehicle,
    Suit,
}

/// Catalogue entry used when an accident or random failure strikes.
#[derive(Debug, Clone, Copy)]
pub struct MalfunctionSpec {
    pub name: &'static str,
    pub emergency: bool,
    pub work_time: f64,
    pub parts: Option<(Resource, f64)>,
    pub scopes: &'static [MalfunctionScope],
}

static CATALOG: &[MalfunctionSpec] = &[
    MalfunctionSpec {
        name: "Air Leak",
        emergency: true,
        work_time: 30.0,
        parts: Some((Resource::SpareParts, 1.0)),
        scopes: &[MalfunctionScope::Building, MalfunctionScope::Vehicle],
    },
    MalfunctionSpec {
        name: "Electrical Fire",
        emergency: true,
        work_time: 40.0,
        parts: Some((Resource::SpareParts, 2.0)),
        scopes: &[MalfunctionScope::Building, MalfunctionScope::Vehicle],
    },
    MalfunctionSpec {
        name: "Pump Failure",
        emergency: false,
        work_time: 50.0,
        parts: Some((Resource::SpareParts, 3.0)),
        scopes: &[MalfunctionScope::Building, MalfunctionScope::Vehicle],
    },
    MalfunctionSpec {
        name: "Control Board Short",
        emergency: false,
        work_time: 35.0,
        parts: Some((Resource::SpareParts, 1.0)),
        scopes: &[MalfunctionScope::Building, MalfunctionScope::Vehicle],
    },
    MalfunctionSpec {
        name: "Seal Degradation",
        emergency: false,
        work_time: 20.0,
        parts: None,
        scopes: &[
            MalfunctionScope::Building,
            MalfunctionScope::Vehicle,
            MalfunctionScope::Suit,
        ],
    },
    MalfunctionSpec {
        name: "Suit Puncture",
        emergency: false,
        work_time: 15.0,
        parts: Some((Resource::SpareParts, 0.5)),
        scopes: &[MalfunctionScope::Suit],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Malfunction {
    pub name: String,
    pub emergency: bool,
    /// Emergency work still needed before the hazard is contained.
    pub emergency_work_remaining: f64,
    /// General repair work still needed.
    pub general_work_remaining: f64,
    /// Parts that must be fitted before general work completes.
    pub parts_needed: Option<(Resource, f64)>,
}

impl Malfunction {
    pub fn from_spec(spec: &MalfunctionSpec) -> Self {
        Self {
            name: spec.name.to_string(),
            emergency: spec.emergency,
            emergency_work_remaining: if spec.emergency { spec.work_time / 2.0 } else { 0.0 },
            general_work_remaining: spec.work_time,
            parts_needed: spec.parts,
        }
    }

    pub fn general(name: &str, work_time: f64) -> Self {
        Self {
            name: name.to_string(),
            emergency: false,
            emergency_work_remaining: 0.0,
            general_work_remaining: work_time,
            parts_needed: None,
        }
    }

    pub fn emergency(name: &str, work_time: f64) -> Self {
        Self {
            name: name.to_string(),
            emergency: true,
            emergency_work_remaining: work_time,
            general_work_remaining: work_time,
            parts_needed: None,
        }
    }

    pub fn needs_emergency_work(&self) -> bool {
        self.emergency && self.emergency_work_remaining > 0.0
    }

    pub fn needs_general_work(&self) -> bool {
        self.general_work_remaining > 0.0
    }

    pub fn is_fixed(&self) -> bool {
        !self.needs_emergency_work() && !self.needs_general_work()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalfunctionManager {
    pub scope: MalfunctionScope,
    pub malfunctions: Vec<Malfunction>,
    /// 100 when new, falls with use and is restored by maintenance.
    pub wear_condition: f64,
    pub effective_time_since_maintenance: f64,
    /// Work time a full maintenance takes.
    pub maintenance_work_time: f64,
    pub maintenance_work_completed: f64,
}

impl MalfunctionManager {
    pub fn new(scope: MalfunctionScope, maintenance_work_time: f64) -> Self {
        Self {
            scope,
            malfunctions: Vec::new(),
            wear_condition: FULL_WEAR_CONDITION,
            effective_time_since_maintenance: 0.0,
            maintenance_work_time,
            maintenance_work_completed: 0.0,
        }
    }

    pub fn has_malfunction(&self) -> bool {
        !self.malfunctions.is_empty()
    }

    pub fn has_emergency_malfunction(&self) -> bool {
        self.malfunctions.iter().any(|m| m.needs_emergency_work())
    }

    /// A general repair is waiting and no emergency blocks it.
    pub fn has_general_malfunction(&self) -> bool {
        self.malfunctions
            .iter()
            .any(|m| !m.needs_emergency_work() && m.needs_general_work())
    }

    /// Suits only ever carry EVA-relevant malfunctions.
    pub fn has_eva_malfunction(&self) -> bool {
        self.scope == MalfunctionScope::Suit && self.has_malfunction()
    }

    pub fn accident_modifier(&self) -> f64 {
        wear_modifier(self.wear_condition)
    }

    pub fn time_passing(&mut self, time: f64, wear_rate: f64) {
        self.effective_time_since_maintenance += time;
        self.wear_condition = (self.wear_condition - time * wear_rate).max(0.0);
    }

    /// Roll for a spontaneous failure; worn equipment fails more often.
    pub fn check_random_failure(&mut self, time: f64, rate: f64, rng: &mut impl Rng) -> Option<&Malfunction> {
        let chance = rate * time * self.accident_modifier();
        if chance > 0.0 && rng.gen::<f64>() < chance {
            self.accident(rng)
        } else {
            None
        }
    }

    /// Strike a random malfunction suited to this entity.
    pub fn accident(&mut self, rng: &mut impl Rng) -> Option<&Malfunction> {
        let candidates: Vec<&MalfunctionSpec> = CATALOG
            .iter()
            .filter(|spec| spec.scopes.contains(&self.scope))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let spec = candidates[rng.gen_range(0..candidates.len())];
        self.malfunctions.push(Malfunction::from_spec(spec));
        self.malfunctions.last()
    }

    /// Add emergency work to the first malfunction that needs it.
    /// Returns the leftover work time.
    pub fn add_emergency_work(&mut self, work: f64) -> f64 {
        let mut left = work;
        for m in self.malfunctions.iter_mut().filter(|m| m.needs_emergency_work()) {
            let used = left.min(m.emergency_work_remaining);
            m.emergency_work_remaining -= used;
            left -= used;
            if left <= 0.0 {
                break;
            }
        }
        self.remove_fixed();
        left
    }

    /// Parts the next general repair needs, if any are still unfitted.
    pub fn parts_needed(&self) -> Option<(Resource, f64)> {
        self.malfunctions
            .iter()
            .find(|m| !m.needs_emergency_work() && m.needs_general_work())
            .and_then(|m| m.parts_needed)
    }

    /// Record that the next general repair's parts have been fitted.
    pub fn fit_parts(&mut self) {
        if let Some(m) = self
            .malfunctions
            .iter_mut()
            .find(|m| !m.needs_emergency_work() && m.needs_general_work())
        {
            m.parts_needed = None;
        }
    }

    /// Add general repair work to the first repairable malfunction.
    /// Returns the leftover work time.
    pub fn add_general_work(&mut self, work: f64) -> f64 {
        let mut left = work;
        for m in self
            .malfunctions
            .iter_mut()
            .filter(|m| !m.needs_emergency_work() && m.needs_general_work() && m.parts_needed.is_none())
        {
            let used = left.min(m.general_work_remaining);
            m.general_work_remaining -= used;
            left -= used;
            if left <= 0.0 {
                break;
            }
        }
        self.remove_fixed();
        left
    }

    fn remove_fixed(&mut self) {
        self.malfunctions.retain(|m| !m.is_fixed());
    }

    pub fn maintenance_due(&self, threshold: f64) -> bool {
        self.effective_time_since_maintenance > threshold
    }

    /// Add maintenance work; a completed maintenance resets wear and the timer.
    pub fn add_maintenance_work(&mut self, work: f64) -> bool {
        self.maintenance_work_completed += work.max(0.0);
        if self.maintenance_work_completed >= self.maintenance_work_time {
            self.maintenance_work_completed = 0.0;
            self.effective_time_since_maintenance = 0.0;
            self.wear_condition = FULL_WEAR_CONDITION;
            true
        } else {
            false
        }
    }
}
