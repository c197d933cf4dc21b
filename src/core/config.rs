//! Scenario configuration with documented defaults
//!
//! Every scenario has its own config struct. Defaults reproduce the classic
//! parameterisation of each model; a TOML file may override any subset of
//! fields, and unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{Result, SimError};
use crate::scenarios::sugarscape::VisionMode;
use crate::simulation::scheduler::Order;

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::InvalidConfig(format!(
            "{} ({}) must be within [0, 1]",
            name, value
        )));
    }
    Ok(())
}

fn check_dims(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SimError::InvalidConfig(format!(
            "grid dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn check_range<T: PartialOrd + std::fmt::Display>(name: &str, min: T, max: T) -> Result<()> {
    if min > max {
        return Err(SimError::InvalidConfig(format!(
            "{}_min ({}) must not exceed {}_max ({})",
            name, min, name, max
        )));
    }
    Ok(())
}

/// Configuration for the neighbor-count cellular automaton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifeConfig {
    pub width: usize,
    pub height: usize,

    /// Probability that each cell starts alive
    pub start_alive: f64,

    pub seed: Option<u64>,

    /// Live-neighbor counts under which a living cell survives
    pub survive: Vec<u8>,

    /// Live-neighbor counts under which a dead cell is born.
    ///
    /// Defaults to `[5]`, not the textbook `[3]`.
    pub birth: Vec<u8>,

    /// Activation order of the decide phase. The result is independent of
    /// this setting; it exists so the synchronous guarantee can be exercised.
    pub activation: Order,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            start_alive: 0.3,
            seed: None,
            survive: vec![2, 3],
            birth: vec![5],
            activation: Order::Fixed,
        }
    }
}

impl LifeConfig {
    pub fn validate(&self) -> Result<()> {
        check_dims(self.width, self.height)?;
        check_unit("start_alive", self.start_alive)?;
        if let Some(k) = self.survive.iter().chain(&self.birth).find(|&&k| k > 8) {
            return Err(SimError::InvalidConfig(format!(
                "neighbor count {} is impossible in a Moore neighborhood",
                k
            )));
        }
        Ok(())
    }
}

/// Configuration for the segregation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegregationConfig {
    pub width: usize,
    pub height: usize,

    /// Probability that a cell receives an agent at initialization
    pub density: f64,

    /// Minimum share of same-group neighbors an agent needs to stay put
    pub desired_share_alike: f64,

    /// Probability that a placed agent belongs to group one
    pub group_one_share: f64,

    /// Moore radius used for both the move and the switch rule
    pub radius: usize,

    /// Consecutive steps of negative influence before a switch is attempted
    pub transition_threshold: u32,

    /// Probability of switching group once the threshold is reached
    pub transition_probability: f64,

    /// Share-alike assumed for an agent with no neighbors
    pub isolated_share: f64,

    pub seed: Option<u64>,
}

impl Default for SegregationConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            density: 0.7,
            desired_share_alike: 0.5,
            group_one_share: 0.7,
            radius: 1,
            transition_threshold: 3,
            transition_probability: 0.1,
            isolated_share: 0.0,
            seed: None,
        }
    }
}

impl SegregationConfig {
    pub fn validate(&self) -> Result<()> {
        check_dims(self.width, self.height)?;
        check_unit("density", self.density)?;
        check_unit("desired_share_alike", self.desired_share_alike)?;
        check_unit("group_one_share", self.group_one_share)?;
        check_unit("transition_probability", self.transition_probability)?;
        check_unit("isolated_share", self.isolated_share)?;
        if self.radius == 0 {
            return Err(SimError::InvalidConfig("radius must be at least 1".into()));
        }
        Ok(())
    }
}

/// Configuration for the resource-foraging model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SugarscapeConfig {
    pub width: usize,
    pub height: usize,
    pub initial_population: usize,

    // === AGENT ENDOWMENTS (inclusive ranges) ===
    pub endowment_min: u32,
    pub endowment_max: u32,
    pub metabolism_min: u32,
    pub metabolism_max: u32,
    pub vision_min: u32,
    pub vision_max: u32,

    /// Resource added to every cell per step, capped by the capacity map
    pub regrow_rate: f64,

    pub vision_mode: VisionMode,

    /// Capacity map file. When absent a two-peak landscape is generated.
    pub map: Option<PathBuf>,

    pub seed: Option<u64>,
}

impl Default for SugarscapeConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            initial_population: 200,
            endowment_min: 25,
            endowment_max: 50,
            metabolism_min: 1,
            metabolism_max: 5,
            vision_min: 1,
            vision_max: 5,
            regrow_rate: 2.0,
            vision_mode: VisionMode::Rays,
            map: None,
            seed: None,
        }
    }
}

impl SugarscapeConfig {
    pub fn validate(&self) -> Result<()> {
        check_dims(self.width, self.height)?;
        check_range("endowment", self.endowment_min, self.endowment_max)?;
        check_range("metabolism", self.metabolism_min, self.metabolism_max)?;
        check_range("vision", self.vision_min, self.vision_max)?;
        if self.initial_population > self.width * self.height {
            return Err(SimError::InvalidConfig(format!(
                "initial_population ({}) exceeds the {} available cells",
                self.initial_population,
                self.width * self.height
            )));
        }
        if !self.regrow_rate.is_finite() || self.regrow_rate < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "regrow_rate ({}) must be a non-negative number",
                self.regrow_rate
            )));
        }
        Ok(())
    }
}

/// Top-level config file: one optional table per scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioFile {
    pub life: LifeConfig,
    pub segregation: SegregationConfig,
    pub sugarscape: SugarscapeConfig,
}

impl ScenarioFile {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ScenarioFile = toml::from_str(content)?;
        Ok(file)
    }

    /// Load a config file. Relative `sugarscape.map` paths resolve against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut file = Self::from_toml_str(&content)?;
        if let (Some(map), Some(dir)) = (file.sugarscape.map.as_mut(), path.parent()) {
            if map.is_relative() {
                *map = dir.join(&*map);
            }
        }
        Ok(file)
    }
}
