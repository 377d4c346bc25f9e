/// A numeric series the statistics engine can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Signal {
    LevelPercent,
    LevelAbsolute,
    RechargeAmplitude,
}

impl Signal {
    /// The two level signals carried by every reading.
    pub const LEVELS: [Signal; 2] = [Signal::LevelPercent, Signal::LevelAbsolute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelPercent => "level_percent",
            Self::LevelAbsolute => "level_absolute",
            Self::RechargeAmplitude => "recharge_amplitude",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_signals_are_named_after_reading_fields() {
        let names: Vec<&str> = Signal::LEVELS.iter().map(Signal::as_str).collect();
        assert_eq!(names, vec!["level_percent", "level_absolute"]);
        assert_eq!(Signal::RechargeAmplitude.as_str(), "recharge_amplitude");
    }
}
