/// Inputs the model refuses to evaluate.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PropagationError {
    #[error("frequency {0} MHz is outside 20..=20000 MHz")]
    Frequency(f64),
    #[error("TX terminal height {0} m is invalid")]
    TxTerminalHeight(f64),
    #[error("RX terminal height {0} m is invalid")]
    RxTerminalHeight(f64),
    #[error("profile header claims {claimed} intervals, found {found} samples")]
    ProfileLength { claimed: f64, found: usize },
    #[error("profile spacing {0} m is invalid")]
    ProfileSpacing(f64),
    #[error("profile elevation at index {0} is not finite")]
    ProfileElevation(usize),
    #[error("model produced a non-finite loss ({0}) for this path")]
    NonFiniteLoss(f64),
}

/// Advisory attached to a prediction. The loss is still returned.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Warning {
    /// Some parameters are nearly out of range.
    NearlyOutOfRange = 1,
    /// Defaults were substituted for impossible parameters.
    DefaultsSubstituted = 2,
    /// A combination of parameters is out of range.
    CombinationOutOfRange = 3,
    /// Some parameters are out of range.
    OutOfRange = 4,
}

impl Warning {
    /// Maps the model's internal warning level.
    pub(crate) fn from_kwx(kwx: u8) -> Option<Self> {
        match kwx {
            0 => None,
            1 => Some(Self::NearlyOutOfRange),
            2 => Some(Self::DefaultsSubstituted),
            3 => Some(Self::CombinationOutOfRange),
            _ => Some(Self::OutOfRange),
        }
    }
}
