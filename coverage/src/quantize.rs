//! Turning path loss into the byte stored in a signal grid.

use terrain::SignalMerge;

/// What a Longley-Rice map's signal grid holds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputQuantity {
    /// Path loss (dB), stored as `rint(loss)`.
    PathLoss,
    /// Field strength (dBµV/m), stored as `100 + rint(value)`.
    FieldStrength,
    /// Received power (dBm), stored as `200 + rint(value)`.
    ReceivedPower,
}

impl OutputQuantity {
    /// Path loss without an ERP, otherwise dBm or dBµV/m.
    pub fn select(erp_w: f64, dbm: bool) -> Self {
        if erp_w == 0.0 {
            Self::PathLoss
        } else if dbm {
            Self::ReceivedPower
        } else {
            Self::FieldStrength
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::PathLoss => "dB",
            Self::FieldStrength => "dBuV/m",
            Self::ReceivedPower => "dBm",
        }
    }

    /// Converts a path loss into this quantity.
    pub fn value(self, loss_db: f64, erp_w: f64, frq_mhz: f64) -> f64 {
        match self {
            Self::PathLoss => loss_db,
            Self::FieldStrength => field_strength_dbuv(frq_mhz, erp_w, loss_db),
            Self::ReceivedPower => received_power_dbm(erp_w, loss_db),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn quantize(self, value: f64) -> u8 {
        let (offset, floor) = match self {
            // Zero means "no loss recorded yet".
            Self::PathLoss => (0.0, 1.0),
            Self::FieldStrength => (100.0, 0.0),
            Self::ReceivedPower => (200.0, 0.0),
        };
        let q = offset + value.round_ties_even();
        if q.is_nan() {
            return 0;
        }
        q.clamp(floor, 255.0) as u8
    }

    /// Inverse of [`OutputQuantity::quantize`]; `None` for unset
    /// pixels.
    pub fn dequantize(self, q: u8) -> Option<f64> {
        let q = f64::from(q);
        match (self, q) {
            (_, q) if q == 0.0 => None,
            (Self::PathLoss, q) => Some(q),
            (Self::FieldStrength, q) => Some(q - 100.0),
            (Self::ReceivedPower, q) => Some(q - 200.0),
        }
    }

    /// How overlapping transmitters combine: strongest signal, or
    /// smallest loss.
    pub fn merge(self) -> SignalMerge {
        match self {
            Self::PathLoss => SignalMerge::LowestNonZero,
            Self::FieldStrength | Self::ReceivedPower => SignalMerge::MaxHold,
        }
    }
}

/// Received power (dBm) from `erp_w` watts ERP over `loss_db`.
pub fn received_power_dbm(erp_w: f64, loss_db: f64) -> f64 {
    let rxp = erp_w / 10.0_f64.powf((loss_db - 2.14) / 10.0);
    10.0 * (rxp * 1000.0).log10()
}

/// Field strength (dBµV/m) from `erp_w` watts ERP at `frq_mhz`
/// over `loss_db`.
pub fn field_strength_dbuv(frq_mhz: f64, erp_w: f64, loss_db: f64) -> f64 {
    139.4 + 20.0 * frq_mhz.log10() - loss_db + 10.0 * (erp_w / 1000.0).log10()
}

#[cfg(test)]
mod tests {
    use super::{field_strength_dbuv, received_power_dbm, OutputQuantity};
    use approx::assert_relative_eq;
    use terrain::SignalMerge;

    #[test]
    fn test_select() {
        assert_eq!(OutputQuantity::select(0.0, true), OutputQuantity::PathLoss);
        assert_eq!(OutputQuantity::select(10.0, true), OutputQuantity::ReceivedPower);
        assert_eq!(OutputQuantity::select(10.0, false), OutputQuantity::FieldStrength);
        assert_eq!(OutputQuantity::PathLoss.merge(), SignalMerge::LowestNonZero);
        assert_eq!(OutputQuantity::ReceivedPower.merge(), SignalMerge::MaxHold);
    }

    #[test]
    fn test_conversions() {
        // 1 kW over 2.14 dB leaves 1 kW, or 60 dBm.
        assert_relative_eq!(received_power_dbm(1000.0, 2.14), 60.0, epsilon = 1e-9);
        assert_relative_eq!(received_power_dbm(1000.0, 122.14), -60.0, epsilon = 1e-9);
        assert_relative_eq!(field_strength_dbuv(100.0, 1000.0, 100.0), 79.4, epsilon = 1e-9);
    }

    #[test]
    fn test_quantize() {
        let dbm = OutputQuantity::ReceivedPower;
        assert_eq!(dbm.quantize(-90.4), 110);
        assert_eq!(dbm.quantize(-90.5), 110);
        assert_eq!(dbm.quantize(-91.5), 108);
        assert_eq!(dbm.quantize(-250.0), 0);
        assert_eq!(dbm.quantize(80.0), 255);
        assert_eq!(dbm.dequantize(110), Some(-90.0));

        let field = OutputQuantity::FieldStrength;
        assert_eq!(field.quantize(42.6), 143);
        assert_eq!(field.quantize(f64::NAN), 0);

        let loss = OutputQuantity::PathLoss;
        assert_eq!(loss.quantize(142.5), 142);
        assert_eq!(loss.quantize(312.0), 255);
        assert_eq!(loss.quantize(0.2), 1);
        assert_eq!(loss.dequantize(0), None);
        assert_eq!(loss.dequantize(142), Some(142.0));
    }
}
