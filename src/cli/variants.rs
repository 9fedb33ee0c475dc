use std::fmt::Display;

/// The unique string token that identifies the feed-forward baseline
pub static VANILLA: &str = "vanilla";

/// The unique string token that identifies the stacked QRNN
pub static QRNN: &str = "qrnn";

/// The unique string token that identifies the densely connected QRNN
pub static DENSE_QRNN: &str = "dense-qrnn";

/// The unique string token that identifies the stacked LSTM
pub static LSTM: &str = "lstm";

/// All available variants
pub static ALL_VARIANTS: &[&str; 4] = &[VANILLA, QRNN, DENSE_QRNN, LSTM];

/// Available network variants
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Variant {
    /// Stacked dense layers
    Vanilla,

    /// Stacked QRNN layers
    Qrnn,

    /// Densely connected QRNN layers
    DenseQrnn,

    /// Stacked LSTM layers
    Lstm,
}

impl Variant {
    /// Get the unique string token that identifies this variant
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Vanilla => VANILLA,
            Variant::Qrnn => QRNN,
            Variant::DenseQrnn => DENSE_QRNN,
            Variant::Lstm => LSTM,
        }
    }
}

impl TryFrom<&str> for Variant {
    type Error = VariantError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            v if v == VANILLA => Ok(Variant::Vanilla),
            v if v == QRNN => Ok(Variant::Qrnn),
            v if v == DENSE_QRNN => Ok(Variant::DenseQrnn),
            v if v == LSTM => Ok(Variant::Lstm),
            _ => Err(VariantError::Unknown(value.to_string())),
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Variant Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VariantError {
    /// No variant found for the given string
    #[error("no variant found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_every_variant_name() {
        for name in ALL_VARIANTS {
            let variant = Variant::try_from(*name).unwrap();

            assert_eq!(variant.to_string(), *name);
        }

        assert_eq!(Variant::try_from("Dense-QRNN"), Ok(Variant::DenseQrnn));
    }

    #[test]
    fn rejects_unknown_variants() {
        assert_eq!(
            Variant::try_from("transformer"),
            Err(VariantError::Unknown("transformer".to_string()))
        );
    }
}
