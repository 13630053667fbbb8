//! Soft-padding decay profiles.

use crate::CostmapError;
use std::str::FromStr;

/// Decay law for the graded soft-padding rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayKind {
    Exponential,
    Reciprocal,
    Linear,
}

impl FromStr for DecayKind {
    type Err = CostmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exponential" => Ok(Self::Exponential),
            "reciprocal" => Ok(Self::Reciprocal),
            "linear" => Ok(Self::Linear),
            other => Err(CostmapError::UnknownDecayType(other.to_string())),
        }
    }
}

/// Per-ring soft cost values beyond the hard-padding radius.
///
/// Ring `i` (1-based) carries `values[i - 1]`; the first ring starts at 98
/// for every law and values decrease outward, saturating at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayProfile {
    values: Vec<i8>,
}

impl DecayProfile {
    /// Precompute the profile for the given law.
    ///
    /// The number of rings is `ceil(decay_distance / resolution)`; the ring
    /// index is normalized to `r = (i - 1) / rings` before applying the law.
    pub fn new(
        kind: DecayKind,
        decay_distance: f64,
        resolution: f64,
    ) -> Result<Self, CostmapError> {
        if resolution <= 0.0 {
            return Err(CostmapError::InvalidResolution(resolution));
        }

        let rings = (decay_distance / resolution).ceil().max(0.0) as usize;
        let mut values = Vec::with_capacity(rings);
        for i in 0..rings {
            let r = i as f64 / rings as f64;
            let v = match kind {
                DecayKind::Exponential => (100.0 * (-3.506 * r).exp() - 2.0).floor(),
                DecayKind::Reciprocal => (1.0 / (0.9898 * r + 0.0102)).floor(),
                DecayKind::Linear => (100.0 - 97.0 * r - 2.0).floor(),
            };
            values.push(v.clamp(1.0, 98.0) as i8);
        }

        Ok(Self { values })
    }

    /// A profile with no soft rings (soft padding disabled).
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    pub fn values(&self) -> &[i8] {
        &self.values
    }

    /// Number of soft rings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_kind_from_str() {
        assert_eq!("exponential".parse::<DecayKind>().unwrap(), DecayKind::Exponential);
        assert_eq!("reciprocal".parse::<DecayKind>().unwrap(), DecayKind::Reciprocal);
        assert_eq!("linear".parse::<DecayKind>().unwrap(), DecayKind::Linear);
        assert!(matches!(
            "gaussian".parse::<DecayKind>(),
            Err(CostmapError::UnknownDecayType(_))
        ));
    }

    #[test]
    fn test_profile_length() {
        let p = DecayProfile::new(DecayKind::Linear, 0.30, 0.05).unwrap();
        assert_eq!(p.len(), 6);
        // Non-multiple distances round up
        let p = DecayProfile::new(DecayKind::Linear, 0.26, 0.05).unwrap();
        assert_eq!(p.len(), 6);
    }

    #[test]
    fn test_exponential_values() {
        let p = DecayProfile::new(DecayKind::Exponential, 0.30, 0.05).unwrap();
        assert_eq!(p.values(), &[98, 53, 29, 15, 7, 3]);
    }

    #[test]
    fn test_linear_values() {
        let p = DecayProfile::new(DecayKind::Linear, 0.20, 0.05).unwrap();
        assert_eq!(p.values(), &[98, 73, 49, 25]);
    }

    #[test]
    fn test_reciprocal_values_saturate_at_one() {
        let p = DecayProfile::new(DecayKind::Reciprocal, 0.20, 0.05).unwrap();
        assert_eq!(p.values(), &[98, 3, 1, 1]);
    }

    #[test]
    fn test_all_laws_start_at_98_and_decrease() {
        for kind in [DecayKind::Exponential, DecayKind::Reciprocal, DecayKind::Linear] {
            let p = DecayProfile::new(kind, 0.50, 0.05).unwrap();
            assert_eq!(p.values()[0], 98, "{:?}", kind);
            for w in p.values().windows(2) {
                assert!(w[1] <= w[0], "{:?}: {:?}", kind, p.values());
            }
            assert!(p.values().iter().all(|&v| (1..=98).contains(&v)));
        }
    }

    #[test]
    fn test_single_ring_profile() {
        let p = DecayProfile::new(DecayKind::Linear, 0.05, 0.05).unwrap();
        assert_eq!(p.values(), &[98]);
    }

    #[test]
    fn test_zero_distance_gives_empty_profile() {
        let p = DecayProfile::new(DecayKind::Linear, 0.0, 0.05).unwrap();
        assert!(p.is_empty());
        assert_eq!(p, DecayProfile::empty());
    }

    #[test]
    fn test_invalid_resolution() {
        assert!(matches!(
            DecayProfile::new(DecayKind::Linear, 0.3, 0.0),
            Err(CostmapError::InvalidResolution(_))
        ));
    }
}
