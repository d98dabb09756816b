use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// A register value together with where it came from.
///
/// Provenance never changes execution; it only feeds analysis.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Register {
    pub value: i32,
    /// Written directly by an input or sensor instruction.
    pub from_sensor: bool,
    /// Cycle on which the value was written.
    pub origin_cycle: u64,
    /// Oldest cycle among the values this one was computed from.
    pub oldest_component: u64,
    /// Some component was sensed.
    pub sensor_derived: bool,
}

impl Register {
    /// A fresh value with no inputs.
    #[must_use]
    pub const fn constant(value: i32, cycle: u64) -> Self {
        Self {
            value,
            from_sensor: false,
            origin_cycle: cycle,
            oldest_component: cycle,
            sensor_derived: false,
        }
    }

    #[must_use]
    pub const fn sensed(value: i32, cycle: u64) -> Self {
        Self {
            value,
            from_sensor: true,
            origin_cycle: cycle,
            oldest_component: cycle,
            sensor_derived: true,
        }
    }

    #[must_use]
    pub const fn derived(value: i32, cycle: u64, source: &Register) -> Self {
        Self {
            value,
            from_sensor: false,
            origin_cycle: cycle,
            oldest_component: source.oldest_component,
            sensor_derived: source.sensor_derived,
        }
    }

    #[must_use]
    pub fn combined(value: i32, cycle: u64, a: &Register, b: &Register) -> Self {
        Self {
            value,
            from_sensor: false,
            origin_cycle: cycle,
            oldest_component: a.oldest_component.min(b.oldest_component),
            sensor_derived: a.sensor_derived || b.sensor_derived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_flag_propagates_through_combination() {
        let sensed = Register::sensed(4, 10);
        let plain = Register::constant(1, 3);
        let sum = Register::combined(5, 12, &sensed, &plain);
        assert!(sum.sensor_derived);
        assert!(!sum.from_sensor);
        assert_eq!(sum.oldest_component, 3);
        assert_eq!(sum.origin_cycle, 12);

        let neither = Register::combined(2, 12, &plain, &plain);
        assert!(!neither.sensor_derived);
    }

    #[test]
    fn test_derived_keeps_lineage() {
        let src = Register::sensed(8, 2);
        let shifted = Register::derived(16, 9, &src);
        assert!(shifted.sensor_derived);
        assert_eq!(shifted.oldest_component, 2);
    }
}
