//! Device profiles and the CPU-utilization power model.

use serde::{Deserialize, Serialize};

/// Power draw sampled at 0%, 10%, ..., 100% CPU utilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurve {
    watts: [f64; 11],
}

impl PowerCurve {
    /// Idle at 5 W, one extra watt per 10% utilization up to 15 W.
    pub const EDGE_DEFAULT: PowerCurve = PowerCurve {
        watts: [5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
    };

    /// Linear interpolation between the two samples around `utilization_percent`.
    /// Anything at or past the last sample reads as the last sample.
    pub fn estimate(&self, utilization_percent: f64) -> f64 {
        let u = if utilization_percent.is_nan() {
            0.0
        } else {
            utilization_percent.max(0.0)
        };
        let scaled = u / 10.0;
        let index = scaled.floor() as usize;
        let last = self.watts.len() - 1;
        if index >= last {
            return self.watts[last];
        }
        let alpha = scaled - index as f64;
        alpha * self.watts[index + 1] + (1.0 - alpha) * self.watts[index]
    }
}

/// Hardware profile a host is instantiated from.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub name: &'static str,
    /// CPU capacity in millicores.
    pub cpu_millicores: u64,
    /// Memory capacity in bytes.
    pub memory_bytes: u64,
    pub power: PowerCurve,
}

static PROFILES: [DeviceProfile; 2] = [
    DeviceProfile {
        name: "xaviernx",
        cpu_millicores: 6_000,
        memory_bytes: 8 << 30,
        power: PowerCurve::EDGE_DEFAULT,
    },
    DeviceProfile {
        name: "rpi",
        cpu_millicores: 4_000,
        memory_bytes: 4 << 30,
        power: PowerCurve::EDGE_DEFAULT,
    },
];

impl DeviceProfile {
    pub fn lookup(device: &str) -> Option<DeviceProfile> {
        PROFILES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(device))
            .cloned()
    }

    pub fn known() -> impl Iterator<Item = &'static str> {
        PROFILES.iter().map(|p| p.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_idle_and_saturated() {
        let curve = PowerCurve::EDGE_DEFAULT;
        assert_eq!(curve.estimate(0.0), 5.0);
        assert_eq!(curve.estimate(100.0), 15.0);
        assert_eq!(curve.estimate(250.0), 15.0);
        assert_eq!(curve.estimate(-3.0), 5.0);
    }

    #[test]
    fn interpolates_between_samples() {
        let curve = PowerCurve::EDGE_DEFAULT;
        assert!((curve.estimate(45.0) - 9.5).abs() < 1e-12);
        assert!((curve.estimate(95.0) - 14.5).abs() < 1e-12);
        assert!((curve.estimate(33.0) - 8.3).abs() < 1e-12);
    }

    #[test]
    fn estimate_is_monotonic() {
        let curve = PowerCurve::EDGE_DEFAULT;
        let mut previous = curve.estimate(0.0);
        for tenth in 1..=1000 {
            let current = curve.estimate(f64::from(tenth) / 10.0);
            assert!(current >= previous, "power dropped at {}%", f64::from(tenth) / 10.0);
            previous = current;
        }
    }

    #[test]
    fn looks_up_known_devices() {
        let nx = DeviceProfile::lookup("XavierNX").unwrap();
        assert_eq!(nx.cpu_millicores, 6_000);
        assert!(DeviceProfile::lookup("rpi").is_some());
        assert!(DeviceProfile::lookup("cray").is_none());
        assert_eq!(DeviceProfile::known().count(), 2);
    }
}
