//! Deltas of monotonically increasing OS counters.
//!
//! Counters are sampled once per round. A counter that went backwards was
//! reset (interface re-created, host rebooted, wrap-around) and yields no
//! delta for that round rather than a bogus zero.

use std::collections::BTreeMap;

/// Safe delta between two samples of one counter.
///
/// Returns `(current - previous, true)`, or `(0, false)` when the counter
/// went backwards.
pub fn delta(previous: u64, current: u64) -> (u64, bool) {
    match current.checked_sub(previous) {
        Some(value) => (value, true),
        None => (0, false),
    }
}

/// One monotonic counter sampled twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterPair {
    pub previous: u64,
    pub current: u64,
}

impl CounterPair {
    pub fn new(previous: u64, current: u64) -> Self {
        Self { previous, current }
    }

    /// Growth since the previous sample, `None` on reset.
    pub fn delta(&self) -> Option<u64> {
        self.current.checked_sub(self.previous)
    }
}

/// Aggregate bytes over the included interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetTotals {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl NetTotals {
    /// `(in, out)` growth since `previous`.
    ///
    /// A reset of either direction invalidates both.
    pub fn delta_from(&self, previous: &NetTotals) -> Option<(u64, u64)> {
        let bytes_in = CounterPair::new(previous.bytes_in, self.bytes_in).delta()?;
        let bytes_out = CounterPair::new(previous.bytes_out, self.bytes_out).delta()?;
        Some((bytes_in, bytes_out))
    }
}

impl<'a> FromIterator<&'a InterfaceCounters> for NetTotals {
    fn from_iter<I: IntoIterator<Item = &'a InterfaceCounters>>(iter: I) -> Self {
        iter.into_iter().fold(NetTotals::default(), |acc, c| NetTotals {
            bytes_in: acc.bytes_in.saturating_add(c.bytes_in),
            bytes_out: acc.bytes_out.saturating_add(c.bytes_out),
        })
    }
}

/// The six counters tracked per network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

impl InterfaceCounters {
    /// Per-counter growth since `previous`.
    ///
    /// All six counters must be valid; a single reset drops the whole
    /// interface for this round.
    pub fn delta_from(&self, previous: &InterfaceCounters) -> Option<InterfaceCounters> {
        Some(InterfaceCounters {
            bytes_in: CounterPair::new(previous.bytes_in, self.bytes_in).delta()?,
            bytes_out: CounterPair::new(previous.bytes_out, self.bytes_out).delta()?,
            packets_in: CounterPair::new(previous.packets_in, self.packets_in).delta()?,
            packets_out: CounterPair::new(previous.packets_out, self.packets_out).delta()?,
            errors_in: CounterPair::new(previous.errors_in, self.errors_in).delta()?,
            errors_out: CounterPair::new(previous.errors_out, self.errors_out).delta()?,
        })
    }
}

/// Interface name to counters, ordered by name.
pub type IfaceSnapshot = BTreeMap<String, InterfaceCounters>;

/// Deltas for every interface present in both snapshots with six valid
/// counters, ordered by interface name.
///
/// Interfaces new in `current` have no previous value and are skipped.
pub fn interface_deltas(
    previous: &IfaceSnapshot,
    current: &IfaceSnapshot,
) -> Vec<(String, InterfaceCounters)> {
    current
        .iter()
        .filter_map(|(name, counters)| {
            let old = previous.get(name)?;
            counters.delta_from(old).map(|d| (name.clone(), d))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(base: u64) -> InterfaceCounters {
        InterfaceCounters {
            bytes_in: base,
            bytes_out: base,
            packets_in: base,
            packets_out: base,
            errors_in: base,
            errors_out: base,
        }
    }

    #[test]
    fn test_delta() {
        assert_eq!(delta(100, 200), (100, true));
        assert_eq!(delta(200, 100), (0, false));
        assert_eq!(delta(50, 50), (0, true));
        assert_eq!(delta(0, u64::MAX), (u64::MAX, true));
    }

    #[test]
    fn test_counter_pair() {
        assert_eq!(CounterPair::new(10, 15).delta(), Some(5));
        assert_eq!(CounterPair::new(15, 10).delta(), None);
    }

    #[test]
    fn test_net_totals_reset_invalidates_both() {
        let previous = NetTotals {
            bytes_in: 1000,
            bytes_out: 500,
        };
        let grown = NetTotals {
            bytes_in: 1500,
            bytes_out: 700,
        };
        let reset_out = NetTotals {
            bytes_in: 1500,
            bytes_out: 100,
        };

        assert_eq!(grown.delta_from(&previous), Some((500, 200)));
        assert_eq!(reset_out.delta_from(&previous), None);
    }

    #[test]
    fn test_net_totals_sum() {
        let list = [counters(10), counters(32)];
        let totals: NetTotals = list.iter().collect();
        assert_eq!(totals.bytes_in, 42);
        assert_eq!(totals.bytes_out, 42);
    }

    #[test]
    fn test_interface_gate_requires_all_six() {
        let previous = counters(100);

        assert_eq!(counters(150).delta_from(&previous), Some(counters(50)));

        let resets = [
            InterfaceCounters { bytes_in: 1, ..counters(150) },
            InterfaceCounters { bytes_out: 1, ..counters(150) },
            InterfaceCounters { packets_in: 1, ..counters(150) },
            InterfaceCounters { packets_out: 1, ..counters(150) },
            InterfaceCounters { errors_in: 1, ..counters(150) },
            InterfaceCounters { errors_out: 1, ..counters(150) },
        ];
        for current in resets {
            assert_eq!(current.delta_from(&previous), None, "{current:?}");
        }
    }

    #[test]
    fn test_interface_deltas_skip_new_and_reset() {
        let previous: IfaceSnapshot = [
            ("eth0".to_string(), counters(100)),
            ("eth1".to_string(), counters(100)),
        ]
        .into_iter()
        .collect();

        let current: IfaceSnapshot = [
            ("eth0".to_string(), counters(160)),
            ("eth1".to_string(), InterfaceCounters { errors_out: 0, ..counters(160) }),
            ("wlan0".to_string(), counters(500)),
        ]
        .into_iter()
        .collect();

        let deltas = interface_deltas(&previous, &current);
        assert_eq!(deltas, vec![("eth0".to_string(), counters(60))]);
    }

    #[test]
    fn test_interface_deltas_sorted_by_name() {
        let previous: IfaceSnapshot = ["wlan0", "eth1", "eth0"]
            .into_iter()
            .map(|n| (n.to_string(), counters(1)))
            .collect();
        let current: IfaceSnapshot = ["eth0", "wlan0", "eth1"]
            .into_iter()
            .map(|n| (n.to_string(), counters(2)))
            .collect();

        let names: Vec<String> = interface_deltas(&previous, &current)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["eth0", "eth1", "wlan0"]);
    }
}
