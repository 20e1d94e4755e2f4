use crate::band::Band;
use crate::filter::{is_access_point, DeviceClassifier};
use crate::types::{AccessPointSummary, Observation, RankedCount, RunStatistics};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Length of the ranked SSID and device-type lists
pub const TOP_N: usize = 10;

/// Insertion-ordered counter; ties in the ranking keep first-seen order.
#[derive(Debug, Default)]
struct RankCounter {
    index: HashMap<String, usize>,
    entries: Vec<RankedCount>,
}

impl RankCounter {
    fn bump(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(RankedCount {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    fn top(mut self, n: usize) -> Vec<RankedCount> {
        // sort_by is stable
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(n);
        self.entries
    }
}

#[derive(Debug)]
struct SummarySlot {
    summary: AccessPointSummary,
    /// Signal of the observation that supplied `summary.location`
    fix_signal: Option<i32>,
}

/// Result of one aggregation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One entry per MAC, in first-seen order
    pub summaries: Vec<AccessPointSummary>,
    pub stats: RunStatistics,
}

impl Aggregation {
    /// Summaries that have a GPS fix and can be placed on the map
    pub fn mapped(&self) -> impl Iterator<Item = &AccessPointSummary> {
        self.summaries.iter().filter(|s| s.location.is_some())
    }
}

/// Single-pass fold of filtered observations into per-AP summaries and run
/// statistics.
pub struct Aggregator<'a> {
    classifier: &'a dyn DeviceClassifier,
    all_devices: bool,
    slots: Vec<SummarySlot>,
    by_mac: HashMap<String, usize>,
    devices_seen: HashSet<String>,
    total_packets: u64,
    packets_without_fix: u64,
    band_counts: BTreeMap<Band, u64>,
    ssids: RankCounter,
    device_types: RankCounter,
}

impl<'a> Aggregator<'a> {
    pub fn new(classifier: &'a dyn DeviceClassifier, all_devices: bool) -> Self {
        Self {
            classifier,
            all_devices,
            slots: Vec::new(),
            by_mac: HashMap::new(),
            devices_seen: HashSet::new(),
            total_packets: 0,
            packets_without_fix: 0,
            band_counts: BTreeMap::new(),
            ssids: RankCounter::default(),
            device_types: RankCounter::default(),
        }
    }

    /// Fold one observation that already passed the filters.
    pub fn push(&mut self, obs: &Observation) {
        self.total_packets += 1;
        *self.band_counts.entry(obs.band).or_insert(0) += 1;
        if obs.location.is_none() {
            self.packets_without_fix += 1;
        }
        if !self.devices_seen.contains(&obs.mac) {
            self.devices_seen.insert(obs.mac.clone());
        }
        if let Some(ref t) = obs.device_type {
            self.device_types.bump(t);
        }
        if let Some(ref ssid) = obs.ssid {
            self.ssids.bump(ssid);
        }

        if !self.all_devices && !is_access_point(obs, self.classifier) {
            return;
        }

        match self.by_mac.get(&obs.mac) {
            Some(&i) => update_slot(&mut self.slots[i], obs),
            None => {
                self.by_mac.insert(obs.mac.clone(), self.slots.len());
                self.slots.push(SummarySlot {
                    summary: AccessPointSummary {
                        mac: obs.mac.clone(),
                        ssid: obs.ssid.clone(),
                        device_type: obs.device_type.clone(),
                        best_signal: obs.signal,
                        band: obs.band,
                        location: obs.location,
                        observation_count: 1,
                        first_seen: obs.timestamp,
                        last_seen: obs.timestamp,
                    },
                    fix_signal: obs.location.map(|_| obs.signal),
                });
            }
        }
    }

    /// Finalize the fold. `capture_devices` is the size of the capture's
    /// device table, reported alongside the filtered counters.
    pub fn finish(self, capture_devices: u64) -> Aggregation {
        let summaries: Vec<AccessPointSummary> =
            self.slots.into_iter().map(|slot| slot.summary).collect();

        let stats = RunStatistics {
            total_packets: self.total_packets,
            total_devices: self.devices_seen.len() as u64,
            access_points: summaries.len() as u64,
            mapped_access_points: summaries.iter().filter(|s| s.location.is_some()).count()
                as u64,
            packets_without_fix: self.packets_without_fix,
            band_counts: self.band_counts,
            device_type_counts: self.device_types.top(TOP_N),
            top_ssids: self.ssids.top(TOP_N),
            capture_devices,
        };

        log::info!(
            "Aggregated {} packets into {} access points ({} with a GPS fix)",
            stats.total_packets,
            stats.access_points,
            stats.mapped_access_points
        );

        Aggregation { summaries, stats }
    }
}

fn update_slot(slot: &mut SummarySlot, obs: &Observation) {
    let summary = &mut slot.summary;
    summary.observation_count += 1;
    summary.first_seen = summary.first_seen.min(obs.timestamp);
    summary.last_seen = summary.last_seen.max(obs.timestamp);

    if obs.signal > summary.best_signal {
        summary.best_signal = obs.signal;
        summary.band = obs.band;
    }

    if let Some(location) = obs.location {
        let stronger_fix = slot.fix_signal.map_or(true, |s| obs.signal >= s);
        if stronger_fix {
            summary.location = Some(location);
            slot.fix_signal = Some(obs.signal);
        }
    }

    if summary.ssid.is_none() {
        summary.ssid = obs.ssid.clone();
    }
    if summary.device_type.is_none() {
        summary.device_type = obs.device_type.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterConfig, KismetApClassifier};
    use crate::types::GeoPoint;

    const MAC: &str = "AA:BB:CC:DD:EE:FF";

    fn obs(mac: &str, signal: i32, location: Option<(f64, f64)>) -> Observation {
        Observation {
            timestamp: 1_700_000_000,
            mac: mac.to_string(),
            device_type: Some("Wi-Fi AP".to_string()),
            ssid: Some("Home".to_string()),
            frequency: 5180000.0,
            band: Band::Five,
            signal,
            location: location.map(|(lat, lon)| GeoPoint { lat, lon }),
        }
    }

    fn run(filter: &FilterConfig, observations: &[Observation]) -> Aggregation {
        let mut agg = Aggregator::new(&KismetApClassifier, filter.all_devices);
        for o in observations {
            if filter.matches(o, &KismetApClassifier) {
                agg.push(o);
            }
        }
        agg.finish(0)
    }

    fn three_readings() -> Vec<Observation> {
        vec![
            obs(MAC, -70, Some((47.1, -122.1))),
            obs(MAC, -55, Some((47.2, -122.2))),
            obs(MAC, -90, Some((47.3, -122.3))),
        ]
    }

    #[test]
    fn test_best_signal_and_count() {
        let result = run(&FilterConfig::default(), &three_readings());
        assert_eq!(result.summaries.len(), 1);
        let s = &result.summaries[0];
        assert_eq!(s.best_signal, -55);
        assert_eq!(s.observation_count, 3);
        assert_eq!(s.location, Some(GeoPoint { lat: 47.2, lon: -122.2 }));
        assert_eq!(result.stats.total_packets, 3);
    }

    #[test]
    fn test_min_signal_scenario() {
        let filter = FilterConfig {
            min_signal: -60,
            ..Default::default()
        };
        let result = run(&filter, &three_readings());
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].observation_count, 1);
        assert_eq!(result.summaries[0].best_signal, -55);
        assert_eq!(result.stats.total_packets, 1);
    }

    #[test]
    fn test_band_filter_scenario() {
        let filter = FilterConfig {
            bands: [Band::Six].into_iter().collect(),
            ..Default::default()
        };
        let result = run(&filter, &three_readings());
        assert!(result.summaries.is_empty());
        assert_eq!(result.stats.total_packets, 0);
        assert_eq!(result.stats.band_count(Band::Five), 0);
    }

    #[test]
    fn test_fix_follows_strongest_observation_with_location() {
        let readings = vec![
            obs(MAC, -80, Some((1.0, 1.0))),
            obs(MAC, -40, None),
            obs(MAC, -60, Some((2.0, 2.0))),
            obs(MAC, -70, Some((3.0, 3.0))),
        ];
        let result = run(&FilterConfig::default(), &readings);
        let s = &result.summaries[0];
        assert_eq!(s.best_signal, -40);
        assert_eq!(s.location, Some(GeoPoint { lat: 2.0, lon: 2.0 }));
        assert_eq!(result.stats.packets_without_fix, 1);
    }

    #[test]
    fn test_first_fix_taken_when_best_has_none() {
        let readings = vec![obs(MAC, -40, None), obs(MAC, -85, Some((5.0, 6.0)))];
        let result = run(&FilterConfig::default(), &readings);
        assert_eq!(
            result.summaries[0].location,
            Some(GeoPoint { lat: 5.0, lon: 6.0 })
        );
        assert_eq!(result.mapped().count(), 1);
    }

    #[test]
    fn test_unmapped_summary_still_counted() {
        let readings = vec![obs(MAC, -50, None), obs("11:22:33:44:55:66", -50, Some((1.0, 2.0)))];
        let result = run(&FilterConfig::default(), &readings);
        assert_eq!(result.summaries.len(), 2);
        assert_eq!(result.mapped().count(), 1);
        assert_eq!(result.stats.access_points, 2);
        assert_eq!(result.stats.mapped_access_points, 1);
        assert_eq!(result.stats.total_packets, 2);
        assert_eq!(result.stats.packets_without_fix, 1);
    }

    #[test]
    fn test_first_seen_order_and_unique_macs() {
        let readings = vec![
            obs("00:00:00:00:00:02", -50, None),
            obs("00:00:00:00:00:01", -50, None),
            obs("00:00:00:00:00:02", -40, None),
        ];
        let result = run(&FilterConfig::default(), &readings);
        let macs: Vec<&str> = result.summaries.iter().map(|s| s.mac.as_str()).collect();
        assert_eq!(macs, vec!["00:00:00:00:00:02", "00:00:00:00:00:01"]);
        assert_eq!(result.stats.total_devices, 2);
    }

    #[test]
    fn test_ssid_filled_when_previously_empty() {
        let mut hidden = obs(MAC, -50, None);
        hidden.ssid = None;
        let readings = vec![hidden, obs(MAC, -60, None)];
        let result = run(&FilterConfig::default(), &readings);
        assert_eq!(result.summaries[0].ssid.as_deref(), Some("Home"));
    }

    #[test]
    fn test_non_ap_counts_but_no_summary() {
        let mut client = obs("11:22:33:44:55:66", -30, Some((1.0, 1.0)));
        client.device_type = Some("Wi-Fi Client".to_string());
        client.ssid = Some("Probe".to_string());

        let mut agg = Aggregator::new(&KismetApClassifier, false);
        agg.push(&client);
        let result = agg.finish(7);
        assert!(result.summaries.is_empty());
        assert_eq!(result.stats.total_packets, 1);
        assert_eq!(result.stats.capture_devices, 7);
        assert_eq!(result.stats.top_ssids[0].name, "Probe");
    }

    #[test]
    fn test_all_devices_summarizes_clients() {
        let mut client = obs("11:22:33:44:55:66", -30, Some((1.0, 1.0)));
        client.device_type = Some("Wi-Fi Client".to_string());

        let mut agg = Aggregator::new(&KismetApClassifier, true);
        agg.push(&client);
        assert_eq!(agg.finish(0).summaries.len(), 1);
    }

    #[test]
    fn test_top_ssids_ties_keep_first_seen_order() {
        let mut readings = Vec::new();
        for (name, n) in [("Beta", 2), ("Alpha", 3), ("Gamma", 2), ("Delta", 1)] {
            for _ in 0..n {
                let mut o = obs(MAC, -50, None);
                o.ssid = Some(name.to_string());
                readings.push(o);
            }
        }
        let result = run(&FilterConfig::default(), &readings);
        let names: Vec<&str> = result
            .stats
            .top_ssids
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma", "Delta"]);
        assert_eq!(result.stats.top_ssids[0].count, 3);
    }

    #[test]
    fn test_top_lists_are_truncated() {
        let mut readings = Vec::new();
        for i in 0..15 {
            let mut o = obs(MAC, -50, None);
            o.ssid = Some(format!("net-{}", i));
            readings.push(o);
        }
        let result = run(&FilterConfig::default(), &readings);
        assert_eq!(result.stats.top_ssids.len(), TOP_N);
    }
}
