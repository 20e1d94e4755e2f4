use crate::output::thousands;
use kismap_rs::aggregate::TOP_N;
use kismap_rs::{Band, RunStatistics};
use std::fmt::Write;

/// Human-readable run statistics, as printed with `--verbose`.
pub fn format_statistics(stats: &RunStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Total packets: {}", thousands(stats.total_packets));
    let _ = writeln!(
        out,
        "Total devices: {} ({} in capture)",
        thousands(stats.total_devices),
        thousands(stats.capture_devices)
    );
    let _ = writeln!(
        out,
        "Access points: {} ({} mapped)",
        thousands(stats.access_points),
        thousands(stats.mapped_access_points)
    );
    let _ = writeln!(
        out,
        "Packets without GPS fix: {} (counted, not mapped)",
        thousands(stats.packets_without_fix)
    );

    let _ = writeln!(out, "\nPackets by band:");
    for (band, count) in &stats.band_counts {
        let unit = if *band == Band::Unknown { "" } else { " GHz" };
        let _ = writeln!(out, "  {}{}: {}", band, unit, thousands(*count));
    }

    let _ = writeln!(out, "\nPackets by device type:");
    for entry in &stats.device_type_counts {
        let _ = writeln!(out, "  {}: {}", entry.name, thousands(entry.count));
    }

    let _ = writeln!(out, "\nTop {} SSIDs:", TOP_N);
    for entry in &stats.top_ssids {
        let _ = writeln!(out, "  {}: {}", entry.name, thousands(entry.count));
    }

    out
}
