use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kismap",
    version,
    about = "Generate WiFi heatmaps from Kismet .kismet capture files",
    long_about = "Generate interactive HTML WiFi heatmaps from Kismet SQLite capture files.\n\
                  Access points are summarized per MAC (best signal, strongest GPS fix)\n\
                  and placed on a Leaflet map; no API key is required.",
    after_help = "Examples:\n  \
                  kismap -i capture.kismet                    # Basic heatmap\n  \
                  kismap -i capture.kismet -b 5 -b 6          # 5GHz and 6GHz only\n  \
                  kismap -i capture.kismet -e \"MyWiFi\"        # Specific SSID\n  \
                  kismap -i capture.kismet --export-csv -v    # Verbose + CSV export"
)]
pub struct Cli {
    /// Input .kismet capture file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output HTML file
    #[arg(short, long, env = "KISMAP_OUTPUT", default_value = "kismet_heatmap.html")]
    pub output: PathBuf,

    /// Filter by ESSID (can repeat)
    #[arg(short, long = "essid", value_name = "ESSID")]
    pub essids: Vec<String>,

    /// Filter by MAC address (can repeat)
    #[arg(short, long = "mac", value_name = "MAC")]
    pub macs: Vec<String>,

    /// Filter by device type (exact Kismet label, e.g. "Wi-Fi AP")
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub device_type: Option<String>,

    /// Filter by band: 2.4, 5, or 6 GHz (can repeat)
    #[arg(short, long = "band", value_name = "BAND")]
    pub bands: Vec<String>,

    /// Minimum signal in dBm
    #[arg(
        long,
        env = "KISMAP_MIN_SIGNAL",
        default_value_t = kismap_rs::filter::DEFAULT_MIN_SIGNAL,
        allow_negative_numbers = true
    )]
    pub min_signal: i32,

    /// Show all devices, not just APs
    #[arg(long, default_value_t = false)]
    pub all_devices: bool,

    /// Disable the heatmap layer (markers only)
    #[arg(long, default_value_t = false)]
    pub no_heatmap: bool,

    /// Also export the access point table to CSV
    #[arg(long, default_value_t = false)]
    pub export_csv: bool,

    /// CSV destination (default: output path with a .csv extension)
    #[arg(long, value_name = "PATH")]
    pub csv_output: Option<PathBuf>,

    /// Also export every filtered packet to <output stem>_packets.csv
    #[arg(long, default_value_t = false)]
    pub export_packets: bool,

    /// Print run statistics as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress progress messages on stderr
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Print run statistics; repeat for more log detail (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn csv_path(&self) -> Option<PathBuf> {
        if !self.export_csv && self.csv_output.is_none() {
            return None;
        }
        Some(
            self.csv_output
                .clone()
                .unwrap_or_else(|| kismap_rs::export::csv_path_for(&self.output)),
        )
    }

    pub fn packets_csv_path(&self) -> Option<PathBuf> {
        self.export_packets
            .then(|| kismap_rs::export::packets_csv_path_for(&self.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["kismap", "-i", "capture.kismet"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("capture.kismet"));
        assert_eq!(cli.min_signal, -100);
        assert!(cli.essids.is_empty());
        assert!(!cli.all_devices);
        assert_eq!(cli.csv_path(), None);
        assert_eq!(cli.packets_csv_path(), None);
    }

    #[test]
    fn test_repeatable_filters() {
        let cli = Cli::try_parse_from([
            "kismap", "-i", "c.kismet", "-b", "5", "-b", "6", "-e", "Home", "-e", "Work", "-m",
            "AA:BB:CC:DD:EE:FF",
        ])
        .unwrap();
        assert_eq!(cli.bands, vec!["5", "6"]);
        assert_eq!(cli.essids, vec!["Home", "Work"]);
        assert_eq!(cli.macs, vec!["AA:BB:CC:DD:EE:FF"]);
    }

    #[test]
    fn test_negative_min_signal() {
        let cli = Cli::try_parse_from(["kismap", "-i", "c.kismet", "--min-signal", "-65"]).unwrap();
        assert_eq!(cli.min_signal, -65);
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["kismap", "-i", "c.kismet", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_csv_paths() {
        let cli = Cli::try_parse_from([
            "kismap", "-i", "c.kismet", "-o", "out/map.html", "--export-csv", "--export-packets",
        ])
        .unwrap();
        assert_eq!(cli.csv_path(), Some(PathBuf::from("out/map.csv")));
        assert_eq!(cli.packets_csv_path(), Some(PathBuf::from("out/map_packets.csv")));

        let explicit = Cli::try_parse_from(["kismap", "-i", "c.kismet", "--csv-output", "aps.csv"])
            .unwrap();
        assert_eq!(explicit.csv_path(), Some(PathBuf::from("aps.csv")));
    }

    #[test]
    fn test_input_required() {
        assert!(Cli::try_parse_from(["kismap"]).is_err());
    }
}
