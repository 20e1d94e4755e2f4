use crate::cli::Cli;
use crate::exit_codes;
use crate::output;
use crate::stats;
use kismap_rs::export::{self, AtomicFile, PacketExporter};
use kismap_rs::{
    analyze, CaptureReader, FilterConfig, KismapError, KismetApClassifier, LeafletRenderer,
    MapDocument, MapOptions, MapRenderer,
};

pub fn execute(cli: Cli) -> i32 {
    match run(&cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::for_error(&e)
        }
    }
}

fn run(cli: &Cli) -> Result<(), KismapError> {
    let classifier = KismetApClassifier;

    if !cli.quiet {
        eprintln!("Loading data from {}...", cli.input.display());
    }
    let reader = CaptureReader::open(&cli.input)?;

    let filter = FilterConfig::builder()
        .bands(cli.bands.iter().cloned())
        .essids(cli.essids.iter().cloned())
        .macs(cli.macs.iter().cloned())
        .device_type(cli.device_type.clone())
        .min_signal(cli.min_signal)
        .all_devices(cli.all_devices)
        .build(&classifier)?;
    log::debug!("Filters: {:?}", filter);

    // Every destination gets its temp file before the scan so an unwritable
    // path fails fast, and nothing is renamed into place until all outputs
    // are complete.
    let csv_path = cli.csv_path();
    let packets_path = cli.packets_csv_path();
    let mut destinations = vec![cli.output.clone()];
    destinations.extend(csv_path.iter().cloned());
    destinations.extend(packets_path.iter().cloned());
    export::ensure_distinct(&destinations)?;

    let mut html_file = AtomicFile::create(&cli.output)?;
    let mut csv_file = csv_path.map(AtomicFile::create).transpose()?;
    let mut packets_out = packets_path.map(PacketExporter::create).transpose()?;

    let aggregation = analyze(&reader, &filter, &classifier, |obs| match packets_out.as_mut() {
        Some(exporter) => exporter.write(obs),
        None => Ok(()),
    })?;
    let stats = &aggregation.stats;

    if !cli.quiet {
        eprintln!(
            "Found {} packets and {} devices",
            output::thousands(stats.total_packets),
            output::thousands(stats.total_devices)
        );
    }

    if cli.json {
        output::write_stdout(&output::to_json(stats)?)?;
    } else if cli.verbose > 0 {
        println!();
        print!("{}", stats::format_statistics(stats));
    }

    let mut staged = Vec::new();

    let options = MapOptions {
        show_heatmap: !cli.no_heatmap,
        min_signal: filter.min_signal,
    };
    let map_written = match MapDocument::from_summaries(aggregation.mapped(), &options) {
        Some(document) => {
            if !cli.quiet {
                eprintln!("\nGenerating heatmap...");
            }
            let html = LeafletRenderer::new()?.render(&document)?;
            html_file.write_all(html.as_bytes())?;
            log::info!(
                "Rendered {} markers and {} heat layers",
                document.markers.len(),
                document.heat_layers.len()
            );
            staged.push(html_file);
            true
        }
        None => {
            eprintln!("No access points with a GPS fix match the filter criteria!");
            false
        }
    };

    let csv_written = match csv_file.take() {
        Some(mut file) => {
            export::write_summaries(&mut file, &aggregation.summaries)?;
            staged.push(file);
            true
        }
        None => false,
    };

    let packet_rows = match packets_out.take() {
        Some(exporter) => {
            let rows = exporter.rows();
            staged.push(exporter.into_staged()?);
            Some(rows)
        }
        None => None,
    };

    let written = export::commit_all(staged)?;
    log::info!(
        "Committed {} output files ({} access points, {} packets)",
        written.len(),
        aggregation.summaries.len(),
        packet_rows.unwrap_or(0)
    );

    if !cli.quiet {
        let mut paths = written.iter();
        if map_written {
            if let Some(path) = paths.next() {
                eprintln!("Heatmap saved to: {}", path.display());
            }
        }
        if csv_written {
            if let Some(path) = paths.next() {
                eprintln!("CSV exported to: {}", path.display());
            }
        }
        if packet_rows.is_some() {
            if let Some(path) = paths.next() {
                eprintln!("Packet CSV exported to: {}", path.display());
            }
        }
        if map_written {
            eprintln!(
                "\nOpen {} in a web browser to view the heatmap!",
                cli.output.display()
            );
        }
    }

    Ok(())
}
