use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use bitscope::{
    FfmpegLibrary, FfmpegLogLevel, FileNameFormat, FrameTypeData, PacketDemuxer, ProgressCallback,
    ProgressInfo, ScanOptions, ScanState, SourceOptions, StatisticsEvent, StatisticsFile,
    StatisticsFormat,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  bitscope info input.mkv --json\n  bitscope index input.mp4 --progress\n  bitscope units input.hevc --packets 5\n  bitscope stats stats.csv --frame 0 --type 1\n  bitscope completions zsh > _bitscope";

#[derive(Debug, Parser)]
#[command(
    name = "bitscope",
    version,
    about = "Inspect compressed video bitstreams and coding statistics files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print stream metadata.
    #[command(
        about = "Print stream metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  bitscope info input.mkv\n  bitscope info input.mkv --json"
    )]
    Info {
        /// Input media path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Scan a file and print its seek points.
    #[command(
        about = "Build the random-access index",
        after_help = "Examples:\n  bitscope index input.mp4\n  bitscope index input.mp4 --progress --json"
    )]
    Index {
        /// Input media path.
        input: PathBuf,

        /// Output the index as machine-readable JSON.
        #[arg(long)]
        json: bool,

        /// Also print the validation report.
        #[arg(long)]
        validate: bool,
    },

    /// Dump the access units of the first packets.
    #[command(
        about = "List access units",
        after_help = "Examples:\n  bitscope units input.hevc\n  bitscope units input.mp4 --packets 20"
    )]
    Units {
        /// Input media path.
        input: PathBuf,

        /// Number of video packets to split.
        #[arg(long, default_value_t = 10)]
        packets: usize,
    },

    /// Index a statistics file and list its frames and types.
    #[command(
        about = "Inspect a coding statistics file",
        after_help = "Examples:\n  bitscope stats stats.csv\n  bitscope stats stats.vtmbmsstats --frame 3 --type 2"
    )]
    Stats {
        /// Statistics file path.
        input: PathBuf,

        /// Force the file format (csv, vtm-bms).
        #[arg(long)]
        format: Option<String>,

        /// Frame whose blocks to print.
        #[arg(long)]
        frame: Option<i32>,

        /// Type whose blocks to print. All types when omitted.
        #[arg(long = "type")]
        type_id: Option<i32>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "panic" => Some(FfmpegLogLevel::Panic),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "verbose" => Some(FfmpegLogLevel::Verbose),
        "debug" => Some(FfmpegLogLevel::Debug),
        "trace" => Some(FfmpegLogLevel::Trace),
        _ => None,
    }
}

fn parse_statistics_format(value: &str) -> Option<StatisticsFormat> {
    match value.to_ascii_lowercase().as_str() {
        "csv" => Some(StatisticsFormat::Csv),
        "vtm-bms" | "vtmbms" | "bms" => Some(StatisticsFormat::VtmBms),
        _ => None,
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let level = match &global.log_level {
        Some(level) => parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?,
        None => FfmpegLogLevel::for_verbosity(global.verbose),
    };
    bitscope::set_ffmpeg_log_level(level);
    Ok(())
}

/// Drives an indicatif bar from scan progress events.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(message: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(100);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        bar.set_message(message.to_string());
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(percentage) = info.percentage {
            self.bar.set_position(percentage as u64);
        }
    }
}

fn scan_options(
    global: &GlobalOptions,
    message: &str,
) -> Result<(ScanOptions, Option<ProgressBar>), Box<dyn std::error::Error>> {
    if !global.progress {
        return Ok((ScanOptions::new(), None));
    }
    let progress = BarProgress::new(message)?;
    let bar = progress.bar.clone();
    Ok((ScanOptions::new().with_progress(Arc::new(progress)), Some(bar)))
}

fn print_hex_prefix(bytes: &[u8], limit: usize) -> String {
    bytes
        .iter()
        .take(limit)
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_frame_type_data(type_label: &str, data: &FrameTypeData) {
    println!("  {} ({} regions)", type_label.bold(), data.len());
    for value in &data.values {
        let block = value.block;
        println!(
            "    ({}, {}) [{}x{}] = {}",
            block.x, block.y, block.width, block.height, value.value
        );
    }
    for vector in &data.vectors {
        let block = vector.block;
        println!(
            "    ({}, {}) [{}x{}] = {{{}, {}}}",
            block.x, block.y, block.width, block.height, vector.x, vector.y
        );
    }
    for line in &data.lines {
        let block = line.block;
        println!(
            "    ({}, {}) [{}x{}] line {:?} -> {:?}",
            block.x, block.y, block.width, block.height, line.start, line.end
        );
    }
    for affine in &data.affine {
        let block = affine.block;
        println!(
            "    ({}, {}) [{}x{}] affine {:?}",
            block.x, block.y, block.width, block.height, affine.points
        );
    }
    for polygon in &data.polygon_values {
        println!("    polygon {:?} = {}", polygon.corners, polygon.value);
    }
    for polygon in &data.polygon_vectors {
        println!(
            "    polygon {:?} = {{{}, {}}}",
            polygon.corners, polygon.x, polygon.y
        );
    }
}

fn open_demuxer(
    input: &Path,
    options: Option<&ScanOptions>,
) -> Result<PacketDemuxer, Box<dyn std::error::Error>> {
    Ok(PacketDemuxer::open(&FfmpegLibrary, input, None, options)?)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Info { input, json } => {
            let demuxer = open_demuxer(&input, None)?;
            let metadata = demuxer.metadata();
            let hints = FileNameFormat::from_path(&input);
            if json {
                let payload = json!({
                    "path": input.display().to_string(),
                    "video_stream": demuxer.video_stream_index(),
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "frame_rate": metadata.frame_rate,
                    "pixel_format": metadata.pixel_format,
                    "color_conversion": metadata.color_conversion.to_string(),
                    "access_unit_format": demuxer.access_unit_format().map(|format| format.to_string()),
                    "max_ts": demuxer.max_ts(),
                    "streams": demuxer.stream_descriptions(),
                    "container_metadata": demuxer
                        .container_metadata()
                        .into_iter()
                        .map(|(key, value)| json!({ "key": key, "value": value }))
                        .collect::<Vec<_>>(),
                    "file_name_hints": {
                        "frame_size": hints.frame_size,
                        "frame_rate": hints.frame_rate,
                        "bit_depth": hints.bit_depth,
                        "packed": hints.packed,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "File:".bold(), input.display());
                println!(
                    "Video: {} {}x{} @ {}",
                    metadata.codec,
                    metadata.width,
                    metadata.height,
                    metadata
                        .frame_rate
                        .map_or_else(|| "unknown".to_string(), |rate| format!("{rate:.3} fps"))
                );
                if let Some(pixel_format) = &metadata.pixel_format {
                    println!("Pixel format: {pixel_format} ({:?})", metadata.raw_format);
                }
                println!("Color conversion: {}", metadata.color_conversion);
                if let Some(format) = demuxer.access_unit_format() {
                    println!("Access units: {format}");
                }
                println!("Streams:");
                for description in demuxer.stream_descriptions() {
                    println!("  {description}");
                }
                for (key, value) in demuxer.container_metadata() {
                    println!("{key}: {value}");
                }
                if let Some((width, height)) = hints.frame_size {
                    println!("File name suggests {width}x{height}");
                }
            }
        }
        Commands::Index {
            input,
            json,
            validate,
        } => {
            let (options, bar) = scan_options(&cli.global, "indexing")?;
            let demuxer = open_demuxer(&input, Some(&options))?;
            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            let index = demuxer.seek_index();
            let group_of_pictures = index.group_of_pictures();
            if json {
                let payload = json!({
                    "frame_count": index.frame_count(),
                    "seek_points": index
                        .points()
                        .iter()
                        .map(|point| json!({ "frame": point.frame_index, "dts": point.dts }))
                        .collect::<Vec<_>>(),
                    "group_of_pictures": {
                        "average": group_of_pictures.average_group_of_pictures_size,
                        "min": group_of_pictures.min_group_of_pictures_size,
                        "max": group_of_pictures.max_group_of_pictures_size,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} {} frames, {} seek points",
                    "indexed".green().bold(),
                    index.frame_count(),
                    index.len()
                );
                for point in index.points() {
                    println!("  frame {:>8}  dts {}", point.frame_index, point.dts);
                }
                println!(
                    "Group of Pictures: average {:.1}, min {}, max {}",
                    group_of_pictures.average_group_of_pictures_size,
                    group_of_pictures.min_group_of_pictures_size,
                    group_of_pictures.max_group_of_pictures_size
                );
            }

            if validate {
                print!("{}", demuxer.validate());
            }
        }
        Commands::Units { input, packets } => {
            let mut demuxer = open_demuxer(&input, None)?;
            match demuxer.parameter_sets() {
                Ok(parameter_sets) => {
                    for (index, parameter_set) in parameter_sets.iter().enumerate() {
                        println!(
                            "parameter set {index}: {} bytes  {}",
                            parameter_set.len(),
                            print_hex_prefix(parameter_set, 8)
                        );
                    }
                }
                Err(error) => eprintln!("{} {error}", "warning:".yellow().bold()),
            }

            let mut seen_packets = 0usize;
            while seen_packets < packets {
                let Some(packet) = demuxer.next_packet(false, true) else {
                    break;
                };
                seen_packets += 1;
                println!(
                    "packet {seen_packets}: {} bytes, pts {:?}, dts {:?}{}",
                    packet.size(),
                    packet.pts,
                    packet.dts,
                    if packet.is_keyframe { " [key]".green().to_string() } else { String::new() }
                );
            }
            if seen_packets == 0 {
                println!("no video packets");
                return Ok(());
            }

            demuxer.seek_to_start()?;
            let Some(format) = demuxer.access_unit_format() else {
                return Err("could not determine the access unit format".into());
            };
            println!("{} {format}", "access units:".bold());
            let mut unit_count = 0usize;
            let mut packet_count = 0usize;
            while packet_count < seen_packets {
                let Some(packet) = demuxer.next_packet(false, true) else {
                    break;
                };
                packet_count += 1;
                for unit in bitscope::split_packet(format, &packet.data) {
                    unit_count += 1;
                    let bytes = unit.slice(&packet.data);
                    println!(
                        "  unit {unit_count}: packet {packet_count}, offset {}, {} bytes  {}",
                        unit.offset,
                        unit.len,
                        print_hex_prefix(bytes, 8)
                    );
                }
            }
        }
        Commands::Stats {
            input,
            format,
            frame,
            type_id,
        } => {
            let format = match format {
                Some(format) => parse_statistics_format(&format)
                    .ok_or(format!("unsupported --format: {format}"))?,
                None => StatisticsFormat::from_path(&input)
                    .ok_or("could not determine the statistics format (use --format)")?,
            };
            let (options, bar) = scan_options(&cli.global, "scanning")?;
            let mut stats = StatisticsFile::open_with_options(
                &input,
                format,
                SourceOptions::new().with_watch_files(false),
                options,
            )?;

            // Poll like an interactive viewer would.
            let mut types_seen = 0usize;
            loop {
                let mut finished = None;
                for event in stats.poll_events() {
                    match event {
                        StatisticsEvent::TypeAvailable { .. }
                        | StatisticsEvent::FrameAvailable { .. } => types_seen += 1,
                        StatisticsEvent::Finished(state) => finished = Some(state),
                        StatisticsEvent::Progress(_) => {}
                    }
                }
                if finished.is_some() || stats.state().is_terminal() {
                    break;
                }
                thread::sleep(Duration::from_millis(100));
            }
            stats.wait();
            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            let info = stats.info();
            print!("{info}");
            println!("Index entries: {types_seen}");
            if info.state == ScanState::Errored {
                eprintln!("{} scan stopped early", "warning:".yellow().bold());
            }

            println!("{}", "Types:".bold());
            for statistics_type in stats.types() {
                println!(
                    "  {:>3} {} ({})",
                    statistics_type.id,
                    statistics_type.name,
                    statistics_type.kind()
                );
            }

            if let Some(frame) = frame {
                println!("{} {frame}", "Frame".bold());
                let types: Vec<_> = stats
                    .types()
                    .iter()
                    .filter(|statistics_type| type_id.is_none_or(|id| id == statistics_type.id))
                    .map(|statistics_type| (statistics_type.id, statistics_type.name.clone()))
                    .collect();
                for (id, name) in types {
                    let data = stats.load_statistic_data(frame, id);
                    print_frame_type_data(&format!("{id} {name}"), &data);
                }
                if let Some(error) = stats.error() {
                    eprintln!("{} {error}", "warning:".yellow().bold());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "bitscope", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
