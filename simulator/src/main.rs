use anyhow::Context;
use clap::Parser;
use generator::probe::ProbeGeneratorConfig;
use gui_bridge::bridge::{gui_bind_address, GuiBridge};
use probecore::{ChannelId, ComputeDevice, DisplayParams, SpotScale, TemplateArgs, XCenters};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

fn parse_click(raw: &str) -> Result<(f64, f64), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", raw))?;
    let x = x.trim().parse::<f64>().map_err(|err| err.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|err| err.to_string())?;
    Ok((x, y))
}

fn parse_device(raw: &str) -> Result<ComputeDevice, String> {
    match raw.to_ascii_lowercase().as_str() {
        "cpu" => Ok(ComputeDevice::Cpu),
        "parallel" => Ok(ComputeDevice::Parallel),
        other => Err(format!("unknown device '{}'", other)),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Probe layout view driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Use the single-shank Neuropixels 1.0 geometry
    #[arg(long, default_value_t = false)]
    neuropixels: bool,
    #[arg(long, default_value_t = 1)]
    shanks: usize,
    #[arg(long, default_value_t = 2)]
    columns: usize,
    #[arg(long, default_value_t = 48)]
    rows: usize,
    #[arg(long, default_value_t = false)]
    show_templates: bool,
    #[arg(long, default_value_t = false)]
    show_centers: bool,
    #[arg(long, default_value_t = false)]
    lock_aspect: bool,
    /// Spot size multiplier in [0, 10], quantized to 0.25
    #[arg(long, default_value_t = 1.0)]
    spot_scale: f64,
    #[arg(long)]
    dmin: Option<f64>,
    #[arg(long)]
    dminx: Option<f64>,
    #[arg(long)]
    max_distance: Option<f64>,
    /// Number of horizontal grouping centers
    #[arg(long)]
    x_centers: Option<usize>,
    #[arg(long, value_parser = parse_device, default_value = "cpu")]
    device: ComputeDevice,
    /// Channel to mark bad before any clicks (repeatable)
    #[arg(long = "bad-channel")]
    bad_channels: Vec<ChannelId>,
    /// Click position as x,y (repeatable)
    #[arg(long = "click", value_parser = parse_click)]
    clicks: Vec<(f64, f64)>,
    /// Print the final scene as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Append a one-line summary to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Keep the HTTP bridge alive for front-end clicks
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value_t = 9000)]
    port: u16,
}

impl Args {
    fn workflow_config(&self) -> anyhow::Result<WorkflowConfig> {
        if let Some(path) = &self.workflow {
            return WorkflowConfig::load(path);
        }
        let probe = if self.neuropixels {
            ProbeGeneratorConfig::neuropixels1()
        } else {
            ProbeGeneratorConfig {
                shanks: self.shanks,
                columns: self.columns,
                rows: self.rows,
                ..Default::default()
            }
        };
        let defaults = TemplateArgs::default();
        let template = TemplateArgs {
            dmin: self.dmin,
            dminx: self.dminx.or(defaults.dminx),
            max_channel_distance: self.max_distance,
            x_centers: self.x_centers.map(XCenters::Count),
            device: self.device,
            ..defaults
        };
        let display = DisplayParams {
            show_template_grid: self.show_templates,
            show_centers: self.show_centers,
            lock_aspect_ratio: self.lock_aspect,
            spot_scale: SpotScale::from_value(self.spot_scale),
        };
        Ok(WorkflowConfig::from_args(
            probe,
            template,
            display,
            self.bad_channels.clone(),
        ))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = args.workflow_config()?;
    let runner = Runner::new(workflow_config);
    let result = runner.execute(&args.clicks)?;

    println!(
        "Probe view -> channels {}, templates {}, centers {}, bad channels {:?}",
        result.scene.channel_spots.len(),
        result.template_count,
        result.center_count,
        result.bad_channels
    );
    for ((x, y), outcome) in args.clicks.iter().zip(&result.outcomes) {
        println!("  click ({}, {}) -> {:?}", x, y, outcome);
    }

    if args.json {
        let json = result.scene.to_json().context("serializing scene")?;
        println!("{}", json);
    }

    if let Some(report_path) = &args.report {
        let report = format!(
            "channels={} templates={} centers={} bad_channels={:?} toggles={} misses={}\n",
            result.scene.channel_spots.len(),
            result.template_count,
            result.center_count,
            result.bad_channels,
            result.metrics.toggles,
            result.metrics.lookup_misses
        );
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)
            .with_context(|| format!("opening report {}", report_path.display()))?;
        file.write_all(report.as_bytes())?;
    }

    if args.serve {
        let gui_bridge = GuiBridge::new(runner.build_view()?);
        gui_bridge.spawn_server(gui_bind_address(args.port));
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_arguments_parse() {
        assert_eq!(parse_click("11, 20.5"), Ok((11.0, 20.5)));
        assert!(parse_click("11").is_err());
        assert!(parse_click("a,b").is_err());
    }

    #[test]
    fn device_arguments_parse() {
        assert_eq!(parse_device("Parallel"), Ok(ComputeDevice::Parallel));
        assert!(parse_device("gpu").is_err());
    }

    #[test]
    fn cli_flags_build_workflow_config() {
        let args = Args::parse_from([
            "probesim",
            "--rows",
            "4",
            "--show-centers",
            "--spot-scale",
            "2.6",
            "--bad-channel",
            "3",
            "--click",
            "11,0",
        ]);
        let cfg = args.workflow_config().unwrap();
        assert_eq!(cfg.probe.rows, 4);
        assert!(cfg.display.show_centers);
        assert_eq!(cfg.display.spot_scale.value(), 2.5);
        assert_eq!(cfg.bad_channels, vec![3]);
        assert_eq!(cfg.template.dminx, Some(32.0));
        assert_eq!(args.clicks, vec![(11.0, 0.0)]);
    }
}
