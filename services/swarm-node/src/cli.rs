use clap::Parser;
use std::path::PathBuf;
use swarmlink_core::Position;

/// SwarmLink node - fly a fleet of vehicles under remote control
#[derive(Parser, Debug)]
#[command(name = "swarmlink-node")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "SWARMLINK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to accept client connections on (overrides the config file)
    #[arg(long, value_name = "HOST:PORT")]
    pub bind: Option<String>,

    /// Physical vehicles by radio address suffix
    #[arg(long, num_args = 0.., value_name = "N")]
    pub drones: Vec<u8>,

    /// Simulated vehicles by starting position
    #[arg(long = "virtual", num_args = 0.., value_name = "X,Y,Z", value_parser = parse_position)]
    pub virtual_drones: Vec<Position>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Print the version handshake as JSON and exit
    #[arg(long)]
    pub version_json: bool,
}

/// Parse `x,y,z` in meters.
pub fn parse_position(raw: &str) -> Result<Position, String> {
    let coords = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{raw}': {e}"))?;
    match coords.as_slice() {
        [x, y, z] if coords.iter().all(|c| c.is_finite()) => Ok(Position::new(*x, *y, *z, 0.0)),
        [_, _, _] => Err(format!("coordinates in '{raw}' must be finite")),
        _ => Err(format!("expected x,y,z but got '{raw}'")),
    }
}
