use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

/// wort - HTTP API server for temperature sensor readings.
#[derive(Parser, Debug, Clone)]
#[command(name = "wort", version, about)]
pub struct Config {
    /// Path and filename of the readings database.
    #[arg(long = "db", default_value = "temperatures.db")]
    pub database_file: PathBuf,

    /// IP address to listen to.
    #[arg(long = "ip", default_value = "0.0.0.0")]
    pub listen_ip: IpAddr,

    /// Port to listen to.
    #[arg(long = "port", default_value_t = 3834)]
    pub listen_port: u16,

    /// Directory with index.html and the static/ assets.
    #[arg(long = "html", default_value = "html")]
    pub html_dir: PathBuf,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.listen_port)
    }
}
