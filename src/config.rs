use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use std::collections::BTreeMap;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::dmd::matrix::options::{describe_value, MatrixOptions};
use crate::frame::FrameGeometry;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("couldn't set option {key} = {value}")]
    RejectedOption { key: String, value: String },
    #[error("{schema}: missing required key '{key}'")]
    MissingKey { schema: &'static str, key: &'static str },
}

/// Raw config section, validated against its schema on resolve
pub type Section = BTreeMap<String, Value>;

/// Which output the frames go to. Named after the config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// rpi-rgb-led-matrix driving the panel from the GPIO header
    #[value(name = "rpi_dmd")]
    RpiDmd,
    /// datagrams to an external renderer
    #[value(name = "socket_dmd")]
    SocketDmd,
}

impl PlatformKind {
    pub fn schema(&self) -> &'static str {
        match self {
            PlatformKind::RpiDmd => "rpi_dmd",
            PlatformKind::SocketDmd => "socket_dmd",
        }
    }
}

/// Where the binary gets its frames from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrameSource {
    /// animated test pattern
    Pattern,
    /// raw rows*cols*3 frames on stdin
    Stdin,
    /// only the startup frame
    Blank,
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub platform: Option<PlatformKind>,
    pub rpi_dmd: Option<Section>,
    pub socket_dmd: Option<Section>,
}

/// Validated, immutable device configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DmdConfig {
    pub geometry: FrameGeometry,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkConfig {
    Hardware(MatrixOptions),
    Socket { dmd_socket: PathBuf },
}

impl DmdConfig {
    pub fn kind(&self) -> PlatformKind {
        match self.sink {
            SinkConfig::Hardware(_) => PlatformKind::RpiDmd,
            SinkConfig::Socket { .. } => PlatformKind::SocketDmd,
        }
    }

    /// Validate a raw section against the schema of `kind`.
    ///
    /// For `rpi_dmd` every key, `rows` and `cols` included, is handed to the
    /// matrix driver options; the first one the driver does not accept fails
    /// the whole section.
    pub fn from_section(kind: PlatformKind, section: &Section) -> Result<Self, ConfigError> {
        let schema = kind.schema();
        let rows = dimension(schema, section, "rows")?;
        let cols = dimension(schema, section, "cols")?;
        let geometry = FrameGeometry::new(rows, cols);

        let sink = match kind {
            PlatformKind::RpiDmd => SinkConfig::Hardware(MatrixOptions::from_pairs(section.iter())?),
            PlatformKind::SocketDmd => {
                for (key, value) in section {
                    if !matches!(key.as_str(), "rows" | "cols" | "dmd_socket") {
                        return Err(ConfigError::RejectedOption {
                            key: key.clone(),
                            value: describe_value(value),
                        });
                    }
                }
                let path = section.get("dmd_socket")
                    .ok_or(ConfigError::MissingKey { schema, key: "dmd_socket" })?;
                let path = path.as_str()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| ConfigError::Validation(format!(
                        "{schema}: dmd_socket must be a non-empty path, got {}",
                        describe_value(path)
                    )))?;
                SinkConfig::Socket { dmd_socket: PathBuf::from(path) }
            }
        };

        Ok(Self { geometry, sink })
    }
}

impl Config {
    /// The platform to drive: explicit choice, else the only section present.
    pub fn platform_kind(&self) -> Result<PlatformKind, ConfigError> {
        if let Some(kind) = self.platform {
            return Ok(kind);
        }
        match (&self.rpi_dmd, &self.socket_dmd) {
            (Some(_), None) => Ok(PlatformKind::RpiDmd),
            (None, Some(_)) => Ok(PlatformKind::SocketDmd),
            (Some(_), Some(_)) => Err(ConfigError::Validation(
                "both rpi_dmd and socket_dmd configured, set platform".into()
            )),
            (None, None) => Err(ConfigError::Validation(
                "no display configured (rpi_dmd or socket_dmd)".into()
            )),
        }
    }

    pub fn section(&self, kind: PlatformKind) -> Option<&Section> {
        match kind {
            PlatformKind::RpiDmd => self.rpi_dmd.as_ref(),
            PlatformKind::SocketDmd => self.socket_dmd.as_ref(),
        }
    }

    fn section_mut(&mut self, kind: PlatformKind) -> &mut Section {
        let slot = match kind {
            PlatformKind::RpiDmd => &mut self.rpi_dmd,
            PlatformKind::SocketDmd => &mut self.socket_dmd,
        };
        slot.get_or_insert_with(Section::new)
    }

    /// Resolve the selected section into a device configuration
    pub fn dmd_config(&self) -> Result<DmdConfig, ConfigError> {
        let kind = self.platform_kind()?;
        let section = self.section(kind)
            .ok_or_else(|| ConfigError::Validation(format!("{} section missing", kind.schema())))?;
        DmdConfig::from_section(kind, section)
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "rgbdmd", version, about = "RGB DMD frame forwarder", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long, value_enum)]
    pub platform: Option<PlatformKind>,
    #[arg(long)]
    pub rows: Option<u32>,
    #[arg(long)]
    pub cols: Option<u32>,
    /// Unix datagram socket of the external renderer
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub dmd_socket: Option<PathBuf>,
    /// Driver option for rpi_dmd, repeatable (e.g. gpio_slowdown=2)
    #[arg(long = "matrix-option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub matrix_options: Vec<(String, Value)>,
    /// Panel brightness 0.0 - 1.0
    #[arg(long)]
    pub brightness: Option<f32>,
    #[arg(long, value_enum, default_value_t = FrameSource::Pattern)]
    pub source: FrameSource,
    /// Pattern frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// KEY=VALUE with VALUE read as a YAML scalar, so 2 is a number and true a bool
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s.split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty option name in '{s}'"));
    }
    let value = serde_yaml::from_str::<Value>(value.trim())
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    Ok((key.to_string(), value))
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    load_from(&cli)
}

/// Same as [`load`] for an already parsed command line.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli)?;

    // 4) Validate
    validate(&cfg)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/rgbdmd/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/rgbdmd/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/rgbdmd.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["rgbdmd.yaml", "config.yaml", "config/rgbdmd.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`; sections merge key by key.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()  { dst.log_level = src.log_level; }
    if src.platform.is_some()   { dst.platform = src.platform; }
    merge_section(&mut dst.rpi_dmd, src.rpi_dmd);
    merge_section(&mut dst.socket_dmd, src.socket_dmd);
}

fn merge_section(dst: &mut Option<Section>, src: Option<Section>) {
    match (dst.as_mut(), src) {
        (None, Some(s)) => *dst = Some(s),
        (Some(d), Some(s)) => d.extend(s),
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) -> Result<(), ConfigError> {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.platform.is_some()  { cfg.platform = cli.platform; }

    // socket path or matrix options imply the platform when nothing else does
    if cfg.platform.is_none() && cfg.rpi_dmd.is_none() && cfg.socket_dmd.is_none() {
        if cli.dmd_socket.is_some() {
            cfg.platform = Some(PlatformKind::SocketDmd);
        } else if !cli.matrix_options.is_empty() {
            cfg.platform = Some(PlatformKind::RpiDmd);
        }
    }

    let any_override = cli.rows.is_some()
        || cli.cols.is_some()
        || cli.dmd_socket.is_some()
        || !cli.matrix_options.is_empty();
    if !any_override {
        return Ok(());
    }

    let kind = cfg.platform_kind()?;
    let section = cfg.section_mut(kind);
    if let Some(rows) = cli.rows { section.insert("rows".into(), Value::from(rows)); }
    if let Some(cols) = cli.cols { section.insert("cols".into(), Value::from(cols)); }
    if let Some(path) = cli.dmd_socket.as_ref() {
        if kind != PlatformKind::SocketDmd {
            return Err(ConfigError::Validation("--dmd-socket only applies to socket_dmd".into()));
        }
        section.insert("dmd_socket".into(), Value::String(path.display().to_string()));
    }
    for (key, value) in &cli.matrix_options {
        if kind != PlatformKind::RpiDmd {
            return Err(ConfigError::Validation("--matrix-option only applies to rpi_dmd".into()));
        }
        section.insert(key.clone(), value.clone());
    }
    Ok(())
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(level) = cfg.log_level.as_deref() {
        match level.to_ascii_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => {},
            _ => return Err(ConfigError::Validation(format!("unknown log_level '{level}'"))),
        }
    }
    // resolving runs the schema checks
    cfg.dmd_config()?;
    Ok(())
}

fn dimension(schema: &'static str, section: &Section, key: &'static str) -> Result<u32, ConfigError> {
    let value = section.get(key).ok_or(ConfigError::MissingKey { schema, key })?;
    value.as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| ConfigError::Validation(format!(
            "{schema}: {key} must be a positive integer, got {}",
            describe_value(value)
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["rgbdmd"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_socket_section_resolves() {
        let cfg = parse_yaml("socket_dmd:\n  rows: 32\n  cols: 128\n  dmd_socket: /tmp/dmd.sock\n").unwrap();
        let dmd = cfg.dmd_config().unwrap();

        assert_eq!(dmd.geometry, FrameGeometry::new(32, 128));
        assert_eq!(dmd.sink, SinkConfig::Socket { dmd_socket: PathBuf::from("/tmp/dmd.sock") });
        assert_eq!(dmd.kind(), PlatformKind::SocketDmd);
    }

    #[test]
    fn test_socket_section_requires_path() {
        let cfg = parse_yaml("socket_dmd:\n  rows: 32\n  cols: 128\n").unwrap();
        let err = cfg.dmd_config().unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "dmd_socket", .. }));
    }

    #[test]
    fn test_socket_section_rejects_driver_options() {
        let cfg = parse_yaml("socket_dmd:\n  rows: 32\n  cols: 128\n  dmd_socket: /tmp/x\n  gpio_slowdown: 2\n").unwrap();
        assert!(matches!(cfg.dmd_config(), Err(ConfigError::RejectedOption { .. })));
    }

    #[test]
    fn test_rpi_section_copies_options() {
        let cfg = parse_yaml("rpi_dmd:\n  rows: 32\n  cols: 64\n  chain_length: 2\n  hardware_mapping: adafruit-hat-pwm\n").unwrap();
        let dmd = cfg.dmd_config().unwrap();

        match dmd.sink {
            SinkConfig::Hardware(options) => {
                assert_eq!(options.rows, Some(32));
                assert_eq!(options.cols, Some(64));
                assert_eq!(options.chain_length, Some(2));
                assert_eq!(options.hardware_mapping.as_deref(), Some("adafruit-hat-pwm"));
            }
            other => panic!("expected hardware sink, got {:?}", other),
        }
    }

    #[test]
    fn test_rpi_section_rejects_unknown_key() {
        let cfg = parse_yaml("rpi_dmd:\n  rows: 32\n  cols: 64\n  led_sparkle: yes please\n").unwrap();
        let err = cfg.dmd_config().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("led_sparkle"), "{msg}");
        assert!(msg.contains("yes please"), "{msg}");
    }

    #[test]
    fn test_zero_rows_rejected() {
        let cfg = parse_yaml("socket_dmd:\n  rows: 0\n  cols: 128\n  dmd_socket: /tmp/x\n").unwrap();
        assert!(matches!(cfg.dmd_config(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_platform_inferred_from_single_section() {
        let cfg = parse_yaml("rpi_dmd:\n  rows: 16\n  cols: 32\n").unwrap();
        assert_eq!(cfg.platform_kind().unwrap(), PlatformKind::RpiDmd);
    }

    #[test]
    fn test_ambiguous_platform() {
        let cfg = parse_yaml(
            "rpi_dmd:\n  rows: 16\n  cols: 32\nsocket_dmd:\n  rows: 16\n  cols: 32\n  dmd_socket: /tmp/x\n"
        ).unwrap();
        assert!(cfg.platform_kind().is_err());

        let cfg = parse_yaml(
            "platform: socket_dmd\nrpi_dmd:\n  rows: 16\n  cols: 32\nsocket_dmd:\n  rows: 16\n  cols: 32\n  dmd_socket: /tmp/x\n"
        ).unwrap();
        assert_eq!(cfg.platform_kind().unwrap(), PlatformKind::SocketDmd);
    }

    #[test]
    fn test_merge_sections_key_by_key() {
        let mut base = parse_yaml("rpi_dmd:\n  rows: 16\n  cols: 32\n  gpio_slowdown: 1\n").unwrap();
        let over = parse_yaml("log_level: debug\nrpi_dmd:\n  gpio_slowdown: 4\n").unwrap();
        merge(&mut base, over);

        let section = base.rpi_dmd.as_ref().unwrap();
        assert_eq!(section.get("rows"), Some(&Value::from(16)));
        assert_eq!(section.get("gpio_slowdown"), Some(&Value::from(4)));
        assert_eq!(base.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_overrides_build_socket_config() {
        let args = cli(&["--rows", "32", "--cols", "128", "--dmd-socket", "/run/dmd.sock"]);
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &args).unwrap();

        let dmd = cfg.dmd_config().unwrap();
        assert_eq!(dmd.geometry.frame_len(), 12288);
        assert_eq!(dmd.sink, SinkConfig::Socket { dmd_socket: PathBuf::from("/run/dmd.sock") });
    }

    #[test]
    fn test_cli_matrix_options_are_typed() {
        let args = cli(&[
            "--platform", "rpi_dmd", "--rows", "32", "--cols", "64",
            "--matrix-option", "gpio_slowdown=3",
            "--matrix-option", "inverse_colors=true",
        ]);
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &args).unwrap();

        match cfg.dmd_config().unwrap().sink {
            SinkConfig::Hardware(options) => {
                assert_eq!(options.gpio_slowdown, Some(3));
                assert_eq!(options.inverse_colors, Some(true));
            }
            other => panic!("expected hardware sink, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("pwm_bits=7").unwrap(), ("pwm_bits".to_string(), Value::from(7)));
        assert_eq!(
            parse_key_value("hardware_mapping=adafruit-hat").unwrap().1,
            Value::String("adafruit-hat".into())
        );
        assert!(parse_key_value("pwm_bits").is_err());
        assert!(parse_key_value("=3").is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut cfg = parse_yaml("socket_dmd:\n  rows: 8\n  cols: 8\n  dmd_socket: /tmp/x\n").unwrap();
        assert!(validate(&cfg).is_ok());
        cfg.log_level = Some("chatty".into());
        assert!(validate(&cfg).is_err());
    }
}
