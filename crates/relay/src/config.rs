//! Relay configuration.
//!
//! Every deployment is one tracking variant: a payload convention plus the
//! port its producer connects to. Values come from environment variables
//! (optionally loaded from `.env`), with per-variant defaults.

use crate::error::{RelayError, Result};
use decoder::{PayloadConvention, HAND_BLOCK_VALUES, MAX_BLOCK_VALUES};
use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// Variant used when `RELAY_VARIANT` is unset.
pub const DEFAULT_VARIANT: TrackingVariant = TrackingVariant::Hands;

/// Tracking variants and the producer layouts they expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingVariant {
    FaceMesh,
    FaceMeshReduced,
    Pose,
    Hands,
    Holistic,
    HolisticReduced,
    Iris,
    FaceMeshJweb,
    HandposeJweb,
    PoseJweb,
    HolisticJweb,
}

impl TrackingVariant {
    pub const ALL: [TrackingVariant; 11] = [
        TrackingVariant::FaceMesh,
        TrackingVariant::FaceMeshReduced,
        TrackingVariant::Pose,
        TrackingVariant::Hands,
        TrackingVariant::Holistic,
        TrackingVariant::HolisticReduced,
        TrackingVariant::Iris,
        TrackingVariant::FaceMeshJweb,
        TrackingVariant::HandposeJweb,
        TrackingVariant::PoseJweb,
        TrackingVariant::HolisticJweb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackingVariant::FaceMesh => "facemesh",
            TrackingVariant::FaceMeshReduced => "facemesh-reduced",
            TrackingVariant::Pose => "pose",
            TrackingVariant::Hands => "hands",
            TrackingVariant::Holistic => "holistic",
            TrackingVariant::HolisticReduced => "holistic-reduced",
            TrackingVariant::Iris => "iris",
            TrackingVariant::FaceMeshJweb => "facemesh-jweb",
            TrackingVariant::HandposeJweb => "handpose-jweb",
            TrackingVariant::PoseJweb => "pose-jweb",
            TrackingVariant::HolisticJweb => "holistic-jweb",
        }
    }

    /// Port the producer for this variant connects to.
    pub fn default_port(self) -> u16 {
        match self {
            TrackingVariant::FaceMeshReduced | TrackingVariant::Pose | TrackingVariant::Hands => {
                8080
            }
            TrackingVariant::FaceMesh => 8082,
            TrackingVariant::HolisticReduced | TrackingVariant::Iris => 8083,
            TrackingVariant::Holistic | TrackingVariant::FaceMeshJweb => 8084,
            TrackingVariant::HandposeJweb => 8085,
            TrackingVariant::PoseJweb => 8086,
            TrackingVariant::HolisticJweb => 8087,
        }
    }

    pub fn convention(self) -> PayloadConvention {
        match self {
            TrackingVariant::FaceMesh => PayloadConvention::flat("/facemesh"),
            TrackingVariant::FaceMeshReduced => PayloadConvention::flat_strict("/face"),
            TrackingVariant::Pose => PayloadConvention::flat("/pose"),
            TrackingVariant::Hands => PayloadConvention::labeled("/hand", HAND_BLOCK_VALUES),
            TrackingVariant::Holistic | TrackingVariant::HolisticReduced => {
                PayloadConvention::AddressedVector
            }
            TrackingVariant::Iris
            | TrackingVariant::FaceMeshJweb
            | TrackingVariant::HandposeJweb
            | TrackingVariant::PoseJweb
            | TrackingVariant::HolisticJweb => PayloadConvention::AddressedObject,
        }
    }
}

impl fmt::Display for TrackingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackingVariant {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|v| v.name()).collect();
                RelayError::Config(format!(
                    "unknown variant '{}', expected one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Where decoded records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutletSpec {
    /// JSON lines on stdout.
    Stdout,
    /// OSC messages over UDP.
    Udp(SocketAddr),
}

impl FromStr for OutletSpec {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("stdout") {
            return Ok(OutletSpec::Stdout);
        }

        let target = s.strip_prefix("udp://").ok_or_else(|| {
            RelayError::Config(format!(
                "unsupported outlet '{}', expected 'stdout' or 'udp://host:port'",
                s
            ))
        })?;
        let addr = target
            .to_socket_addrs()
            .map_err(|e| RelayError::Config(format!("invalid outlet address '{}': {}", target, e)))?
            .next()
            .ok_or_else(|| RelayError::Config(format!("outlet address '{}' did not resolve", target)))?;
        Ok(OutletSpec::Udp(addr))
    }
}

impl fmt::Display for OutletSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutletSpec::Stdout => f.write_str("stdout"),
            OutletSpec::Udp(addr) => write!(f, "udp://{}", addr),
        }
    }
}

/// Full relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub variant: TrackingVariant,
    /// Interface the WebSocket listener binds to.
    pub bind_addr: IpAddr,
    /// WebSocket listener port.
    pub port: u16,
    pub outlet: OutletSpec,
    /// Prometheus exporter port; no exporter when unset.
    pub metrics_port: Option<u16>,
    /// Convention after applying overrides.
    pub convention: PayloadConvention,
}

impl RelayConfig {
    /// Defaults for a variant.
    pub fn for_variant(variant: TrackingVariant) -> Self {
        Self {
            variant,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: variant.default_port(),
            outlet: OutletSpec::Stdout,
            metrics_port: None,
            convention: variant.convention(),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let variant = match lookup("RELAY_VARIANT") {
            Some(name) => name.parse()?,
            None => DEFAULT_VARIANT,
        };
        let mut config = Self::for_variant(variant);

        if let Some(port) = lookup("WS_PORT") {
            config.port = parse_value("WS_PORT", &port)?;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = parse_value("BIND_ADDR", &addr)?;
        }
        if let Some(outlet) = lookup("OUTLET") {
            config.outlet = outlet.parse()?;
        }
        if let Some(port) = lookup("METRICS_PORT") {
            config.metrics_port = Some(parse_value("METRICS_PORT", &port)?);
        }

        if let Some(address) = lookup("RELAY_ADDRESS") {
            match &mut config.convention {
                PayloadConvention::Flat(flat) if !address.is_empty() => flat.address = address,
                PayloadConvention::Flat(_) => {
                    return Err(RelayError::Config("RELAY_ADDRESS must not be empty".to_string()));
                }
                other => return Err(not_applicable("RELAY_ADDRESS", other)),
            }
        }
        if let Some(prefix) = lookup("RELAY_PREFIX") {
            match &mut config.convention {
                PayloadConvention::Labeled(labeled) => labeled.prefix = prefix,
                other => return Err(not_applicable("RELAY_PREFIX", other)),
            }
        }
        if let Some(block_values) = lookup("RELAY_BLOCK_VALUES") {
            let block_values: usize = parse_value("RELAY_BLOCK_VALUES", &block_values)?;
            if block_values == 0 || block_values > MAX_BLOCK_VALUES {
                return Err(RelayError::Config(format!(
                    "RELAY_BLOCK_VALUES must be between 1 and {}, got {}",
                    MAX_BLOCK_VALUES, block_values
                )));
            }
            match &mut config.convention {
                PayloadConvention::Labeled(labeled) => labeled.block_values = block_values,
                other => return Err(not_applicable("RELAY_BLOCK_VALUES", other)),
            }
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RelayError::Config(format!("{} must be valid: '{}' ({})", key, value, e)))
}

fn not_applicable(key: &str, convention: &PayloadConvention) -> RelayError {
    RelayError::Config(format!(
        "{} does not apply to the {} convention",
        key,
        convention.name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.variant, TrackingVariant::Hands);
        assert_eq!(config.port, 8080);
        assert_eq!(config.outlet, OutletSpec::Stdout);
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.convention, PayloadConvention::hands());
        assert_eq!(config.listen_addr(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_variant_names_round_trip() {
        for variant in TrackingVariant::ALL {
            assert_eq!(variant.name().parse::<TrackingVariant>().unwrap(), variant);
        }
        assert_eq!(
            "Holistic_JWEB".parse::<TrackingVariant>().unwrap(),
            TrackingVariant::HolisticJweb
        );
        assert!("skeleton".parse::<TrackingVariant>().is_err());
    }

    #[test]
    fn test_variant_presets() {
        assert_eq!(TrackingVariant::FaceMesh.default_port(), 8082);
        assert_eq!(
            TrackingVariant::FaceMesh.convention(),
            PayloadConvention::flat("/facemesh")
        );
        assert_eq!(
            TrackingVariant::FaceMeshReduced.convention(),
            PayloadConvention::flat_strict("/face")
        );
        assert_eq!(TrackingVariant::Iris.default_port(), 8083);
        assert_eq!(
            TrackingVariant::Iris.convention(),
            PayloadConvention::AddressedObject
        );
        assert_eq!(TrackingVariant::HolisticJweb.default_port(), 8087);
        assert_eq!(
            TrackingVariant::Holistic.convention(),
            PayloadConvention::AddressedVector
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("RELAY_VARIANT", "pose"),
            ("WS_PORT", "9001"),
            ("BIND_ADDR", "127.0.0.1"),
            ("OUTLET", "udp://127.0.0.1:7400"),
            ("METRICS_PORT", "9100"),
            ("RELAY_ADDRESS", "/body"),
        ]))
        .unwrap();

        assert_eq!(config.variant, TrackingVariant::Pose);
        assert_eq!(config.listen_addr(), "127.0.0.1:9001".parse::<SocketAddr>().unwrap());
        assert_eq!(
            config.outlet,
            OutletSpec::Udp("127.0.0.1:7400".parse().unwrap())
        );
        assert_eq!(config.metrics_port, Some(9100));
        assert_eq!(config.convention, PayloadConvention::flat("/body"));
    }

    #[test]
    fn test_labeled_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("RELAY_PREFIX", "/hands"),
            ("RELAY_BLOCK_VALUES", "42"),
        ]))
        .unwrap();
        assert_eq!(config.convention, PayloadConvention::labeled("/hands", 42));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let cases: [&[(&str, &str)]; 9] = [
            &[("RELAY_VARIANT", "skeleton")],
            &[("WS_PORT", "eighty")],
            &[("WS_PORT", "70000")],
            &[("OUTLET", "tcp://127.0.0.1:1")],
            &[("RELAY_BLOCK_VALUES", "0")],
            &[("RELAY_BLOCK_VALUES", "65537")],
            &[("RELAY_BLOCK_VALUES", "18446744073709551615")],
            &[("RELAY_VARIANT", "iris"), ("RELAY_PREFIX", "/x")],
            &[("RELAY_VARIANT", "hands"), ("RELAY_ADDRESS", "/x")],
        ];
        for pairs in cases {
            let result = RelayConfig::from_lookup(lookup(pairs));
            assert!(
                matches!(result, Err(RelayError::Config(_))),
                "{:?} should be rejected",
                pairs
            );
        }
    }

    #[test]
    fn test_block_values_upper_bound() {
        let max = MAX_BLOCK_VALUES.to_string();
        let config =
            RelayConfig::from_lookup(lookup(&[("RELAY_BLOCK_VALUES", max.as_str())])).unwrap();
        assert_eq!(
            config.convention,
            PayloadConvention::labeled("/hand", MAX_BLOCK_VALUES)
        );
    }

    #[test]
    fn test_outlet_spec_display() {
        assert_eq!(OutletSpec::Stdout.to_string(), "stdout");
        let udp: OutletSpec = "udp://127.0.0.1:7400".parse().unwrap();
        assert_eq!(udp.to_string(), "udp://127.0.0.1:7400");
    }
}
