//! Coordinate reference system identifiers.
//!
//! A CRS is carried as an opaque identifier; the only operation the
//! containers need is equality. Authority codes are normalized so that
//! `"EPSG:4326"`, `"epsg:4326"`, `"srid:4326"` and `"4326"` compare equal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpatialError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Crs {
    /// EPSG / SRID code.
    Srid(u32),
    /// Any other definition (WKT, PROJJSON text, authority:code pairs), kept verbatim.
    Other(String),
}

impl Crs {
    /// EPSG:4326.
    pub const WGS84: Crs = Crs::Srid(4326);

    pub fn srid(&self) -> Option<u32> {
        match self {
            Crs::Srid(code) => Some(*code),
            Crs::Other(_) => None,
        }
    }
}

impl FromStr for Crs {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SpatialError::InvalidCrs("empty CRS identifier".into()));
        }

        let lower = s.to_ascii_lowercase();
        let code = lower
            .strip_prefix("epsg:")
            .or_else(|| lower.strip_prefix("srid:"))
            .unwrap_or(&lower);

        if let Ok(code) = code.parse::<u32>() {
            return Ok(Crs::Srid(code));
        }
        Ok(Crs::Other(s.to_owned()))
    }
}

impl TryFrom<String> for Crs {
    type Error = SpatialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Srid(code) => write!(f, "EPSG:{}", code),
            Crs::Other(s) => f.write_str(s),
        }
    }
}
