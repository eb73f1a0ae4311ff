/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! externally supplied airspace zones and the per-zone parts of containment testing.
//!
//! Zones are read-only data for us. Everything that can be wrong with a zone (degenerate rings,
//! altitude bounds we can't parse) is detected by [`AirspaceZone::resolve`], which turns a zone into
//! a [`ResolvedZone`] with numeric bounds in feet that can be tested cheaply for each aircraft.

use std::fmt;
use serde::{Serialize,Deserialize};
use uom::si::{f64::Length, length::{meter,foot}};

use crate::errors::ZoneError;
use crate::geo::{LonLat,GeoPos,point_in_polygon};

/// keywords we check zone names against if the classification is not in the restricted set
pub const RESTRICTED_KEYWORDS: [&str;4] = ["RESTRICTED", "PROHIBITED", "DANGER", "MILITARY"];

/// keywords in classification or name that make detections alertable
pub const ALERT_KEYWORDS: [&str;3] = ["PROHIBITED", "DANGER", "MILITARY"];

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum AltitudeReference {
    Agl,
    Msl,
}

/// one bound of an altitude band, e.g. `"FL100"`, `"3000M"`, `"4500FT"`, `"GND"` or `"UNL"`
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AltitudeLimit {
    pub value: String,
    pub reference: AltitudeReference,
}

impl AltitudeLimit {
    pub fn new (value: impl ToString, reference: AltitudeReference)->Self {
        AltitudeLimit { value: value.to_string(), reference }
    }

    pub fn msl (value: impl ToString)->Self { AltitudeLimit::new( value, AltitudeReference::Msl) }
    pub fn agl (value: impl ToString)->Self { AltitudeLimit::new( value, AltitudeReference::Agl) }
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AltitudeBand {
    pub lower: AltitudeLimit,
    pub upper: AltitudeLimit,
}

#[derive(Debug,Clone,Copy,PartialEq,Default,Serialize,Deserialize)]
#[serde(default)]
pub struct RestrictionFlags {
    pub notam_only: bool,
    pub special_agreement: bool,
}

impl RestrictionFlags {
    pub fn any (&self)->bool { self.notam_only || self.special_agreement }
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AirspaceZone {
    pub id: String,
    pub name: String,
    pub classification: String,
    pub polygon: Vec<LonLat>,
    pub altitude_band: AltitudeBand,
    #[serde(default)]
    pub restriction_flags: RestrictionFlags,
}

impl fmt::Display for AirspaceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "AirspaceZone( id: {}, name: \"{}\", class: {}, n_vertices: {}, band: [{},{}])",
            self.id, self.name, self.classification, self.polygon.len(), self.altitude_band.lower.value, self.altitude_band.upper.value)
    }
}

impl AirspaceZone {
    /// is this zone subject to violation detection. Classes are compared case-insensitive
    pub fn is_restricted (&self, restricted_classes: &[String])->bool {
        let class = self.classification.trim();
        if restricted_classes.iter().any( |c| c.eq_ignore_ascii_case( class)) { return true }
        if self.restriction_flags.any() { return true }

        let name = self.name.to_uppercase();
        RESTRICTED_KEYWORDS.iter().any( |kw| name.contains( kw))
    }

    /// do violations of this zone warrant a notification
    pub fn is_alertable (&self)->bool {
        let class = self.classification.to_uppercase();
        let name = self.name.to_uppercase();
        ALERT_KEYWORDS.iter().any( |kw| class.contains( kw) || name.contains( kw))
    }

    /// check polygon and altitude bounds and turn them into a testable form
    pub fn resolve (&self, terrain_buffer_ft: f64)->Result<ResolvedZone,ZoneError> {
        let ring = effective_ring( &self.polygon);
        if ring.len() < 3 || ring.iter().any( |p| !p.lon.is_finite() || !p.lat.is_finite()) {
            return Err( ZoneError::DegeneratePolygon( self.id.clone()))
        }

        let lower_ft = self.resolve_limit( &self.altitude_band.lower, terrain_buffer_ft)?;
        let upper_ft = self.resolve_limit( &self.altitude_band.upper, terrain_buffer_ft)?;
        if lower_ft > upper_ft {
            return Err( ZoneError::InvalidAltitude { zone: self.id.clone(), bound: format!("{} > {}", self.altitude_band.lower.value, self.altitude_band.upper.value) })
        }

        Ok( ResolvedZone { ring: ring.to_vec(), lower_ft, upper_ft })
    }

    fn resolve_limit (&self, limit: &AltitudeLimit, terrain_buffer_ft: f64)->Result<f64,ZoneError> {
        let alt = parse_altitude( limit.value.as_str())
            .ok_or_else( || ZoneError::InvalidAltitude { zone: self.id.clone(), bound: limit.value.clone() })?;

        // flight levels are pressure altitudes, the terrain approximation does not apply to them
        let reference = alt.reference.unwrap_or( limit.reference);
        if reference == AltitudeReference::Agl && !alt.flight_level {
            Ok( alt.feet + terrain_buffer_ft)
        } else {
            Ok( alt.feet)
        }
    }
}

// a closing vertex that repeats the first one does not count
fn effective_ring (polygon: &[LonLat])->&[LonLat] {
    let n = polygon.len();
    if n > 1 && polygon[0] == polygon[n-1] { &polygon[..n-1] } else { polygon }
}

/// a zone with validated ring and numeric bounds in feet
#[derive(Debug,Clone,PartialEq)]
pub struct ResolvedZone {
    pub ring: Vec<LonLat>,
    pub lower_ft: f64,
    pub upper_ft: f64,
}

impl ResolvedZone {
    pub fn contains_altitude (&self, alt_ft: f64)->bool {
        alt_ft >= self.lower_ft && alt_ft <= self.upper_ft
    }

    pub fn contains_horizontal (&self, lon: f64, lat: f64)->bool {
        point_in_polygon( lon, lat, &self.ring)
    }

    /// the combined altitude and polygon test. The cheap altitude check goes first
    pub fn contains (&self, pos: &GeoPos)->bool {
        self.contains_altitude( pos.alt_feet()) && self.contains_horizontal( pos.lon, pos.lat)
    }
}

/// a parsed altitude bound
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct ParsedAltitude {
    pub feet: f64,
    pub flight_level: bool,
    pub reference: Option<AltitudeReference>, // explicit reference suffix, e.g. "1500FT AGL"
}

/// parse altitude bound strings:
///   `FLnnn` (nnn*100 ft), `nnnM` (meters), `nnnFT` / `nnnF` / `nnn` (feet), `GND`/`SFC` (0), `UNL` (unlimited).
/// An optional trailing `AGL`, `MSL` or `AMSL` overrides the reference of the limit
pub fn parse_altitude (s: &str)->Option<ParsedAltitude> {
    let mut s: String = s.to_uppercase().chars().filter( |c| !c.is_whitespace()).collect();

    let mut reference = None;
    for (suffix,r) in [("AMSL",AltitudeReference::Msl), ("MSL",AltitudeReference::Msl), ("AGL",AltitudeReference::Agl)] {
        if s.len() > suffix.len() && s.ends_with( suffix) {
            s.truncate( s.len() - suffix.len());
            reference = Some(r);
            break;
        }
    }

    let (feet,flight_level) = match s.as_str() {
        "GND" | "SFC" => (0.0, false),
        "UNL" | "UNLTD" | "UNLIMITED" => (f64::INFINITY, false),
        _ => {
            if let Some(fl) = s.strip_prefix("FL") {
                (parse_number( fl)? * 100.0, true)
            } else if let Some(ft) = s.strip_suffix("FT").or_else( || s.strip_suffix("F")) {
                (parse_number( ft)?, false)
            } else if let Some(m) = s.strip_suffix("M") {
                (Length::new::<meter>( parse_number( m)?).get::<foot>(), false)
            } else {
                (parse_number( s.as_str())?, false)
            }
        }
    };

    Some( ParsedAltitude { feet, flight_level, reference })
}

/// shortcut if we only need the numeric value
pub fn parse_altitude_ft (s: &str)->Option<f64> {
    parse_altitude( s).map( |a| a.feet)
}

fn parse_number (s: &str)->Option<f64> {
    s.parse::<f64>().ok().filter( |v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_altitude () {
        assert_eq!( parse_altitude_ft("FL100"), Some(10000.0));
        assert_eq!( parse_altitude_ft("fl 065"), Some(6500.0));
        assert_eq!( parse_altitude_ft("4500FT"), Some(4500.0));
        assert_eq!( parse_altitude_ft("4500 ft AMSL"), Some(4500.0));
        assert_eq!( parse_altitude_ft("2000"), Some(2000.0));
        assert_eq!( parse_altitude_ft("GND"), Some(0.0));
        assert_eq!( parse_altitude_ft("SFC"), Some(0.0));
        assert_eq!( parse_altitude_ft("UNL"), Some(f64::INFINITY));

        let m = parse_altitude_ft("3000M").unwrap();
        assert!( (m - 9842.52).abs() < 0.5);

        assert_eq!( parse_altitude_ft("FLXYZ"), None);
        assert_eq!( parse_altitude_ft(""), None);
        assert_eq!( parse_altitude_ft("-100FT"), None);

        let a = parse_altitude("1500FT AGL").unwrap();
        assert_eq!( a.reference, Some(AltitudeReference::Agl));
        assert!( parse_altitude("FL95").unwrap().flight_level);
    }
}
