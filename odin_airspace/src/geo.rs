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

//! geometric primitives for the airspace core. Positions are kept as plain lon/lat degrees (WGS84)
//! plus a uom altitude so that we can blend them linearly and feed them into ray-casting without
//! conversion overhead. Great circle distances are computed with the `geo` crate.

use std::fmt;
use serde::{Serialize,Deserialize};
use geo::{Distance,Haversine,Point};
use uom::si::{f64::Length, length::{meter,foot}};

/// a 3D fix: geodetic lon/lat in degrees and altitude (MSL)
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct GeoPos {
    pub lon: f64,
    pub lat: f64,
    pub alt: Length,
}

impl GeoPos {
    pub fn from_lon_lat_degrees_alt_meters (lon: f64, lat: f64, alt_m: f64)->Self {
        GeoPos { lon, lat, alt: Length::new::<meter>(alt_m) }
    }

    pub fn alt_meters (&self)->f64 { self.alt.get::<meter>() }
    pub fn alt_feet (&self)->f64 { self.alt.get::<foot>() }

    pub fn is_valid (&self)->bool {
        is_valid_lon_lat( self.lon, self.lat)
    }

    /// false if the altitude is unknown (NaN)
    pub fn has_altitude (&self)->bool { self.alt.value.is_finite() }

    /// great circle (haversine) ground distance to other position in meters, ignoring altitude
    pub fn distance_to (&self, other: &GeoPos)->f64 {
        Haversine.distance( Point::new( self.lon, self.lat), Point::new( other.lon, other.lat))
    }

    /// linear blend of lon/lat/alt. `f` is expected to be in [0,1], f=0 and f=1 reproduce the end points exactly
    pub fn interpolate (&self, other: &GeoPos, f: f64)->GeoPos {
        let g = 1.0 - f;
        GeoPos {
            lon: self.lon * g + other.lon * f,
            lat: self.lat * g + other.lat * f,
            alt: Length::new::<meter>( self.alt_meters() * g + other.alt_meters() * f),
        }
    }
}

impl fmt::Display for GeoPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "[{:.5},{:.5},{:.0}m]", self.lon, self.lat, self.alt_meters())
    }
}

#[inline]
pub fn is_valid_lon_lat (lon: f64, lat: f64)->bool {
    lon.is_finite() && lat.is_finite() && lon >= -180.0 && lon <= 180.0 && lat >= -90.0 && lat <= 90.0
}

/// a simple lon/lat vertex of a zone boundary ring
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new (lon: f64, lat: f64)->Self { LonLat{lon,lat} }
}

/// geographic query region of the remote source
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new (west: f64, south: f64, east: f64, north: f64)->Self {
        BoundingBox { west, south, east, north }
    }

    pub fn is_valid (&self)->bool {
        is_valid_lon_lat( self.west, self.south) && is_valid_lon_lat( self.east, self.north)
            && self.west < self.east && self.south < self.north
    }

    pub fn contains (&self, lon: f64, lat: f64)->bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "W={} S={} E={} N={}", self.west, self.south, self.east, self.north)
    }
}

/// ray-casting point-in-polygon test over a vertex ring (closing vertex optional).
/// The ray goes in +lon direction. Edges are treated half-open in lat, which makes the result
/// deterministic for points on vertices or edges (boundary points on the left/bottom are inside,
/// on the right/top are outside). O(n), no state is kept between calls
pub fn point_in_polygon (lon: f64, lat: f64, ring: &[LonLat])->bool {
    let n = ring.len();
    if n < 3 { return false }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &ring[i];
        let pj = &ring[j];

        if (pi.lat > lat) != (pj.lat > lat) {
            let x_cross = (pj.lon - pi.lon) * (lat - pi.lat) / (pj.lat - pi.lat) + pi.lon;
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
