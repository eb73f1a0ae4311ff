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

use std::time::Duration;
use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize};
use serde_json::Value;
use tracing::debug;
use uom::si::{f64::{Length,Velocity}, length::meter, velocity::meter_per_second};

use crate::geo::{GeoPos,is_valid_lon_lat};
use crate::errors::RecordError;

/// raw (unvalidated) state vector as delivered by the remote source. Everything is optional since
/// the source reports `null` for unknown values
#[derive(Debug,Clone,Default,PartialEq)]
pub struct StateVector {
    pub icao24: Option<String>,
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    pub time_position: Option<i64>,
    pub last_contact: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude: Option<f64>, // meters
    pub on_ground: bool,
    pub velocity: Option<f64>, // m/s
    pub true_track: Option<f64>, // degrees clockwise from north
    pub vertical_rate: Option<f64>, // m/s
    pub geo_altitude: Option<f64>, // meters
    pub squawk: Option<String>,
    pub spi: bool,
    pub position_source: Option<u8>,
    pub category: Option<u8>,
}

// positional field indices of the remote state vector arrays
const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const ORIGIN_COUNTRY: usize = 2;
const TIME_POSITION: usize = 3;
const LAST_CONTACT: usize = 4;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;
const VERTICAL_RATE: usize = 11;
const GEO_ALTITUDE: usize = 13;
const SQUAWK: usize = 14;
const SPI: usize = 15;
const POSITION_SOURCE: usize = 16;
const CATEGORY: usize = 17;

impl StateVector {
    /// decode from the positional JSON array format. Only a too short array is an error, type
    /// mismatches of single fields turn into `None`
    pub fn from_json_array (a: &[Value])->Result<Self,RecordError> {
        if a.len() <= SQUAWK {
            return Err( RecordError::Malformed( format!("state vector has only {} fields", a.len())))
        }

        Ok( StateVector {
            icao24: opt_string( a, ICAO24),
            callsign: opt_string( a, CALLSIGN),
            origin_country: opt_string( a, ORIGIN_COUNTRY),
            time_position: a[TIME_POSITION].as_i64(),
            last_contact: a[LAST_CONTACT].as_i64(),
            longitude: a[LONGITUDE].as_f64(),
            latitude: a[LATITUDE].as_f64(),
            baro_altitude: a[BARO_ALTITUDE].as_f64(),
            on_ground: a[ON_GROUND].as_bool().unwrap_or(false),
            velocity: a[VELOCITY].as_f64(),
            true_track: a[TRUE_TRACK].as_f64(),
            vertical_rate: a[VERTICAL_RATE].as_f64(),
            geo_altitude: a[GEO_ALTITUDE].as_f64(),
            squawk: opt_string( a, SQUAWK),
            spi: a.get(SPI).and_then( |v| v.as_bool()).unwrap_or(false),
            position_source: a.get(POSITION_SOURCE).and_then( |v| v.as_u64()).map( |v| v as u8),
            category: a.get(CATEGORY).and_then( |v| v.as_u64()).map( |v| v as u8),
        })
    }
}

fn opt_string (a: &[Value], idx: usize)->Option<String> {
    a[idx].as_str().map( |s| s.trim()).filter( |s| !s.is_empty()).map( |s| s.to_string())
}

/// the response of one snapshot request
#[derive(Debug,Clone,Default,PartialEq)]
pub struct Snapshot {
    pub time: Option<DateTime<Utc>>, // source time of the snapshot (if reported)
    pub states: Vec<StateVector>,
}

/// the JSON envelope of the remote source
#[derive(Deserialize,Debug)]
pub(crate) struct SnapshotResponse {
    pub time: Option<i64>,
    pub states: Option<Vec<Vec<Value>>>,
}

impl SnapshotResponse {
    /// convert into a [`Snapshot`], skipping (and counting) state vectors that can't be decoded
    pub(crate) fn into_snapshot (self)->(Snapshot,usize) {
        let mut n_malformed = 0;
        let mut states = Vec::new();

        for a in self.states.unwrap_or_default() {
            match StateVector::from_json_array( a.as_slice()) {
                Ok(sv) => states.push(sv),
                Err(e) => {
                    debug!("skipping state vector: {e}");
                    n_malformed += 1;
                }
            }
        }

        let time = self.time.and_then( |t| DateTime::from_timestamp( t, 0));
        (Snapshot{ time, states }, n_malformed)
    }
}

/// a validated record that is ready for reconciliation
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AircraftRecord {
    pub id: String,
    pub callsign: Option<String>,
    pub origin_country: String,
    pub lon: f64,
    pub lat: f64,
    pub altitude: Option<Length>, // geometric if available, barometric otherwise
    pub on_ground: bool,
    pub ground_speed: Option<Velocity>,
    pub track: Option<f64>,
    pub vertical_rate: Option<Velocity>,
    pub squawk: Option<String>,
    pub category: Option<u8>,
    pub last_contact: DateTime<Utc>,
}

impl AircraftRecord {
    /// position with the given fallback altitude (in meters) if we don't have a reported one
    pub fn position_or (&self, fallback_alt_m: f64)->GeoPos {
        let alt_m = self.altitude.map( |a| a.get::<meter>()).unwrap_or( fallback_alt_m);
        GeoPos::from_lon_lat_degrees_alt_meters( self.lon, self.lat, alt_m)
    }
}

/// result of validating a snapshot
#[derive(Debug,Clone,Default)]
pub struct ValidatedRecords {
    pub records: Vec<AircraftRecord>,
    pub dropped: usize,
}

pub fn validate_record (sv: &StateVector, fetch_time: DateTime<Utc>, max_age: Duration)->Result<AircraftRecord,RecordError> {
    let id = match &sv.icao24 {
        Some(id) if !id.trim().is_empty() => id.trim().to_lowercase(),
        _ => return Err( RecordError::MissingId)
    };

    let last_contact = sv.last_contact
        .and_then( |t| DateTime::from_timestamp( t, 0))
        .ok_or_else( || RecordError::Malformed( format!("record {id} has no last contact time")))?;

    let age_secs = (fetch_time - last_contact).num_seconds();
    if age_secs > max_age.as_secs() as i64 {
        return Err( RecordError::Stale{ id, age_secs })
    }

    let (lon,lat) = match (sv.longitude, sv.latitude) {
        (Some(lon),Some(lat)) if is_valid_lon_lat( lon, lat) => (lon,lat),
        _ => return Err( RecordError::InvalidPosition(id))
    };

    let altitude = sv.geo_altitude.filter( |a| a.is_finite())
        .or( sv.baro_altitude.filter( |a| a.is_finite()))
        .or( if sv.on_ground { Some(0.0) } else { None })
        .map( |a| Length::new::<meter>(a));

    Ok( AircraftRecord {
        id,
        callsign: sv.callsign.clone(),
        origin_country: sv.origin_country.clone().unwrap_or_default(),
        lon, lat,
        altitude,
        on_ground: sv.on_ground,
        ground_speed: sv.velocity.filter( |v| v.is_finite()).map( |v| Velocity::new::<meter_per_second>(v)),
        track: sv.true_track.filter( |v| v.is_finite()),
        vertical_rate: sv.vertical_rate.filter( |v| v.is_finite()).map( |v| Velocity::new::<meter_per_second>(v)),
        squawk: sv.squawk.clone(),
        category: sv.category,
        last_contact,
    })
}

/// post-fetch validation: drops records without id, with stale contact or without a valid position
pub fn validate_records (states: &[StateVector], fetch_time: DateTime<Utc>, max_age: Duration)->ValidatedRecords {
    let mut result = ValidatedRecords { records: Vec::with_capacity( states.len()), dropped: 0 };

    for sv in states {
        match validate_record( sv, fetch_time, max_age) {
            Ok(rec) => result.records.push( rec),
            Err(e) => {
                debug!("dropping record: {e}");
                result.dropped += 1;
            }
        }
    }

    result
}
