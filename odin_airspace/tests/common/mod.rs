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
#![allow(unused)]

//! test fixtures shared between integration tests: scripted snapshot sources, manual clocks and
//! record/zone builders

use std::{collections::VecDeque, sync::{Arc,Mutex,atomic::{AtomicUsize,Ordering}}, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime,Local,TimeZone,Utc};
use uom::si::{f64::Length, length::meter};

use odin_airspace::{
    AircraftRecord, AirspaceZone, AltitudeBand, AltitudeLimit, BoundingBox, Clock, FetchError, LonLat,
    RestrictionFlags, Snapshot, SnapshotSource, StateVector
};

/// a snapshot source that replays a list of responses and records when it was called
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<StateVector>,FetchError>>>,
    clock: Clock,
    pub calls: Arc<AtomicUsize>,
    pub call_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
}

impl ScriptedSource {
    pub fn new (clock: Clock, script: Vec<Result<Vec<StateVector>,FetchError>>)->Self {
        ScriptedSource {
            script: Mutex::new( script.into()),
            clock,
            calls: Arc::new( AtomicUsize::new(0)),
            call_times: Arc::new( Mutex::new( Vec::new())),
        }
    }

    pub fn probe (&self)->SourceProbe {
        SourceProbe { calls: self.calls.clone(), call_times: self.call_times.clone() }
    }
}

/// what remains observable after the source got boxed into a client
#[derive(Clone)]
pub struct SourceProbe {
    pub calls: Arc<AtomicUsize>,
    pub call_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
}

impl SourceProbe {
    pub fn n_calls (&self)->usize { self.calls.load( Ordering::SeqCst) }

    pub fn intervals (&self)->Vec<Duration> {
        let times = self.call_times.lock().unwrap();
        times.windows(2).map( |w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch (&self, _bbox: &BoundingBox)->Result<Snapshot,FetchError> {
        self.calls.fetch_add( 1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push( tokio::time::Instant::now());

        let next = self.script.lock().unwrap().pop_front().unwrap_or( Ok(Vec::new()));
        let now = (self.clock)();
        next.map( |mut states| {
            for sv in states.iter_mut() {
                if sv.last_contact.is_none() { sv.last_contact = Some( now.timestamp()) }
            }
            Snapshot { time: Some(now), states }
        })
    }

    fn name (&self)->&str { "scripted" }
}

/// a clock we can set and advance explicitly
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new (start: DateTime<Utc>)->Self { ManualClock { now: Arc::new( Mutex::new(start)) } }

    pub fn now (&self)->DateTime<Utc> { *self.now.lock().unwrap() }

    pub fn advance (&self, dt: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + chrono::Duration::from_std(dt).unwrap();
    }

    pub fn clock (&self)->Clock {
        let now = self.now.clone();
        Arc::new( move || *now.lock().unwrap())
    }
}

/// local noon of a fixed day, so that tests never run into a day boundary by accident
pub fn local_noon (year: i32, month: u32, day: u32)->DateTime<Utc> {
    Local.with_ymd_and_hms( year, month, day, 12, 0, 0).earliest().unwrap().with_timezone( &Utc)
}

pub fn state_vector (icao24: &str, callsign: &str, lon: f64, lat: f64, alt_m: f64)->StateVector {
    StateVector {
        icao24: Some( icao24.to_string()),
        callsign: Some( callsign.to_string()),
        origin_country: Some( "Slovenia".to_string()),
        longitude: Some(lon),
        latitude: Some(lat),
        baro_altitude: Some(alt_m),
        geo_altitude: Some(alt_m),
        velocity: Some(120.0),
        true_track: Some(90.0),
        vertical_rate: Some(0.0),
        ..Default::default()
    }
}

pub fn record (id: &str, lon: f64, lat: f64, alt_m: f64, last_contact: DateTime<Utc>)->AircraftRecord {
    AircraftRecord {
        id: id.to_string(),
        callsign: Some( format!("TST{}", id.len())),
        origin_country: "Slovenia".to_string(),
        lon, lat,
        altitude: Some( Length::new::<meter>(alt_m)),
        on_ground: false,
        ground_speed: None,
        track: Some(90.0),
        vertical_rate: None,
        squawk: None,
        category: None,
        last_contact,
    }
}

/// a rectangular zone
pub fn zone (id: &str, name: &str, classification: &str, west: f64, south: f64, east: f64, north: f64, lower: AltitudeLimit, upper: AltitudeLimit)->AirspaceZone {
    AirspaceZone {
        id: id.to_string(),
        name: name.to_string(),
        classification: classification.to_string(),
        polygon: vec![
            LonLat::new( west, south), LonLat::new( east, south), LonLat::new( east, north), LonLat::new( west, north)
        ],
        altitude_band: AltitudeBand { lower, upper },
        restriction_flags: RestrictionFlags::default(),
    }
}
