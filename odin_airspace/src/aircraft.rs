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

use std::{collections::{BTreeMap,HashSet,VecDeque}, fmt, sync::Arc, time::Duration};
use chrono::{DateTime,Utc};
use dashmap::DashMap;
use serde::{Serialize,Deserialize};
use tracing::debug;
use uom::si::{f64::Velocity, velocity::{knot,meter_per_second}};

use crate::classify::{classify,AircraftCategory,ClassifyInput};
use crate::config::AirspaceConfig;
use crate::geo::GeoPos;
use crate::records::AircraftRecord;

/// a timestamped position of the trail
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct TrailPoint {
    pub time: DateTime<Utc>,
    pub pos: GeoPos,
}

/// the two most recent confirmed fixes we interpolate between
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct InterpolationWindow {
    pub t0: DateTime<Utc>,
    pub fix0: GeoPos,
    pub t1: DateTime<Utc>,
    pub fix1: GeoPos,
}

impl InterpolationWindow {
    /// linear blend between fix0 and fix1. Returns `None` before t0 or more than `tolerance` after t1.
    /// Between t1 and t1+tolerance we hold fix1 (the fraction is clamped)
    pub fn position_at (&self, time: DateTime<Utc>, tolerance: Duration)->Option<GeoPos> {
        if time < self.t0 { return None }
        let tol = chrono::Duration::from_std( tolerance).ok()?;
        if time > self.t1 + tol { return None }

        let span = (self.t1 - self.t0).num_milliseconds();
        if span <= 0 { return Some(self.fix1) }

        let f = ((time - self.t0).num_milliseconds() as f64 / span as f64).clamp( 0.0, 1.0);
        Some( self.fix0.interpolate( &self.fix1, f))
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Default,Serialize,Deserialize)]
pub struct VelocityInfo {
    pub ground_speed: Option<Velocity>,
    pub track: Option<f64>, // degrees, never interpolated
    pub vertical_rate: Option<Velocity>,
}

/// the data model for a tracked aircraft
#[derive(Debug,Clone,Serialize)]
pub struct TrackedEntity {
    pub id: Arc<String>, // shared so that we can clone without heap allocation
    pub callsign: Option<String>,
    pub origin_country: String,

    pub position: GeoPos,
    pub velocity: VelocityInfo,
    pub on_ground: bool,
    pub squawk: Option<String>,
    pub emitter_category: Option<u8>,

    pub last_contact: DateTime<Utc>,
    pub trail: VecDeque<TrailPoint>, // bounded, oldest first
    pub interpolation: Option<InterpolationWindow>,

    pub first_seen: DateTime<Utc>,
    pub update_count: u64,
    pub category: AircraftCategory,
}

impl fmt::Display for TrackedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "TrackedEntity( id: {}", self.id)?;
        if let Some(cs) = &self.callsign { write!( f, ", cs: \"{cs}\"")?; }
        write!( f, ", pos: {}, n_trail: {}", self.position, self.trail.len())?;
        if let Some(gs) = self.velocity.ground_speed { write!( f, ", spd: {:.0}kn", gs.get::<knot>())?; }
        if let Some(trk) = self.velocity.track { write!( f, ", trk: {:.0}", trk)?; }
        write!( f, ", cat: {}, contact: {})", self.category, self.last_contact)
    }
}

/// the lifecycle parameters of tracked entities
#[derive(Debug,Clone)]
pub struct TrackingParams {
    pub max_trail: usize,
    pub min_trail_displacement_m: f64,
    pub interpolation_tolerance: Duration,
    pub cleanup_interval: Duration,
    pub max_tracked_entities: usize,
}

impl From<&AirspaceConfig> for TrackingParams {
    fn from (config: &AirspaceConfig)->Self {
        TrackingParams {
            max_trail: config.max_trail,
            min_trail_displacement_m: config.min_trail_displacement_m,
            interpolation_tolerance: config.interpolation_tolerance,
            cleanup_interval: config.cleanup_interval,
            max_tracked_entities: config.max_tracked_entities,
        }
    }
}

impl Default for TrackingParams {
    fn default()->Self { TrackingParams::from( &AirspaceConfig::default()) }
}

impl TrackedEntity {
    pub fn new (rec: &AircraftRecord, now: DateTime<Utc>, params: &TrackingParams)->Self {
        let position = rec.position_or( f64::NAN); // altitude unknown until a record reports one
        let mut ac = TrackedEntity {
            id: Arc::new( rec.id.clone()),
            callsign: rec.callsign.clone(),
            origin_country: rec.origin_country.clone(),
            position,
            velocity: VelocityInfo { ground_speed: rec.ground_speed, track: rec.track, vertical_rate: rec.vertical_rate },
            on_ground: rec.on_ground,
            squawk: rec.squawk.clone(),
            emitter_category: rec.category,
            last_contact: rec.last_contact,
            trail: VecDeque::with_capacity( params.max_trail),
            interpolation: None,
            first_seen: now,
            update_count: 1,
            category: AircraftCategory::Unknown,
        };
        ac.push_trail_point( rec.last_contact, position, params);
        ac.category = ac.classify();
        ac
    }

    /// merge a new fix of the same aircraft. Records that are older than our last contact only
    /// contribute identity data, they never move the aircraft back to an outdated position
    pub fn update (&mut self, rec: &AircraftRecord, params: &TrackingParams) {
        if rec.callsign.is_some() { self.callsign = rec.callsign.clone(); }
        if !rec.origin_country.is_empty() { self.origin_country = rec.origin_country.clone(); }
        if rec.category.is_some() { self.emitter_category = rec.category; }
        self.update_count += 1;

        if rec.last_contact >= self.last_contact {
            // keep the last altitude if the new record does not report one (stays NaN if we never had any)
            let position = rec.position_or( self.position.alt_meters());

            self.position = position;
            self.velocity = VelocityInfo { ground_speed: rec.ground_speed, track: rec.track, vertical_rate: rec.vertical_rate };
            self.on_ground = rec.on_ground;
            self.squawk = rec.squawk.clone();
            self.last_contact = rec.last_contact;

            self.push_trail_point( rec.last_contact, position, params);
        } else {
            debug!("ignoring out-of-order fix of {} ({} < {})", self.id, rec.last_contact, self.last_contact);
        }

        self.category = self.classify();
    }

    /// append if the fix is not older than the last trail point and moved more than the jitter threshold.
    /// Returns true if the fix was added
    pub fn push_trail_point (&mut self, time: DateTime<Utc>, pos: GeoPos, params: &TrackingParams)->bool {
        if let Some(last) = self.trail.back() {
            if time < last.time { return false }
            if last.pos.distance_to( &pos) <= params.min_trail_displacement_m { return false }
        }

        self.trail.push_back( TrailPoint{ time, pos });
        while self.trail.len() > params.max_trail {
            self.trail.pop_front();
        }

        let n = self.trail.len();
        if n >= 2 {
            let p0 = &self.trail[n-2];
            let p1 = &self.trail[n-1];
            self.interpolation = Some( InterpolationWindow{ t0: p0.time, fix0: p0.pos, t1: p1.time, fix1: p1.pos });
        }
        true
    }

    /// smoothed position at a given time, `None` if we have less than two trail points or `time`
    /// is outside of the interpolation window
    pub fn interpolated_position_at (&self, time: DateTime<Utc>, tolerance: Duration)->Option<GeoPos> {
        if self.trail.len() < 2 { return None }
        self.interpolation.as_ref().and_then( |w| w.position_at( time, tolerance))
    }

    pub fn contact_age (&self, now: DateTime<Utc>)->Duration {
        (now - self.last_contact).to_std().unwrap_or( Duration::ZERO)
    }

    pub fn matches_text (&self, text: &str)->bool {
        let text = text.to_lowercase();
        self.id.to_lowercase().contains( &text)
            || self.callsign.as_ref().map( |cs| cs.to_lowercase().contains( &text)).unwrap_or(false)
    }

    fn classify (&self)->AircraftCategory {
        let input = ClassifyInput {
            callsign: self.callsign.as_deref(),
            squawk: self.squawk.as_deref(),
            category: self.emitter_category,
            on_ground: self.on_ground,
            ground_speed_ms: self.velocity.ground_speed.map( |v| v.get::<meter_per_second>()),
        };
        classify( &input)
    }
}

/// aggregate numbers over the tracked set
#[derive(Debug,Clone,Default,PartialEq,Serialize,Deserialize)]
pub struct AircraftStats {
    pub total: usize,
    pub airborne: usize,
    pub on_ground: usize,
    pub by_category: BTreeMap<AircraftCategory,usize>,
}

/// the persistent keyed set of tracked aircraft.
/// The map is shared (via `Arc`) with query handles, which see point-in-time states of single entries.
/// Only [`AircraftStore::reconcile`] mutates it
pub struct AircraftStore {
    params: TrackingParams,
    aircraft: Arc<DashMap<String,TrackedEntity>>,
    dropped_list: Vec<Arc<String>>, // aircraft removed in the last reconciliation
}

impl AircraftStore {
    pub fn new (params: TrackingParams)->Self {
        AircraftStore { params, aircraft: Arc::new( DashMap::new()), dropped_list: Vec::new() }
    }

    pub fn params (&self)->&TrackingParams { &self.params }
    pub fn shared_aircraft (&self)->Arc<DashMap<String,TrackedEntity>> { self.aircraft.clone() }
    pub fn aircraft (&self)->&DashMap<String,TrackedEntity> { self.aircraft.as_ref() }
    pub fn dropped_list (&self)->&[Arc<String>] { self.dropped_list.as_slice() }

    pub fn len (&self)->usize { self.aircraft.len() }
    pub fn is_empty (&self)->bool { self.aircraft.is_empty() }

    pub fn get (&self, id: &str)->Option<TrackedEntity> {
        self.aircraft.get( id).map( |e| e.value().clone())
    }

    /// merge a validated snapshot into the tracked set and return the full reconciled set
    /// (including aircraft that are missing from this snapshot but still within their grace period)
    pub fn reconcile (&mut self, records: &[AircraftRecord], now: DateTime<Utc>)->Vec<TrackedEntity> {
        let mut present: HashSet<&str> = HashSet::with_capacity( records.len());
        let mut n_new = 0;

        for rec in records {
            present.insert( rec.id.as_str());

            if let Some(mut e) = self.aircraft.get_mut( rec.id.as_str()) {
                e.value_mut().update( rec, &self.params);
            } else {
                self.aircraft.insert( rec.id.clone(), TrackedEntity::new( rec, now, &self.params));
                n_new += 1;
            }
        }

        self.dropped_list.clear();
        self.remove_stale( &present, now);
        self.enforce_capacity();

        debug!("reconciled {} records: {} new, {} dropped, {} tracked", records.len(), n_new, self.dropped_list.len(), self.aircraft.len());
        self.snapshot()
    }

    /// all tracked aircraft, most recently contacted first
    pub fn snapshot (&self)->Vec<TrackedEntity> {
        let mut list: Vec<TrackedEntity> = self.aircraft.iter().map( |e| e.value().clone()).collect();
        sort_by_contact( &mut list);
        list
    }

    pub fn search (&self, text: &str)->Vec<TrackedEntity> {
        search_aircraft( &self.aircraft, text)
    }

    pub fn stats (&self)->AircraftStats {
        aircraft_stats( &self.aircraft)
    }

    pub fn clear (&mut self) {
        self.aircraft.clear();
        self.dropped_list.clear();
    }

    // entities absent from the current snapshot are only removed after the grace period
    fn remove_stale (&mut self, present: &HashSet<&str>, now: DateTime<Utc>) {
        let stale: Vec<String> = self.aircraft.iter()
            .filter( |e| !present.contains( e.key().as_str()) && e.value().contact_age( now) > self.params.cleanup_interval)
            .map( |e| e.key().clone())
            .collect();

        for id in stale {
            if let Some((_,ac)) = self.aircraft.remove( id.as_str()) {
                self.dropped_list.push( ac.id);
            }
        }
    }

    // keep the N most recently contacted aircraft
    fn enforce_capacity (&mut self) {
        let max = self.params.max_tracked_entities;
        if self.aircraft.len() <= max { return }

        let mut by_contact: Vec<(DateTime<Utc>,String)> = self.aircraft.iter()
            .map( |e| (e.value().last_contact, e.key().clone()))
            .collect();
        by_contact.sort_by( |a,b| b.0.cmp( &a.0).then_with( || a.1.cmp( &b.1)));

        for (_,id) in by_contact.into_iter().skip( max) {
            if let Some((_,ac)) = self.aircraft.remove( id.as_str()) {
                self.dropped_list.push( ac.id);
            }
        }
    }
}

pub fn sort_by_contact (list: &mut [TrackedEntity]) {
    list.sort_by( |a,b| b.last_contact.cmp( &a.last_contact).then_with( || a.id.cmp( &b.id)));
}

/// case insensitive substring match over callsign and identifier
pub fn search_aircraft (aircraft: &DashMap<String,TrackedEntity>, text: &str)->Vec<TrackedEntity> {
    let text = text.trim();
    if text.is_empty() { return Vec::new() }

    let mut list: Vec<TrackedEntity> = aircraft.iter()
        .filter( |e| e.value().matches_text( text))
        .map( |e| e.value().clone())
        .collect();
    sort_by_contact( &mut list);
    list
}

pub fn aircraft_stats (aircraft: &DashMap<String,TrackedEntity>)->AircraftStats {
    let mut stats = AircraftStats::default();
    for e in aircraft.iter() {
        let ac = e.value();
        stats.total += 1;
        if ac.on_ground { stats.on_ground += 1 } else { stats.airborne += 1 }
        *stats.by_category.entry( ac.category).or_insert(0) += 1;
    }
    stats
}
