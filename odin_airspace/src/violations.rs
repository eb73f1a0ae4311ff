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

use std::{collections::{HashMap,HashSet,VecDeque}, fmt, time::Duration};
use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize};
use tracing::{debug,info,warn};

use crate::aircraft::TrackedEntity;
use crate::config::AirspaceConfig;
use crate::geo::GeoPos;
use crate::zones::{AirspaceZone,ResolvedZone};

/// (entity id, zone id)
pub type ViolationKey = (String,String);

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct Violation {
    pub id: String,
    pub entity_id: String,
    pub callsign: Option<String>,
    pub zone_id: String,
    pub zone_name: String,
    pub zone_classification: String,
    pub position: GeoPos, // where the entity was when we detected the violation
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub alertable: bool,
}

impl Violation {
    pub fn key (&self)->ViolationKey { (self.entity_id.clone(), self.zone_id.clone()) }

    pub fn duration (&self, now: DateTime<Utc>)->Duration {
        let end = self.resolved_at.unwrap_or( now);
        (end - self.detected_at).to_std().unwrap_or( Duration::ZERO)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Violation( {}: {} in {} \"{}\" at {}", self.id, self.entity_id, self.zone_id, self.zone_name, self.detected_at)?;
        if let Some(t) = self.resolved_at { write!( f, ", resolved at {t}")?; }
        if self.alertable { write!( f, ", ALERT")?; }
        write!( f, ")")
    }
}

/// the result of one detection cycle
#[derive(Debug,Clone,Default)]
pub struct ViolationUpdate {
    pub detected: Vec<Violation>,
    pub resolved: Vec<Violation>,
    pub skipped_zones: usize,
}

impl ViolationUpdate {
    pub fn is_empty (&self)->bool { self.detected.is_empty() && self.resolved.is_empty() }
}

#[derive(Debug,Clone)]
pub struct DetectorParams {
    pub restricted_classes: Vec<String>,
    pub terrain_buffer_ft: f64,
    pub active_threshold: Duration,
    pub max_history: usize,
}

impl From<&AirspaceConfig> for DetectorParams {
    fn from (config: &AirspaceConfig)->Self {
        DetectorParams {
            restricted_classes: config.restricted_classes.clone(),
            terrain_buffer_ft: config.terrain_buffer_ft,
            active_threshold: config.active_threshold,
            max_history: config.max_violation_history,
        }
    }
}

impl Default for DetectorParams {
    fn default()->Self { DetectorParams::from( &AirspaceConfig::default()) }
}

// only entities with a usable position (including a known altitude) and recent contact are tested
fn is_checked (entity: &TrackedEntity, active_threshold: Duration, now: DateTime<Utc>)->bool {
    entity.position.is_valid() && entity.position.has_altitude() && entity.contact_age( now) <= active_threshold
}

/// tests tracked entities against restricted zones and keeps the entry/exit state per (entity,zone) key
pub struct ViolationDetector {
    params: DetectorParams,
    active: HashMap<ViolationKey,Violation>,
    history: VecDeque<Violation>, // oldest first, resolved entries are updated in place
    n_detected: u64,
}

impl ViolationDetector {
    pub fn new (params: DetectorParams)->Self {
        ViolationDetector { params, active: HashMap::new(), history: VecDeque::new(), n_detected: 0 }
    }

    pub fn params (&self)->&DetectorParams { &self.params }

    /// active violations, oldest detection first
    pub fn active (&self)->Vec<Violation> {
        let mut list: Vec<Violation> = self.active.values().cloned().collect();
        list.sort_by( |a,b| a.detected_at.cmp( &b.detected_at).then_with( || a.id.cmp( &b.id)));
        list
    }

    pub fn active_count (&self)->usize { self.active.len() }
    pub fn is_active (&self, entity_id: &str, zone_id: &str)->bool {
        self.active.contains_key( &(entity_id.to_string(), zone_id.to_string()))
    }

    pub fn history (&self)->Vec<Violation> { self.history.iter().cloned().collect() }
    pub fn history_len (&self)->usize { self.history.len() }

    /// total number of detections since creation (or last clear)
    pub fn total_detected (&self)->u64 { self.n_detected }

    pub fn clear (&mut self) {
        self.active.clear();
        self.history.clear();
        self.n_detected = 0;
    }

    /// run one detection cycle. Zones that can't be evaluated are skipped (and keep their active
    /// violations), they never fail the cycle
    pub fn check_violations (&mut self, entities: &[TrackedEntity], zones: &[AirspaceZone], now: DateTime<Utc>)->ViolationUpdate {
        let mut update = ViolationUpdate::default();

        let mut restricted: Vec<(&AirspaceZone,ResolvedZone)> = Vec::new();
        let mut skipped: HashSet<&str> = HashSet::new();
        for zone in zones.iter().filter( |z| z.is_restricted( &self.params.restricted_classes)) {
            match zone.resolve( self.params.terrain_buffer_ft) {
                Ok(rz) => restricted.push( (zone,rz)),
                Err(e) => {
                    warn!("skipping zone {}: {}", zone.id, e);
                    skipped.insert( zone.id.as_str());
                    update.skipped_zones += 1;
                }
            }
        }

        let mut contained: HashSet<ViolationKey> = HashSet::new();
        let active_threshold = self.params.active_threshold;
        for entity in entities.iter().filter( |e| is_checked( e, active_threshold, now)) {
            for (zone,rz) in &restricted {
                if rz.contains( &entity.position) {
                    let key = (entity.id.to_string(), zone.id.clone());
                    if !self.active.contains_key( &key) {
                        let v = self.create_violation( entity, zone, now);
                        info!("violation detected: {}", v);
                        self.push_history( v.clone());
                        self.active.insert( key.clone(), v.clone());
                        update.detected.push( v);
                    }
                    contained.insert( key);
                }
            }
        }

        let mut exited: Vec<ViolationKey> = self.active.keys()
            .filter( |k| !contained.contains( *k) && !skipped.contains( k.1.as_str()))
            .cloned()
            .collect();
        exited.sort();

        for key in exited {
            if let Some(mut v) = self.active.remove( &key) {
                v.resolved = true;
                v.resolved_at = Some(now);
                self.update_history( &v);
                info!("violation resolved: {}", v);
                update.resolved.push( v);
            }
        }

        debug!("checked {} entities against {} restricted zones: {} detected, {} resolved, {} active",
               entities.len(), restricted.len(), update.detected.len(), update.resolved.len(), self.active.len());
        update
    }

    fn create_violation (&mut self, entity: &TrackedEntity, zone: &AirspaceZone, now: DateTime<Utc>)->Violation {
        self.n_detected += 1;
        Violation {
            id: format!("{}-{}-{}", entity.id, zone.id, now.timestamp_millis()),
            entity_id: entity.id.to_string(),
            callsign: entity.callsign.clone(),
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
            zone_classification: zone.classification.clone(),
            position: entity.position,
            detected_at: now,
            resolved_at: None,
            resolved: false,
            alertable: zone.is_alertable(),
        }
    }

    fn push_history (&mut self, v: Violation) {
        self.history.push_back( v);
        while self.history.len() > self.params.max_history {
            self.history.pop_front();
        }
    }

    fn update_history (&mut self, v: &Violation) {
        if let Some(e) = self.history.iter_mut().rev().find( |e| e.id == v.id) {
            *e = v.clone();
        }
    }
}
