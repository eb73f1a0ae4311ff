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

use std::{fmt, sync::Arc};
use chrono::{DateTime,Utc};
use serde::Serialize;

use crate::aircraft::{AircraftStats,TrackedEntity};
use crate::quota::QuotaSnapshot;
use crate::violations::Violation;

#[derive(Debug,Clone,PartialEq,Serialize)]
pub enum TrackerStatus {
    Idle,
    Running,
    Paused,
    Stopped,
    Error(String),
}

impl TrackerStatus {
    pub fn is_running (&self)->bool { matches!( self, TrackerStatus::Running) }
}

impl fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerStatus::Idle => write!( f, "idle"),
            TrackerStatus::Running => write!( f, "running"),
            TrackerStatus::Paused => write!( f, "paused"),
            TrackerStatus::Stopped => write!( f, "stopped"),
            TrackerStatus::Error(msg) => write!( f, "error: {msg}"),
        }
    }
}

/// aggregate statistics for UI display
#[derive(Debug,Clone,Serialize)]
pub struct TrackerStats {
    pub status: TrackerStatus,
    pub aircraft: AircraftStats,
    pub active_violations: usize,
    pub total_violations: u64,
    pub cycles: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub is_online: bool,
    pub consecutive_errors: u32,
    pub dropped_records: usize, // in the last completed cycle
    pub quota: Option<QuotaSnapshot>,
}

impl Default for TrackerStats {
    fn default()->Self {
        TrackerStats {
            status: TrackerStatus::Idle,
            aircraft: AircraftStats::default(),
            active_violations: 0,
            total_violations: 0,
            cycles: 0,
            last_update: None,
            last_error: None,
            is_online: true,
            consecutive_errors: 0,
            dropped_records: 0,
            quota: None,
        }
    }
}

/// what the tracker pushes to its subscribers. Payloads are shared so that the broadcast channel
/// does not have to deep copy the entity set for each receiver
#[derive(Debug,Clone)]
pub enum TrackerEvent {
    StatusChanged(TrackerStatus),
    EntitiesUpdated { aircraft: Arc<Vec<TrackedEntity>>, stats: Arc<TrackerStats> },
    ViolationDetected(Arc<Violation>),
    ViolationResolved(Arc<Violation>),
}

impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerEvent::StatusChanged(status) => write!( f, "status-changed: {status}"),
            TrackerEvent::EntitiesUpdated{aircraft,..} => write!( f, "entities-updated: {} aircraft", aircraft.len()),
            TrackerEvent::ViolationDetected(v) => write!( f, "violation-detected: {v}"),
            TrackerEvent::ViolationResolved(v) => write!( f, "violation-resolved: {v}"),
        }
    }
}
