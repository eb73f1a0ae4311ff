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

//! airspace incursion monitoring.
//!
//! The crate periodically retrieves aircraft state vectors for a configured region from a quota-limited
//! remote source ([`client::PollingClient`]), reconciles them into a set of tracked aircraft with bounded
//! trails and interpolation ([`aircraft::AircraftStore`]) and tests the tracked aircraft against restricted
//! airspace zones ([`violations::ViolationDetector`]). One tracker task ([`tracker::spawn_tracker`]) drives
//! these fetch -> reconcile -> detect cycles and publishes [`events::TrackerEvent`]s.

pub mod errors;
pub mod config;
pub mod geo;
pub mod quota;
pub mod records;
pub mod client;
pub mod classify;
pub mod aircraft;
pub mod zones;
pub mod violations;
pub mod events;
pub mod tracker;

pub use errors::{OdinAirspaceError,Result,FetchError,QuotaLimit,RecordError,ZoneError};
pub use config::{AirspaceConfig,Region,load_config};
pub use geo::{GeoPos,LonLat,BoundingBox};
pub use quota::{QuotaState,QuotaSnapshot,QuotaStore,QuotaTracker,FileQuotaStore,MemoryQuotaStore};
pub use records::{StateVector,Snapshot,AircraftRecord};
pub use client::{SnapshotSource,OpenSkySource,PollingClient,Clock,system_clock,tokio_clock};
pub use classify::AircraftCategory;
pub use aircraft::{AircraftStore,TrackedEntity,TrailPoint,TrackingParams};
pub use zones::{AirspaceZone,AltitudeBand,AltitudeLimit,AltitudeReference,RestrictionFlags};
pub use violations::{Violation,ViolationDetector,ViolationUpdate,DetectorParams};
pub use events::{TrackerEvent,TrackerStatus,TrackerStats};
pub use tracker::{TrackerHandle,spawn_tracker};
