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

//! the tracker task that drives fetch -> reconcile -> detect cycles.
//!
//! All mutable core state (polling client with its quota, aircraft store, violation detector) is owned by
//! a single task that processes [`TrackerCmd`] messages and its own cycle timer in one `select!` loop.
//! Cycles therefore never overlap and commands are processed between cycles. Users talk to the task
//! through a cloneable [`TrackerHandle`], which also provides point-in-time query access to the last
//! published state and a broadcast subscription for [`TrackerEvent`]s.

use std::sync::{Arc,Mutex,RwLock,RwLockReadGuard};
use chrono::{DateTime,Utc};
use dashmap::DashMap;
use tokio::{sync::{broadcast,mpsc,oneshot}, task::JoinHandle, time::{Instant,sleep_until}};
use tracing::{debug,error,info,warn};

use crate::aircraft::{AircraftStore,TrackedEntity,TrackingParams,aircraft_stats,search_aircraft,sort_by_contact};
use crate::client::PollingClient;
use crate::config::AirspaceConfig;
use crate::errors::{FetchError,OdinAirspaceError,Result};
use crate::events::{TrackerEvent,TrackerStats,TrackerStatus};
use crate::geo::BoundingBox;
use crate::quota::QuotaSnapshot;
use crate::violations::{DetectorParams,Violation,ViolationDetector};
use crate::zones::AirspaceZone;

const CMD_QUEUE_LEN: usize = 32;
const EVENT_QUEUE_LEN: usize = 256;

/// the messages the tracker task understands
#[derive(Debug)]
pub enum TrackerCmd {
    Start,
    Pause,
    Resume,
    Stop,
    /// a single gated fetch outside of the schedule, replies with the number of received state vectors
    TestConnection(oneshot::Sender<std::result::Result<usize,FetchError>>),
    SetZones(Vec<AirspaceZone>),
    Terminate,
}

/// the state we publish for synchronous queries. Gets replaced after each cycle and command
#[derive(Debug,Clone,Default)]
struct PublishedState {
    stats: TrackerStats,
    active_violations: Vec<Violation>,
    violation_history: Vec<Violation>,
}

struct SharedState {
    aircraft: Arc<DashMap<String,TrackedEntity>>,
    published: RwLock<PublishedState>,
}

impl SharedState {
    fn read (&self)->RwLockReadGuard<'_,PublishedState> {
        // a panicking writer does not leave the published state half updated, it is replaced as a whole
        self.published.read().unwrap_or_else( |poisoned| poisoned.into_inner())
    }

    fn replace (&self, new_state: PublishedState) {
        match self.published.write() {
            Ok(mut guard) => *guard = new_state,
            Err(poisoned) => *poisoned.into_inner() = new_state,
        }
    }
}

/// the user side of a tracker task
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerCmd>,
    events: broadcast::Sender<TrackerEvent>,
    shared: Arc<SharedState>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TrackerHandle {
    async fn send (&self, cmd: TrackerCmd)->Result<()> {
        self.tx.send( cmd).await.map_err( |_| OdinAirspaceError::TrackerTerminated)
    }

    pub async fn start (&self)->Result<()> { self.send( TrackerCmd::Start).await }
    pub async fn pause (&self)->Result<()> { self.send( TrackerCmd::Pause).await }
    pub async fn resume (&self)->Result<()> { self.send( TrackerCmd::Resume).await }
    pub async fn stop (&self)->Result<()> { self.send( TrackerCmd::Stop).await }

    /// replace the zone set. Takes effect with the next cycle
    pub async fn set_zones (&self, zones: Vec<AirspaceZone>)->Result<()> { self.send( TrackerCmd::SetZones(zones)).await }

    /// one out-of-schedule fetch, subject to the same quota and spacing gate as scheduled cycles
    pub async fn test_connection (&self)->Result<usize> {
        let (tx,rx) = oneshot::channel();
        self.send( TrackerCmd::TestConnection(tx)).await?;
        let n = rx.await.map_err( |_| OdinAirspaceError::TrackerTerminated)??;
        Ok(n)
    }

    /// stop the tracker task and wait for it to finish
    pub async fn terminate (&self)->Result<()> {
        let _ = self.send( TrackerCmd::Terminate).await; // task might already be gone
        let task = self.task.lock().ok().and_then( |mut guard| guard.take());
        if let Some(jh) = task {
            jh.await.map_err( |e| OdinAirspaceError::OpFailedError( format!("tracker task failed: {e}")))?;
        }
        Ok(())
    }

    pub fn subscribe (&self)->broadcast::Receiver<TrackerEvent> { self.events.subscribe() }

    //--- synchronous queries (point-in-time, might be superseded by the next cycle)

    pub fn aircraft (&self, id: &str)->Option<TrackedEntity> {
        self.shared.aircraft.get( id.to_lowercase().as_str()).map( |e| e.value().clone())
    }

    pub fn all_aircraft (&self)->Vec<TrackedEntity> {
        let mut list: Vec<TrackedEntity> = self.shared.aircraft.iter().map( |e| e.value().clone()).collect();
        sort_by_contact( &mut list);
        list
    }

    pub fn search (&self, text: &str)->Vec<TrackedEntity> { search_aircraft( &self.shared.aircraft, text) }

    pub fn active_violations (&self)->Vec<Violation> { self.shared.read().active_violations.clone() }
    pub fn violation_history (&self)->Vec<Violation> { self.shared.read().violation_history.clone() }
    pub fn quota (&self)->Option<QuotaSnapshot> { self.shared.read().stats.quota.clone() }
    pub fn statistics (&self)->TrackerStats { self.shared.read().stats.clone() }
    pub fn status (&self)->TrackerStatus { self.shared.read().stats.status.clone() }
}

/// create the tracker task. The tracker starts in `Idle` state, cycles are only scheduled after `start()`
pub fn spawn_tracker (config: Arc<AirspaceConfig>, client: PollingClient, zones: Vec<AirspaceZone>)->Result<TrackerHandle> {
    config.validate()?;
    let bbox = config.region.bounding_box()?;

    let (tx,rx) = mpsc::channel( CMD_QUEUE_LEN);
    let (events,_) = broadcast::channel( EVENT_QUEUE_LEN);

    let store = AircraftStore::new( TrackingParams::from( config.as_ref()));
    let shared = Arc::new( SharedState { aircraft: store.shared_aircraft(), published: RwLock::new( PublishedState::default()) });

    let mut actor = TrackerActor {
        config: config.clone(),
        bbox,
        client,
        store,
        detector: ViolationDetector::new( DetectorParams::from( config.as_ref())),
        zones,
        status: TrackerStatus::Idle,
        next_cycle: None,
        cycles: 0,
        dropped_records: 0,
        last_update: None,
        events: events.clone(),
        shared: shared.clone(),
    };
    actor.publish_state();

    let jh = tokio::spawn( actor.run( rx));
    Ok( TrackerHandle { tx, events, shared, task: Arc::new( Mutex::new( Some(jh))) })
}

struct TrackerActor {
    config: Arc<AirspaceConfig>,
    bbox: BoundingBox,
    client: PollingClient,
    store: AircraftStore,
    detector: ViolationDetector,
    zones: Vec<AirspaceZone>,

    status: TrackerStatus,
    next_cycle: Option<Instant>,
    cycles: u64,
    dropped_records: usize,
    last_update: Option<DateTime<Utc>>,

    events: broadcast::Sender<TrackerEvent>,
    shared: Arc<SharedState>,
}

impl TrackerActor {
    async fn run (mut self, mut rx: mpsc::Receiver<TrackerCmd>) {
        info!("tracker for region {} started", self.bbox);

        loop {
            let next_cycle = self.next_cycle;
            let cycle_due = async move {
                match next_cycle {
                    Some(t) => sleep_until(t).await,
                    None => std::future::pending::<()>().await
                }
            };

            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(TrackerCmd::Terminate) | None => break,
                        Some(cmd) => self.handle_cmd( cmd).await
                    }
                }
                _ = cycle_due => {
                    self.next_cycle = None;
                    self.run_cycle().await;
                    if self.status.is_running() { self.schedule_next_cycle(); }
                    self.publish_state();
                }
            }
        }

        info!("tracker terminated after {} cycles", self.cycles);
    }

    async fn handle_cmd (&mut self, cmd: TrackerCmd) {
        match cmd {
            TrackerCmd::Start => {
                if !self.status.is_running() {
                    self.set_status( TrackerStatus::Running);
                    self.schedule_first_cycle();
                }
            }
            TrackerCmd::Pause => {
                if self.status.is_running() {
                    self.next_cycle = None;
                    self.set_status( TrackerStatus::Paused);
                }
            }
            TrackerCmd::Resume => {
                if self.status == TrackerStatus::Paused {
                    self.set_status( TrackerStatus::Running);
                    self.schedule_first_cycle();
                }
            }
            TrackerCmd::Stop => {
                self.next_cycle = None;
                self.store.clear();
                self.detector.clear();
                self.dropped_records = 0;
                self.set_status( TrackerStatus::Stopped);
            }
            TrackerCmd::TestConnection(reply) => {
                let res = self.client.fetch_snapshot( &self.bbox).await.map( |snapshot| snapshot.states.len());
                match &res {
                    Ok(n) => info!("connection test succeeded: {} state vectors", n),
                    Err(e) => warn!("connection test failed: {}", e),
                }
                let _ = reply.send( res); // requester might have given up
            }
            TrackerCmd::SetZones(zones) => {
                info!("updating zones: {} zones", zones.len());
                self.zones = zones;
            }
            TrackerCmd::Terminate => {} // handled by the run loop
        }
        self.publish_state();
    }

    // the next cycle can start as soon as the quota gate allows
    fn schedule_first_cycle (&mut self) {
        let delay = self.client.time_until_next_request();
        self.next_cycle = Some( Instant::now() + delay);
        debug!("first cycle in {:?}", delay);
    }

    fn schedule_next_cycle (&mut self) {
        let delay = self.config.base_update_interval.max( self.client.time_until_next_request());
        self.next_cycle = Some( Instant::now() + delay);
        debug!("next cycle in {:?}", delay);
    }

    /// fetch -> reconcile -> detect. Only the fetch suspends
    async fn run_cycle (&mut self) {
        match self.client.fetch_validated( &self.bbox).await {
            Ok(validated) => {
                let now = self.client.now();
                self.dropped_records = validated.dropped;

                let entities = self.store.reconcile( &validated.records, now);
                let update = self.detector.check_violations( &entities, &self.zones, now);

                self.cycles += 1;
                self.last_update = Some(now);
                info!("cycle {}: {} records ({} dropped), {} tracked, {} new violations, {} resolved",
                      self.cycles, validated.records.len(), validated.dropped, entities.len(), update.detected.len(), update.resolved.len());

                self.publish_state(); // queries should see the new state once subscribers get the events
                for v in update.detected {
                    self.emit( TrackerEvent::ViolationDetected( Arc::new(v)));
                }
                for v in update.resolved {
                    self.emit( TrackerEvent::ViolationResolved( Arc::new(v)));
                }
                let stats = Arc::new( self.stats());
                self.emit( TrackerEvent::EntitiesUpdated { aircraft: Arc::new(entities), stats });
            }
            Err(e) => {
                match &e {
                    FetchError::QuotaExceeded{..} => info!("cycle skipped: {}", e),
                    FetchError::Transient(_) => warn!("cycle failed: {}", e),
                    FetchError::AuthDenied{..} => error!("cycle failed: {}", e),
                }
                if e.is_terminal() {
                    self.next_cycle = None;
                    self.set_status( TrackerStatus::Error( e.to_string()));
                }
            }
        }
    }

    fn set_status (&mut self, status: TrackerStatus) {
        if self.status != status {
            info!("tracker status: {} -> {}", self.status, status);
            self.status = status.clone();
            self.publish_state();
            self.emit( TrackerEvent::StatusChanged(status));
        }
    }

    fn emit (&self, event: TrackerEvent) {
        let _ = self.events.send( event); // no subscribers is not an error
    }

    fn stats (&mut self)->TrackerStats {
        TrackerStats {
            status: self.status.clone(),
            aircraft: aircraft_stats( self.store.aircraft()),
            active_violations: self.detector.active_count(),
            total_violations: self.detector.total_detected(),
            cycles: self.cycles,
            last_update: self.last_update,
            last_error: self.client.last_error().map( |s| s.to_string()),
            is_online: self.client.is_online(),
            consecutive_errors: self.client.consecutive_errors(),
            dropped_records: self.dropped_records,
            quota: Some( self.client.quota_snapshot()),
        }
    }

    fn publish_state (&mut self) {
        let new_state = PublishedState {
            stats: self.stats(),
            active_violations: self.detector.active(),
            violation_history: self.detector.history(),
        };
        self.shared.replace( new_state);
    }
}
