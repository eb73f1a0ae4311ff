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

//! daily request quota of the remote source.
//!
//! The quota is a property of the remote resource, not of our session. It is therefore persisted
//! through a [`QuotaStore`] so that restarts within the same (local) calendar day keep counting.
//! The [`QuotaTracker`] is the only writer - it is owned by the polling client and mutated strictly
//! before each outbound request.

use std::{path::{Path,PathBuf}, sync::{Arc,Mutex}, time::Duration};
use chrono::{DateTime,Local,NaiveDate,TimeZone,Utc};
use serde::{Serialize,Deserialize};
use tracing::{debug,info,warn};

use crate::errors::{FetchError,QuotaLimit,Result,op_failed};

/// the persisted quota state for one calendar day
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct QuotaState {
    pub requests_used: u32,
    pub daily_limit: u32,
    pub last_request_time: Option<DateTime<Utc>>,
    pub day: NaiveDate, // local calendar day the counter belongs to
}

impl QuotaState {
    pub fn new (daily_limit: u32, now: DateTime<Utc>)->Self {
        QuotaState { requests_used: 0, daily_limit, last_request_time: None, day: local_day(now) }
    }
}

/// point-in-time view of the quota for statistics queries
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct QuotaSnapshot {
    pub requests_used: u32,
    pub daily_limit: u32,
    pub remaining: u32,
    pub last_request_time: Option<DateTime<Utc>>,
    pub day: NaiveDate,
    pub time_until_next_request: Duration,
}

impl QuotaSnapshot {
    pub fn percent_used (&self)->f64 {
        if self.daily_limit > 0 { 100.0 * self.requests_used as f64 / self.daily_limit as f64 } else { 100.0 }
    }
}

/// where quota state survives process restarts
pub trait QuotaStore: Send + Sync {
    fn load (&self)->Result<Option<QuotaState>>;
    fn save (&self, state: &QuotaState)->Result<()>;
}

/// RON file based quota store
pub struct FileQuotaStore {
    path: PathBuf
}

impl FileQuotaStore {
    pub fn new (path: impl AsRef<Path>)->Self {
        FileQuotaStore { path: path.as_ref().to_path_buf() }
    }

    pub fn path (&self)->&Path { self.path.as_path() }
}

impl QuotaStore for FileQuotaStore {
    fn load (&self)->Result<Option<QuotaState>> {
        if self.path.is_file() {
            let data = std::fs::read_to_string( &self.path)?;
            Ok( Some( ron::from_str( data.as_str())? ))
        } else {
            Ok(None)
        }
    }

    fn save (&self, state: &QuotaState)->Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all( dir)?; }
        }
        let data = ron::ser::to_string_pretty( state, ron::ser::PrettyConfig::default())?;

        // write to a temp file and rename so that we never leave a truncated state behind
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write( &tmp, data.as_bytes())?;
        std::fs::rename( &tmp, &self.path)?;
        Ok(())
    }
}

/// non-persistent store. Clones share the same state, which can be used to simulate restarts
#[derive(Clone,Default)]
pub struct MemoryQuotaStore {
    state: Arc<Mutex<Option<QuotaState>>>
}

impl MemoryQuotaStore {
    pub fn new ()->Self { MemoryQuotaStore::default() }
}

impl QuotaStore for MemoryQuotaStore {
    fn load (&self)->Result<Option<QuotaState>> {
        let guard = self.state.lock().map_err( |_| op_failed!("quota store lock poisoned"))?;
        Ok( guard.clone() )
    }

    fn save (&self, state: &QuotaState)->Result<()> {
        let mut guard = self.state.lock().map_err( |_| op_failed!("quota store lock poisoned"))?;
        *guard = Some(state.clone());
        Ok(())
    }
}

/// enforces the daily request budget and the minimum spacing between requests
pub struct QuotaTracker {
    state: QuotaState,
    min_interval: Duration,
    store: Box<dyn QuotaStore>,
}

impl QuotaTracker {
    /// load persisted state (startup lifecycle point). A state from a previous day is reset, the
    /// configured daily limit always overrides the stored one
    pub fn new (store: Box<dyn QuotaStore>, daily_limit: u32, min_interval: Duration, now: DateTime<Utc>)->Result<Self> {
        let mut state = match store.load()? {
            Some(state) => {
                debug!("loaded quota state: {} of {} requests used on {}", state.requests_used, state.daily_limit, state.day);
                state
            }
            None => QuotaState::new( daily_limit, now)
        };
        state.daily_limit = daily_limit;

        let mut tracker = QuotaTracker { state, min_interval, store };
        tracker.roll_over( now);
        tracker.persist();
        Ok(tracker)
    }

    pub fn state (&self)->&QuotaState { &self.state }
    pub fn min_interval (&self)->Duration { self.min_interval }

    /// reset the counter if `now` is on a later local calendar day than our state
    pub fn roll_over (&mut self, now: DateTime<Utc>)->bool {
        let today = local_day(now);
        if today > self.state.day {
            info!("new quota day {} (used {} requests on {})", today, self.state.requests_used, self.state.day);
            self.state.requests_used = 0;
            self.state.day = today;
            self.persist();
            true
        } else {
            false
        }
    }

    pub fn can_request (&mut self, now: DateTime<Utc>)->bool {
        self.check( now).is_ok()
    }

    /// the gate that every outbound request has to pass
    pub fn check (&mut self, now: DateTime<Utc>)->std::result::Result<(),FetchError> {
        self.roll_over( now);

        if self.state.requests_used >= self.state.daily_limit {
            return Err( FetchError::QuotaExceeded { reason: QuotaLimit::Daily, retry_after: until_next_local_midnight(now) })
        }

        let deficit = self.spacing_deficit( now);
        if !deficit.is_zero() {
            return Err( FetchError::QuotaExceeded { reason: QuotaLimit::Spacing, retry_after: deficit })
        }

        Ok(())
    }

    /// same as [`check`] but only tests the daily budget (used for retries of an already admitted fetch)
    pub fn check_daily (&mut self, now: DateTime<Utc>)->std::result::Result<(),FetchError> {
        self.roll_over( now);
        if self.state.requests_used >= self.state.daily_limit {
            Err( FetchError::QuotaExceeded { reason: QuotaLimit::Daily, retry_after: until_next_local_midnight(now) })
        } else {
            Ok(())
        }
    }

    /// time until the next local midnight if the quota is used up, otherwise the remaining spacing deficit
    pub fn time_until_next_request (&mut self, now: DateTime<Utc>)->Duration {
        self.roll_over( now);

        if self.state.requests_used >= self.state.daily_limit {
            until_next_local_midnight( now)
        } else {
            self.spacing_deficit( now)
        }
    }

    /// charge one request. This has to be called *before* the request goes out so that a crash
    /// in flight still counts against the quota
    pub fn charge (&mut self, now: DateTime<Utc>) {
        self.roll_over( now);
        self.state.requests_used += 1;
        self.state.last_request_time = Some(now);
        self.persist();
    }

    pub fn snapshot (&mut self, now: DateTime<Utc>)->QuotaSnapshot {
        let time_until_next_request = self.time_until_next_request( now);
        let s = &self.state;
        QuotaSnapshot {
            requests_used: s.requests_used,
            daily_limit: s.daily_limit,
            remaining: s.daily_limit.saturating_sub( s.requests_used),
            last_request_time: s.last_request_time,
            day: s.day,
            time_until_next_request,
        }
    }

    fn spacing_deficit (&self, now: DateTime<Utc>)->Duration {
        if let Some(last) = self.state.last_request_time {
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO); // clock going backwards counts as no time elapsed
            self.min_interval.saturating_sub( elapsed)
        } else {
            Duration::ZERO
        }
    }

    fn persist (&self) {
        if let Err(e) = self.store.save( &self.state) {
            warn!("failed to persist quota state: {e}");
        }
    }
}

/// the local calendar day of a given time point
pub fn local_day (now: DateTime<Utc>)->NaiveDate {
    now.with_timezone( &Local).date_naive()
}

/// duration until the next local midnight (when the daily quota resets)
pub fn until_next_local_midnight (now: DateTime<Utc>)->Duration {
    let fallback = Duration::from_secs(24*3600);

    let next_midnight = local_day(now).succ_opt()
        .and_then( |day| day.and_hms_opt( 0, 0, 0))
        .and_then( |ndt| Local.from_local_datetime( &ndt).earliest());

    match next_midnight {
        Some(midnight) => (midnight.with_timezone(&Utc) - now).to_std().unwrap_or(fallback),
        None => fallback
    }
}
