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

//! the quota-aware polling client.
//!
//! [`SnapshotSource`] is the seam to the remote source (and the dependency injection point for tests),
//! [`PollingClient`] wraps it with the quota/spacing gate, retries with exponential backoff and the
//! online state we report to users.

use std::{sync::Arc, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime,Utc};
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug,info,warn};

use crate::config::AirspaceConfig;
use crate::errors::{FetchError,QuotaLimit,Result};
use crate::geo::BoundingBox;
use crate::quota::{FileQuotaStore,MemoryQuotaStore,QuotaSnapshot,QuotaStore,QuotaTracker};
use crate::records::{Snapshot,SnapshotResponse,ValidatedRecords,validate_records};

/// where we get current time points from
pub type Clock = Arc<dyn Fn()->DateTime<Utc> + Send + Sync>;

pub fn system_clock ()->Clock { Arc::new( Utc::now) }

/// a clock that follows tokio time (which can be paused and advanced in tests), anchored at the
/// current system time. Has to be created from within a tokio runtime
pub fn tokio_clock ()->Clock {
    let t0 = Utc::now();
    let i0 = tokio::time::Instant::now();
    Arc::new( move || t0 + chrono::Duration::from_std( i0.elapsed()).unwrap_or( chrono::Duration::zero()))
}

/// the abstract remote source. Implementations only do the request and map failures into [`FetchError`],
/// quota and retries are handled by the [`PollingClient`]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch (&self, bbox: &BoundingBox)->std::result::Result<Snapshot,FetchError>;

    fn name (&self)->&str;
}

/// the OpenSky network `states/all` REST endpoint
pub struct OpenSkySource {
    client: Client,
    url: String,
    credentials: Option<(String,String)>,
}

impl OpenSkySource {
    pub fn new (config: &AirspaceConfig)->Result<Self> {
        let client = Client::builder().timeout( config.timeout).build()?;
        let url = format!("{}/states/all", config.source_url.trim_end_matches('/'));
        let credentials = match (&config.username, &config.password) {
            (Some(user),Some(pw)) => Some( (user.clone(), pw.clone())),
            _ => None
        };
        Ok( OpenSkySource { client, url, credentials })
    }
}

#[async_trait]
impl SnapshotSource for OpenSkySource {
    async fn fetch (&self, bbox: &BoundingBox)->std::result::Result<Snapshot,FetchError> {
        let mut request = self.client.get( self.url.as_str())
            .query( &[("lamin", bbox.south), ("lomin", bbox.west), ("lamax", bbox.north), ("lomax", bbox.east)]);
        if let Some((user,pw)) = &self.credentials {
            request = request.basic_auth( user, Some(pw));
        }

        let response = request.send().await.map_err( classify_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err( FetchError::from_status( status.as_u16()))
        }

        let body: SnapshotResponse = response.json().await
            .map_err( |e| FetchError::Transient( format!("invalid response body: {e}")))?;
        let (snapshot,n_malformed) = body.into_snapshot();
        if n_malformed > 0 {
            debug!("{} malformed state vectors in response", n_malformed);
        }
        Ok(snapshot)
    }

    fn name (&self)->&str { self.url.as_str() }
}

fn classify_reqwest_error (e: reqwest::Error)->FetchError {
    if e.is_timeout() {
        FetchError::Transient( "request timed out".to_string())
    } else if let Some(status) = e.status() {
        FetchError::from_status( status.as_u16())
    } else if e.is_connect() {
        FetchError::Transient( format!("connection failed: {e}"))
    } else {
        FetchError::Transient( e.to_string())
    }
}

/// the quota store configured for this tracker (file if we have a `quota_file`, in-memory otherwise)
pub fn create_quota_store (config: &AirspaceConfig)->Box<dyn QuotaStore> {
    match &config.quota_file {
        Some(path) => Box::new( FileQuotaStore::new( path)),
        None => Box::new( MemoryQuotaStore::new())
    }
}

pub const BASE_BACKOFF: Duration = Duration::from_millis(1000);

/// snapshot fetcher that enforces the daily quota and the minimum request spacing, retries transient
/// failures and keeps track of our online state
pub struct PollingClient {
    source: Box<dyn SnapshotSource>,
    quota: QuotaTracker,
    retry_attempts: u32,
    base_backoff: Duration,
    max_record_age: Duration,
    clock: Clock,

    is_online: bool,
    consecutive_errors: u32,
    last_error: Option<String>,
}

impl PollingClient {
    pub fn new (source: Box<dyn SnapshotSource>, quota: QuotaTracker, config: &AirspaceConfig, clock: Clock)->Self {
        PollingClient {
            source,
            quota,
            retry_attempts: config.retry_attempts,
            base_backoff: BASE_BACKOFF,
            max_record_age: config.max_record_age,
            clock,
            is_online: true,
            consecutive_errors: 0,
            last_error: None,
        }
    }

    /// create a client for the OpenSky source with the configured quota store
    pub fn from_config (config: &AirspaceConfig, clock: Clock)->Result<Self> {
        let source = OpenSkySource::new( config)?;
        let quota = QuotaTracker::new( create_quota_store( config), config.daily_limit, config.min_request_interval, clock())?;
        Ok( PollingClient::new( Box::new(source), quota, config, clock))
    }

    pub fn now (&self)->DateTime<Utc> { (self.clock)() }
    pub fn clock (&self)->Clock { self.clock.clone() }
    pub fn source_name (&self)->&str { self.source.name() }

    pub fn is_online (&self)->bool { self.is_online }
    pub fn consecutive_errors (&self)->u32 { self.consecutive_errors }
    pub fn last_error (&self)->Option<&str> { self.last_error.as_deref() }

    pub fn quota (&self)->&QuotaTracker { &self.quota }
    pub fn quota_snapshot (&mut self)->QuotaSnapshot {
        let now = self.now();
        self.quota.snapshot( now)
    }

    pub fn can_request (&mut self)->bool {
        let now = self.now();
        self.quota.can_request( now)
    }

    pub fn time_until_next_request (&mut self)->Duration {
        let now = self.now();
        self.quota.time_until_next_request( now)
    }

    /// delay before retry `n` (starting at 1): 2s, 4s, 8s..
    pub fn backoff_delay (&self, n: u32)->Duration {
        self.base_backoff * 2u32.pow( n.min(16))
    }

    /// fetch a snapshot of the given region. Fails with `QuotaExceeded` without any network call if the
    /// quota or spacing gate is closed. Each attempt (including retries) is charged before it goes out
    pub async fn fetch_snapshot (&mut self, bbox: &BoundingBox)->std::result::Result<Snapshot,FetchError> {
        let now = self.now();
        if let Err(e) = self.quota.check( now) {
            self.record_failure( &e); // reported as last error, does not take us offline
            return Err(e)
        }

        let mut n_retry = 0;
        loop {
            let now = self.now();
            if n_retry > 0 {
                // retries belong to an already admitted fetch, they are not subject to request spacing
                if let Err(e) = self.quota.check_daily( now) {
                    self.record_failure( &e);
                    return Err(e)
                }
            }
            self.quota.charge( now);

            match self.source.fetch( bbox).await {
                Ok(snapshot) => {
                    self.record_success();
                    return Ok(snapshot)
                }
                Err(e) if e.is_retryable() && n_retry < self.retry_attempts => {
                    n_retry += 1;
                    let delay = self.backoff_delay( n_retry);
                    warn!("fetch attempt {} failed: {}, retry {}/{} in {:?}", n_retry, e, n_retry, self.retry_attempts, delay);
                    sleep( delay).await;
                }
                Err(e) => {
                    let e = self.refine_error( e);
                    self.record_failure( &e);
                    return Err(e)
                }
            }
        }
    }

    /// fetch and validate records of the region
    pub async fn fetch_validated (&mut self, bbox: &BoundingBox)->std::result::Result<ValidatedRecords,FetchError> {
        let snapshot = self.fetch_snapshot( bbox).await?;
        let fetch_time = self.now();
        let validated = validate_records( &snapshot.states, fetch_time, self.max_record_age);
        if validated.dropped > 0 {
            info!("dropped {} of {} records", validated.dropped, snapshot.states.len());
        }
        Ok(validated)
    }

    // a 429 from the remote source does not tell us when we can try again, use our own estimate
    fn refine_error (&mut self, e: FetchError)->FetchError {
        match e {
            FetchError::QuotaExceeded { reason: QuotaLimit::Daily, retry_after } if retry_after.is_zero() => {
                let now = self.now();
                let retry_after = self.quota.time_until_next_request( now).max( self.quota.min_interval());
                FetchError::QuotaExceeded { reason: QuotaLimit::Daily, retry_after }
            }
            e => e
        }
    }

    fn record_success (&mut self) {
        if !self.is_online {
            info!("remote source {} is back online", self.source.name());
        }
        self.is_online = true;
        self.consecutive_errors = 0;
        self.last_error = None;
    }

    fn record_failure (&mut self, e: &FetchError) {
        if e.is_retryable() {
            self.is_online = false;
            self.consecutive_errors += 1;
        }
        self.last_error = Some( e.to_string());
    }
}
