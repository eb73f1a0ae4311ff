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

use std::{fmt, time::Duration};
use thiserror::Error;

pub type Result<T> = std::result::Result<T,OdinAirspaceError>;

#[derive(Error,Debug)]
pub enum OdinAirspaceError {

    #[error("config error {0}")]
    ConfigError(String),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("RON error {0}")]
    RonError( #[from] ron::error::SpannedError),

    #[error("RON serialization error {0}")]
    RonSerError( #[from] ron::Error),

    #[error("serde error {0}")]
    SerdeError( #[from] serde_json::Error),

    #[error("reqwest error {0}")]
    ReqwestError( #[from] reqwest::Error),

    #[error("fetch error {0}")]
    FetchError( #[from] FetchError),

    #[error("tracker terminated")]
    TrackerTerminated,

    #[error("operation failed {0}")]
    OpFailedError(String)
}

/// why a request was refused before it went out
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum QuotaLimit {
    /// daily request budget is used up
    Daily,
    /// last request was less than the minimum request interval ago
    Spacing,
}

impl fmt::Display for QuotaLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaLimit::Daily => write!(f, "daily request limit reached"),
            QuotaLimit::Spacing => write!(f, "minimum request interval not elapsed"),
        }
    }
}

/// failure classification of a snapshot fetch.
/// `QuotaExceeded` and `AuthDenied` are never retried, `Transient` failures are retried with backoff
#[derive(Error,Debug,Clone,PartialEq)]
pub enum FetchError {

    #[error("quota exceeded: {reason}, next request possible in {}s", retry_after.as_secs())]
    QuotaExceeded { reason: QuotaLimit, retry_after: Duration },

    #[error("access denied by remote source (HTTP {status})")]
    AuthDenied { status: u16 },

    #[error("transient failure: {0}")]
    Transient(String),
}

impl FetchError {
    pub fn is_retryable (&self)->bool {
        matches!( self, FetchError::Transient(_))
    }

    /// terminal for the session - the scheduler should not try again without user intervention
    pub fn is_terminal (&self)->bool {
        matches!( self, FetchError::AuthDenied{..})
    }

    /// map a (non-success) HTTP status of the remote source into our failure classes
    pub fn from_status (status: u16)->Self {
        match status {
            429 => FetchError::QuotaExceeded { reason: QuotaLimit::Daily, retry_after: Duration::ZERO },
            401 | 403 => FetchError::AuthDenied { status },
            _ => FetchError::Transient( format!("HTTP status {status}"))
        }
    }
}

/// a state vector we could not turn into a usable record. This only skips the record, never the batch
#[derive(Error,Debug,Clone,PartialEq)]
pub enum RecordError {
    #[error("record without identifier")]
    MissingId,

    #[error("record {0} has no valid position")]
    InvalidPosition(String),

    #[error("record {id} is stale ({age_secs}s since last contact)")]
    Stale { id: String, age_secs: i64 },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// a zone we can't evaluate in this cycle. The zone is skipped, other zones are still checked
#[derive(Error,Debug,Clone,PartialEq)]
pub enum ZoneError {
    #[error("zone {0} has less than 3 polygon vertices")]
    DegeneratePolygon(String),

    #[error("zone {zone} has unparsable altitude bound '{bound}'")]
    InvalidAltitude { zone: String, bound: String },
}

macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => {
        crate::errors::OdinAirspaceError::OpFailedError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use op_failed;

macro_rules! config_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        crate::errors::OdinAirspaceError::ConfigError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use config_error;
