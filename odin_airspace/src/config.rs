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

use std::{collections::HashMap, path::{Path,PathBuf}, time::Duration};
use serde::{Serialize,Deserialize};
use lazy_static::lazy_static;

use crate::geo::BoundingBox;
use crate::errors::{config_error,Result};

pub const DEFAULT_SOURCE_URL: &str = "https://opensky-network.org/api";

lazy_static! {
    /// named query regions
    static ref REGION_PRESETS: HashMap<&'static str, BoundingBox> = HashMap::from( [
        ("slovenia",    BoundingBox::new( 13.3, 45.4, 16.6, 46.9)),
        ("switzerland", BoundingBox::new(  5.9, 45.8, 10.5, 47.9)),
        ("austria",     BoundingBox::new(  9.5, 46.3, 17.2, 49.1)),
        ("bay_area",    BoundingBox::new(-123.0, 37.0, -121.5, 38.5)),
        ("europe",      BoundingBox::new(-10.0, 35.0, 30.0, 60.0)),
    ]);
}

/// the area we request snapshots for
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub enum Region {
    BBox { west: f64, south: f64, east: f64, north: f64 },
    Preset(String),
}

impl Region {
    pub fn bounding_box (&self)->Result<BoundingBox> {
        let bbox = match self {
            Region::BBox { west, south, east, north } => BoundingBox::new( *west, *south, *east, *north),
            Region::Preset(name) => {
                *REGION_PRESETS.get( name.to_lowercase().as_str())
                    .ok_or_else( || config_error!("unknown region preset '{}'", name))?
            }
        };

        if bbox.is_valid() { Ok(bbox) } else { Err( config_error!("invalid region bounds {}", bbox)) }
    }
}

impl Default for Region {
    fn default()->Self { Region::Preset( "slovenia".to_string()) }
}

pub fn region_preset_names ()->Vec<&'static str> {
    let mut names: Vec<&'static str> = REGION_PRESETS.keys().copied().collect();
    names.sort();
    names
}

/// configuration of the airspace tracker. All fields have defaults so that config files only
/// have to specify what differs
#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(default)]
pub struct AirspaceConfig {
    pub region: Region,

    pub source_url: String,
    pub username: Option<String>,
    pub password: Option<String>,

    //--- quota and request policy
    pub daily_limit: u32,
    pub min_request_interval: Duration,
    pub retry_attempts: u32,
    pub timeout: Duration,
    pub quota_file: Option<PathBuf>,

    //--- scheduling
    pub base_update_interval: Duration,

    //--- record validation and entity lifecycle
    pub max_record_age: Duration,     // records with older last contact are dropped
    pub max_tracked_entities: usize,
    pub cleanup_interval: Duration,   // grace period for entities missing from snapshots
    pub max_trail: usize,
    pub min_trail_displacement_m: f64,
    pub interpolation_tolerance: Duration,

    //--- violation detection
    pub active_threshold: Duration,   // max contact age for an entity to be checked
    pub max_violation_history: usize,
    pub terrain_buffer_ft: f64,       // approximated ground elevation for AGL bounds
    pub restricted_classes: Vec<String>,
}

impl Default for AirspaceConfig {
    fn default()->Self {
        AirspaceConfig {
            region: Region::default(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            username: None,
            password: None,
            daily_limit: 400,
            min_request_interval: Duration::from_secs(30),
            retry_attempts: 3,
            timeout: Duration::from_secs(15),
            quota_file: None,
            base_update_interval: Duration::from_secs(60),
            max_record_age: Duration::from_secs(300),
            max_tracked_entities: 500,
            cleanup_interval: Duration::from_secs(300),
            max_trail: 20,
            min_trail_displacement_m: 100.0,
            interpolation_tolerance: Duration::from_secs(30),
            active_threshold: Duration::from_secs(120),
            max_violation_history: 1000,
            terrain_buffer_ft: 1000.0,
            restricted_classes: vec![
                "RESTRICTED".to_string(), "PROHIBITED".to_string(), "DANGER".to_string(), "MILITARY".to_string()
            ],
        }
    }
}

impl AirspaceConfig {
    /// sanity check values that would otherwise lead to a dysfunctional tracker
    pub fn validate (&self)->Result<()> {
        self.region.bounding_box()?;

        if self.daily_limit == 0 { return Err( config_error!("daily_limit has to be > 0")) }
        if self.base_update_interval.is_zero() { return Err( config_error!("base_update_interval has to be > 0")) }
        if self.max_tracked_entities == 0 { return Err( config_error!("max_tracked_entities has to be > 0")) }
        if self.max_trail < 2 { return Err( config_error!("max_trail has to be >= 2")) }
        if self.max_violation_history == 0 { return Err( config_error!("max_violation_history has to be > 0")) }
        Ok(())
    }
}

/// load a RON config file for any deserializable type (e.g. [`AirspaceConfig`] or a zone list)
pub fn load_config<C> (path: impl AsRef<Path>)->Result<C> where C: for <'a> Deserialize<'a> {
    let path = path.as_ref();
    let data = std::fs::read_to_string( path)?;
    Ok( ron::from_str( data.as_str())? )
}
