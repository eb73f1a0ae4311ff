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

use std::fmt;
use serde::{Serialize,Deserialize};
use lazy_static::lazy_static;
use regex::Regex;

/// closed set of aircraft categories we tag tracked entities with
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,PartialOrd,Ord,Serialize,Deserialize)]
pub enum AircraftCategory {
    Emergency,
    Military,
    Helicopter,
    Glider,
    Drone,
    Ground,
    Heavy,
    Commercial,
    GeneralAviation,
    Unknown,
}

impl fmt::Display for AircraftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AircraftCategory::Emergency => "emergency",
            AircraftCategory::Military => "military",
            AircraftCategory::Helicopter => "helicopter",
            AircraftCategory::Glider => "glider",
            AircraftCategory::Drone => "drone",
            AircraftCategory::Ground => "ground",
            AircraftCategory::Heavy => "heavy",
            AircraftCategory::Commercial => "commercial",
            AircraftCategory::GeneralAviation => "general_aviation",
            AircraftCategory::Unknown => "unknown",
        };
        write!( f, "{s}")
    }
}

// ADS-B emitter categories as reported by the remote source
const CAT_LIGHT: u8 = 2;
const CAT_SMALL: u8 = 3;
const CAT_HIGH_VORTEX: u8 = 5;
const CAT_HEAVY: u8 = 6;
const CAT_HIGH_PERFORMANCE: u8 = 7;
const CAT_ROTORCRAFT: u8 = 8;
const CAT_GLIDER: u8 = 9;
const CAT_LIGHTER_THAN_AIR: u8 = 10;
const CAT_ULTRALIGHT: u8 = 12;
const CAT_UAV: u8 = 14;
const CAT_SURFACE_EMERGENCY: u8 = 16;
const CAT_SURFACE_SERVICE: u8 = 17;

const EMERGENCY_SQUAWKS: [&str;3] = ["7500", "7600", "7700"];

lazy_static! {
    static ref MILITARY_PREFIXES: Vec<&'static str> = vec![
        "RCH", "REACH", "CNV", "NAVY", "ARMY", "RRR", "ASCOT", "GAF", "MMF", "FAF", "BAF", "IAM", "HKY", "DUKE", "EVAC", "VALOR"
    ];

    static ref AIRLINE_CALLSIGN: Regex = Regex::new( r"^[A-Z]{3}[0-9]{1,4}[A-Z]{0,2}$").unwrap();
}

/// the attributes classification rules can look at
#[derive(Debug,Clone,Copy,Default)]
pub struct ClassifyInput<'a> {
    pub callsign: Option<&'a str>,
    pub squawk: Option<&'a str>,
    pub category: Option<u8>,
    pub on_ground: bool,
    pub ground_speed_ms: Option<f64>,
}

type Rule = (fn(&ClassifyInput)->bool, AircraftCategory);

/// ordered rule list - first matching predicate determines the category
const RULES: &[Rule] = &[
    (is_emergency, AircraftCategory::Emergency),
    (is_military, AircraftCategory::Military),
    (is_rotorcraft, AircraftCategory::Helicopter),
    (is_glider, AircraftCategory::Glider),
    (is_uav, AircraftCategory::Drone),
    (is_ground_vehicle, AircraftCategory::Ground),
    (is_heavy, AircraftCategory::Heavy),
    (is_airline, AircraftCategory::Commercial),
    (is_light, AircraftCategory::GeneralAviation),
];

pub fn classify (input: &ClassifyInput)->AircraftCategory {
    RULES.iter()
        .find( |(pred,_)| pred(input))
        .map( |(_,cat)| *cat)
        .unwrap_or( AircraftCategory::Unknown)
}

fn is_emergency (i: &ClassifyInput)->bool {
    i.squawk.map( |s| EMERGENCY_SQUAWKS.contains( &s)).unwrap_or(false)
}

fn is_military (i: &ClassifyInput)->bool {
    if i.category == Some(CAT_HIGH_PERFORMANCE) { return true }

    if let Some(cs) = i.callsign {
        let cs = cs.to_uppercase();
        MILITARY_PREFIXES.iter().any( |p| cs.starts_with(p))
    } else {
        false
    }
}

fn is_rotorcraft (i: &ClassifyInput)->bool { i.category == Some(CAT_ROTORCRAFT) }
fn is_glider (i: &ClassifyInput)->bool { matches!( i.category, Some(CAT_GLIDER) | Some(CAT_LIGHTER_THAN_AIR)) }
fn is_uav (i: &ClassifyInput)->bool { i.category == Some(CAT_UAV) }
fn is_heavy (i: &ClassifyInput)->bool { matches!( i.category, Some(CAT_HEAVY) | Some(CAT_HIGH_VORTEX)) }
fn is_light (i: &ClassifyInput)->bool { matches!( i.category, Some(CAT_LIGHT) | Some(CAT_SMALL) | Some(CAT_ULTRALIGHT)) }

fn is_ground_vehicle (i: &ClassifyInput)->bool {
    matches!( i.category, Some(CAT_SURFACE_EMERGENCY) | Some(CAT_SURFACE_SERVICE))
        || (i.on_ground && i.ground_speed_ms.map( |v| v < 1.0).unwrap_or(true) && i.callsign.is_none())
}

fn is_airline (i: &ClassifyInput)->bool {
    i.callsign.map( |cs| AIRLINE_CALLSIGN.is_match( cs.to_uppercase().as_str())).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order () {
        // emergency wins over airline callsign
        let i = ClassifyInput { callsign: Some("DLH4AB"), squawk: Some("7700"), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Emergency);

        let i = ClassifyInput { callsign: Some("DLH4AB"), squawk: Some("1000"), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Commercial);

        let i = ClassifyInput { callsign: Some("RCH123"), category: Some(CAT_HEAVY), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Military);

        let i = ClassifyInput { callsign: Some("OEXYZ"), category: Some(CAT_ROTORCRAFT), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Helicopter);

        let i = ClassifyInput { callsign: Some("S5ABC"), category: Some(CAT_LIGHT), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::GeneralAviation);

        let i = ClassifyInput { callsign: Some("S5ABC"), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Unknown);
    }

    #[test]
    fn test_ground () {
        let i = ClassifyInput { on_ground: true, ground_speed_ms: Some(0.0), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Ground);

        let i = ClassifyInput { callsign: Some("AUA123"), on_ground: true, ground_speed_ms: Some(0.0), ..Default::default() };
        assert_eq!( classify(&i), AircraftCategory::Commercial);
    }
}
